use serde::Serialize;

pub mod activity;
pub mod course;

/// `{ status, message }` envelope returned by the legacy mutation endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: u16,
    pub message: String,
}

impl MessageResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}
