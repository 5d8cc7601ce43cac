use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;

use aula_api::services::identity::{AuthError, Authorizer, UserIdentity};
use aula_api::{config::Config, create_router, services::AppState};

/// Deterministic identity provider: no network, fixed identity and role
/// grant. Lets tests drive the whole authorization flow of the router.
pub struct StubAuthorizer {
    pub identity: Option<UserIdentity>,
    pub is_admin: bool,
}

#[async_trait]
impl Authorizer for StubAuthorizer {
    async fn resolve_identity(&self, _token: &str) -> Result<UserIdentity, AuthError> {
        self.identity
            .clone()
            .ok_or_else(|| AuthError::IdentityLookup("stub: unknown token".to_string()))
    }

    async fn has_role(&self, _user_id: &str, role: &str) -> Result<bool, AuthError> {
        Ok(role == "admin" && self.is_admin)
    }
}

pub fn test_identity(sub: &str) -> UserIdentity {
    UserIdentity {
        sub: sub.to_string(),
        email: None,
        name: None,
    }
}

/// App whose caller resolves to an admin.
pub async fn admin_app() -> Router {
    create_test_app(StubAuthorizer {
        identity: Some(test_identity("auth0|admin")),
        is_admin: true,
    })
    .await
}

/// App whose caller resolves to a regular user without the admin role.
pub async fn non_admin_app() -> Router {
    create_test_app(StubAuthorizer {
        identity: Some(test_identity("auth0|student")),
        is_admin: false,
    })
    .await
}

/// App whose identity provider cannot resolve any token.
pub async fn unknown_identity_app() -> Router {
    create_test_app(StubAuthorizer {
        identity: None,
        is_admin: false,
    })
    .await
}

pub async fn create_test_app(authorizer: StubAuthorizer) -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    // Load test configuration
    let config = Config::load().expect("Failed to load test configuration");

    // The driver connects lazily, so tests that never reach the store run
    // without a MongoDB instance.
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to create test MongoDB client");

    let app_state = Arc::new(AppState::new(config, mongo_client, Arc::new(authorizer)));

    // Build test router (same as main app)
    create_router(app_state)
}
