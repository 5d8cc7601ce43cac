use std::sync::Arc;

use mongodb::{Client as MongoClient, Database};

use crate::config::Config;
use crate::services::identity::Authorizer;

/// Shared application state: configuration, the MongoDB handle and the
/// identity provider used by the authorization flow.
pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    pub fn new(config: Config, mongo_client: MongoClient, authorizer: Arc<dyn Authorizer>) -> Self {
        let mongo = mongo_client.database(&config.mongo_database);

        Self {
            config,
            mongo,
            authorizer,
        }
    }
}

pub mod activity_service;
pub mod course_service;
pub mod identity;
