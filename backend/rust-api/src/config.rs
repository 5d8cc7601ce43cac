use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub auth0_domain: String,
    pub auth0_client_id: String,
    pub auth0_client_secret: String,
    pub auth0_audience: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            // Fallback to current directory .env for backward compatibility
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            // Load base config from TOML file
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        // Extract values with fallbacks to ENV or defaults
        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "aula".to_string());

        let auth0_domain = settings
            .get_string("auth0.domain")
            .or_else(|_| env::var("AUTH0_DOMAIN"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: AUTH0_DOMAIN must be set in production!");
                }
                eprintln!("WARNING: Using placeholder AUTH0_DOMAIN (dev mode only!)");
                "dev-aula.eu.auth0.com".to_string()
            });

        let auth0_client_id = settings
            .get_string("auth0.client_id")
            .or_else(|_| env::var("AUTH0_CLIENT_ID"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: AUTH0_CLIENT_ID must be set in production!");
                }
                eprintln!("WARNING: Using placeholder AUTH0_CLIENT_ID (dev mode only!)");
                "dev-client-id".to_string()
            });

        let auth0_client_secret = settings
            .get_string("auth0.client_secret")
            .or_else(|_| env::var("AUTH0_CLIENT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: AUTH0_CLIENT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using placeholder AUTH0_CLIENT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        // The Management API audience is derived from the tenant unless
        // overridden.
        let auth0_audience = settings
            .get_string("auth0.audience")
            .or_else(|_| env::var("AUTH0_AUDIENCE"))
            .unwrap_or_else(|_| format!("https://{}/api/v2/", auth0_domain));

        Ok(Config {
            mongo_uri,
            mongo_database,
            auth0_domain,
            auth0_client_id,
            auth0_client_secret,
            auth0_audience,
        })
    }
}
