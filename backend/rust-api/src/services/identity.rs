use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::metrics::IDENTITY_LOOKUPS_TOTAL;

/// Percent-encoding set matching JS `encodeURIComponent`, which the user id
/// segment of the Management API URL was historically encoded with.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Failures of the identity provider integration. Identity lookups keep
/// their legacy NotFound mapping at the HTTP boundary; credential and role
/// lookup failures stay internal.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity lookup failed: {0}")]
    IdentityLookup(String),
    #[error("service credential fetch failed: {0}")]
    Credential(String),
    #[error("role lookup failed: {0}")]
    RoleLookup(String),
}

/// Profile resolved from a bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct UserIdentity {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Identity and role resolution, injected into the app state so handlers
/// can run against a stub in tests.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Resolves the profile behind a user access token.
    async fn resolve_identity(&self, token: &str) -> Result<UserIdentity, AuthError>;

    /// Whether the user has been granted the named role.
    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, AuthError>;
}

#[derive(Debug, Deserialize)]
struct RoleEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ManagementTokenResponse {
    access_token: String,
}

/// Auth0-backed `Authorizer`: user profiles come from the tenant's
/// `/userinfo` endpoint, role grants from the Management API.
pub struct Auth0Client {
    http: reqwest::Client,
    domain: String,
    client_id: String,
    client_secret: String,
    audience: String,
}

impl Auth0Client {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            domain: config.auth0_domain.clone(),
            client_id: config.auth0_client_id.clone(),
            client_secret: config.auth0_client_secret.clone(),
            audience: config.auth0_audience.clone(),
        }
    }

    /// Short-lived Management API credential, fetched per role lookup.
    async fn fetch_management_token(&self) -> Result<String, AuthError> {
        let url = format!("https://{}/oauth/token", self.domain);
        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "audience": self.audience,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Credential(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Credential(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: ManagementTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Credential(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl Authorizer for Auth0Client {
    async fn resolve_identity(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let url = format!("https://{}/userinfo", self.domain);

        let result: Result<UserIdentity, AuthError> = async {
            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| AuthError::IdentityLookup(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AuthError::IdentityLookup(format!(
                    "userinfo endpoint returned {}",
                    response.status()
                )));
            }

            response
                .json::<UserIdentity>()
                .await
                .map_err(|e| AuthError::IdentityLookup(e.to_string()))
        }
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        IDENTITY_LOOKUPS_TOTAL
            .with_label_values(&["userinfo", status])
            .inc();
        result
    }

    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, AuthError> {
        let result: Result<bool, AuthError> = async {
            let management_token = self.fetch_management_token().await?;

            let encoded_user_id = utf8_percent_encode(user_id, URI_COMPONENT);
            let url = format!("https://{}/api/v2/users/{}/roles", self.domain, encoded_user_id);

            let response = self
                .http
                .get(&url)
                .bearer_auth(&management_token)
                .send()
                .await
                .map_err(|e| AuthError::RoleLookup(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AuthError::RoleLookup(format!(
                    "roles endpoint returned {}",
                    response.status()
                )));
            }

            let roles: Vec<RoleEntry> = response
                .json()
                .await
                .map_err(|e| AuthError::RoleLookup(e.to_string()))?;
            Ok(roles.iter().any(|entry| entry.name == role))
        }
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        IDENTITY_LOOKUPS_TOTAL
            .with_label_values(&["roles", status])
            .inc();
        result
    }
}
