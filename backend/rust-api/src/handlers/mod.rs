use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::identity::UserIdentity;
use crate::services::AppState;

pub mod activities;
pub mod courses;

/// HTTP error taxonomy of the REST surface. Every provider or store failure
/// is re-mapped to one of these categories at the handler boundary, so
/// internal error details never leak to clients.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        let body = json!({
            "message": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

/// Extracts the bearer token with the legacy header semantics: split on a
/// single space, the scheme must be exactly "Bearer" and an empty token
/// counts as missing.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next()) {
        (Some("Bearer"), Some(token)) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Resolves the caller behind the request's bearer token.
///
/// A missing token is a 401 and a token the provider cannot resolve keeps
/// its legacy 404 "Usuario no encontrado" mapping.
pub async fn require_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserIdentity, ApiError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::unauthorized("Token no encontrado"))?;

    state.authorizer.resolve_identity(token).await.map_err(|e| {
        tracing::warn!("Identity resolution failed: {}", e);
        ApiError::not_found("Usuario no encontrado")
    })
}

/// Admin gate for mutating endpoints: resolves the caller and requires the
/// "admin" role grant.
pub async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserIdentity, ApiError> {
    let user = require_identity(state, headers).await?;

    let is_admin = state
        .authorizer
        .has_role(&user.sub, "admin")
        .await
        .map_err(|e| {
            tracing::error!("Role lookup failed for {}: {}", user.sub, e);
            ApiError::internal("Error interno del servidor")
        })?;

    if !is_admin {
        return Err(ApiError::unauthorized("Usuario no autorizado"));
    }

    Ok(user)
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut status = "healthy";
    let mut dependencies = serde_json::Map::new();
    let mut all_healthy = true;

    let mongo_health = check_mongodb(&state).await;
    dependencies.insert("mongodb".to_string(), json!(mongo_health));
    if mongo_health.get("status").and_then(|v| v.as_str()) != Some("healthy") {
        all_healthy = false;
        status = "degraded";
    }

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "aula-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

async fn check_mongodb(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();

    match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.mongo.run_command(mongodb::bson::doc! { "ping": 1 }),
    )
    .await
    {
        Ok(Ok(_)) => {
            result.insert("status".to_string(), json!("healthy"));
            result.insert(
                "message".to_string(),
                json!("MongoDB connection successful"),
            );
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("MongoDB error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("MongoDB timeout after 1s"));
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic Auth.
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth_header.starts_with("Basic ") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let encoded = &auth_header[6..];
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // Expected format: username:password
    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());

    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_authorization(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_token_from_well_formed_header() {
        let headers = headers_with_authorization("Bearer abc123");
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn missing_header_yields_no_token() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let headers = headers_with_authorization("Basic dXNlcjpwYXNz");
        assert_eq!(extract_bearer_token(&headers), None);

        let headers = headers_with_authorization("bearer abc123");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn scheme_without_token_is_rejected() {
        let headers = headers_with_authorization("Bearer");
        assert_eq!(extract_bearer_token(&headers), None);

        let headers = headers_with_authorization("Bearer ");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn double_space_hides_the_token() {
        // Split on a single space: the second part is the empty string.
        let headers = headers_with_authorization("Bearer  abc123");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn api_error_maps_to_envelope_status() {
        let response = ApiError::not_found("Curso no encontrado").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::unauthorized("Token no encontrado").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
