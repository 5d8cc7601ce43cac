use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // CORS configuration for the browser clients of the REST surface
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/rest/courses", course_routes().layer(cors.clone()))
        .nest("/rest/activities", activity_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware)) // Apply CSP to all responses
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn course_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::courses::get_all_courses).post(handlers::courses::create_course),
        )
        .route(
            "/{id}",
            get(handlers::courses::get_course_by_id)
                .put(handlers::courses::update_course_by_id)
                .delete(handlers::courses::delete_course_by_id),
        )
}

fn activity_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::activities::get_all_activities)
                .post(handlers::activities::create_activity),
        )
        // Static segment: matched ahead of the {id} routes below
        .route("/viewed", get(handlers::activities::get_viewed_activities))
        .route(
            "/{id}",
            get(handlers::activities::get_activity_by_id)
                .put(handlers::activities::update_activity)
                .delete(handlers::activities::delete_activity),
        )
        .route(
            "/{id}/viewed",
            post(handlers::activities::mark_activity_as_viewed),
        )
        .route("/{id}/answer", post(handlers::activities::check_answer))
}
