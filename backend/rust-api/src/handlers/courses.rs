use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::extractors::AppJson;
use crate::handlers::{extract_bearer_token, require_admin, ApiError};
use crate::models::course::{CourseResponse, CreateCourseRequest, UpdateCourseRequest};
use crate::models::MessageResponse;
use crate::services::course_service::CourseService;
use crate::services::AppState;

/// POST /rest/courses - create a course (admin only)
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(request): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;

    request.validate().map_err(|e| {
        tracing::warn!("Course validation failed: {}", e);
        ApiError::bad_request("Error en la solicitud")
    })?;

    let course_service = CourseService::new(state.mongo.clone());
    course_service
        .create_course(request, &user.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create course: {:?}", e);
            ApiError::internal("Error interno del servidor")
        })?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            StatusCode::CREATED.as_u16(),
            "Curso creado correctamente",
        )),
    ))
}

/// GET /rest/courses - list all courses
pub async fn get_all_courses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let course_service = CourseService::new(state.mongo.clone());
    let courses = course_service.get_all_courses().await.map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        ApiError::internal("Error interno del servidor")
    })?;

    let courses: Vec<CourseResponse> = courses.into_iter().map(CourseResponse::from).collect();
    Ok(Json(courses))
}

/// GET /rest/courses/{id} - fetch one course (any authenticated caller)
pub async fn get_course_by_id(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if extract_bearer_token(&headers).is_none() {
        return Err(ApiError::unauthorized("Token no encontrado"));
    }

    let course_service = CourseService::new(state.mongo.clone());
    let course = course_service
        .get_course_by_id(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch course {}: {:?}", id, e);
            ApiError::internal("Error interno del servidor")
        })?
        .ok_or_else(|| ApiError::not_found("Curso no encontrado"))?;

    Ok(Json(CourseResponse::from(course)))
}

/// PUT /rest/courses/{id} - update a course (admin only)
pub async fn update_course_by_id(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    let course_service = CourseService::new(state.mongo.clone());

    // Existence is checked up front so a bad id answers 404 rather than a
    // silently ignored update.
    let existing = course_service.get_course_by_id(&id).await.map_err(|e| {
        tracing::error!("Failed to fetch course {}: {:?}", id, e);
        ApiError::internal("Error interno del servidor")
    })?;
    if existing.is_none() {
        return Err(ApiError::not_found("Curso no encontrado"));
    }

    request.validate().map_err(|e| {
        tracing::warn!("Course validation failed: {}", e);
        ApiError::bad_request("Error en la solicitud")
    })?;

    course_service
        .update_course_by_id(&id, request)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update course {}: {:?}", id, e);
            ApiError::internal("Error interno del servidor")
        })?;

    Ok(Json(MessageResponse::new(
        StatusCode::OK.as_u16(),
        "Curso actualizado correctamente",
    )))
}

/// DELETE /rest/courses/{id} - delete a course (admin only)
pub async fn delete_course_by_id(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    let course_service = CourseService::new(state.mongo.clone());

    let existing = course_service.get_course_by_id(&id).await.map_err(|e| {
        tracing::error!("Failed to fetch course {}: {:?}", id, e);
        ApiError::internal("Error interno del servidor")
    })?;
    if existing.is_none() {
        return Err(ApiError::not_found("Curso no encontrado"));
    }

    course_service.delete_course_by_id(&id).await.map_err(|e| {
        tracing::error!("Failed to delete course {}: {:?}", id, e);
        ApiError::internal("Error interno del servidor")
    })?;

    Ok(Json(MessageResponse::new(
        StatusCode::OK.as_u16(),
        "Curso eliminado correctamente",
    )))
}
