use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::extractors::AppJson;
use crate::handlers::{extract_bearer_token, require_admin, require_identity, ApiError};
use crate::metrics::ANSWER_CHECKS_TOTAL;
use crate::models::activity::{
    ActivityResponse, CheckAnswerRequest, CheckAnswerResponse, CreateActivityRequest,
    UpdateActivityRequest,
};
use crate::models::MessageResponse;
use crate::services::activity_service::ActivityService;
use crate::services::AppState;

/// POST /rest/activities - create an activity (admin only)
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(request): AppJson<CreateActivityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;

    request.validate().map_err(|e| {
        tracing::warn!("Activity validation failed: {}", e);
        ApiError::bad_request("Error en la solicitud")
    })?;
    request.ensure_single_correct_option().map_err(|e| {
        tracing::warn!("Activity validation failed: {}", e);
        ApiError::bad_request("Error en la solicitud")
    })?;

    let activity_service = ActivityService::new(state.mongo.clone());
    let created = activity_service
        .create_activity(request, &user.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create activity: {:?}", e);
            ApiError::internal("Error interno del servidor")
        })?;

    Ok((StatusCode::CREATED, Json(ActivityResponse::from(created))))
}

/// GET /rest/activities - list all activities
pub async fn get_all_activities(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let activity_service = ActivityService::new(state.mongo.clone());
    let activities = activity_service.get_all_activities().await.map_err(|e| {
        tracing::error!("Failed to list activities: {:?}", e);
        ApiError::internal("Error interno del servidor")
    })?;

    let activities: Vec<ActivityResponse> =
        activities.into_iter().map(ActivityResponse::from).collect();
    Ok(Json(activities))
}

/// GET /rest/activities/viewed - activities the caller has marked as viewed
pub async fn get_viewed_activities(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_identity(&state, &headers).await?;

    let activity_service = ActivityService::new(state.mongo.clone());
    let activities = activity_service
        .get_viewed_activities_by_user(&user.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list viewed activities for {}: {:?}", user.sub, e);
            ApiError::internal("Error interno del servidor")
        })?;

    let activities: Vec<ActivityResponse> =
        activities.into_iter().map(ActivityResponse::from).collect();
    Ok(Json(activities))
}

/// GET /rest/activities/{id} - fetch one activity (any authenticated caller)
pub async fn get_activity_by_id(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if extract_bearer_token(&headers).is_none() {
        return Err(ApiError::unauthorized("Token no encontrado"));
    }

    let activity_service = ActivityService::new(state.mongo.clone());
    let activity = activity_service
        .get_activity_by_id(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch activity {}: {:?}", id, e);
            ApiError::internal("Error interno del servidor")
        })?
        .ok_or_else(|| ApiError::not_found("Actividad no encontrada"))?;

    Ok(Json(ActivityResponse::from(activity)))
}

/// PUT /rest/activities/{id} - update an activity (admin only)
pub async fn update_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateActivityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    request.validate().map_err(|e| {
        tracing::warn!("Activity validation failed: {}", e);
        ApiError::bad_request("Error en la solicitud")
    })?;
    request.ensure_single_correct_option().map_err(|e| {
        tracing::warn!("Activity validation failed: {}", e);
        ApiError::bad_request("Error en la solicitud")
    })?;

    let activity_service = ActivityService::new(state.mongo.clone());
    let updated = activity_service
        .update_activity(&id, request)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update activity {}: {:?}", id, e);
            ApiError::internal("Error interno del servidor")
        })?
        .ok_or_else(|| ApiError::not_found("Actividad no encontrada"))?;

    Ok(Json(ActivityResponse::from(updated)))
}

/// DELETE /rest/activities/{id} - delete an activity (admin only)
pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers).await?;

    let activity_service = ActivityService::new(state.mongo.clone());
    let removed = activity_service.delete_activity(&id).await.map_err(|e| {
        tracing::error!("Failed to delete activity {}: {:?}", id, e);
        ApiError::internal("Error interno del servidor")
    })?;
    if removed.is_none() {
        return Err(ApiError::not_found("Actividad no encontrada"));
    }

    Ok(Json(MessageResponse::new(
        StatusCode::OK.as_u16(),
        "Actividad eliminada correctamente",
    )))
}

/// POST /rest/activities/{id}/viewed - record that the caller viewed the
/// activity (idempotent)
pub async fn mark_activity_as_viewed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_identity(&state, &headers).await?;

    let activity_service = ActivityService::new(state.mongo.clone());
    activity_service
        .mark_activity_as_viewed(&id, &user.sub)
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("no encontrada") {
                ApiError::not_found(message)
            } else {
                tracing::error!("Failed to mark activity {} as viewed: {:?}", id, e);
                ApiError::internal("Error interno del servidor")
            }
        })?;

    Ok(Json(MessageResponse::new(
        StatusCode::OK.as_u16(),
        "Actividad marcada como vista",
    )))
}

/// POST /rest/activities/{id}/answer - grade a submitted answer
pub async fn check_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    AppJson(request): AppJson<CheckAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if extract_bearer_token(&headers).is_none() {
        return Err(ApiError::unauthorized("Token no encontrado"));
    }

    let activity_service = ActivityService::new(state.mongo.clone());
    let activity = activity_service
        .get_activity_by_id(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch activity {}: {:?}", id, e);
            ApiError::internal("Error interno del servidor")
        })?
        .ok_or_else(|| ApiError::not_found("Actividad no encontrada"))?;

    let correct = activity.check_answer(&request.answer);
    ANSWER_CHECKS_TOTAL
        .with_label_values(&[if correct { "true" } else { "false" }])
        .inc();

    Ok(Json(CheckAnswerResponse { correct }))
}
