use crate::api::AppState;
use crate::api::schemas::{CreateNotificationRequest, NotificationResponse, PushRequest};
use crate::error::{AppError, Result};
use crate::storage::notification_repo::CreateNotification;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Creates a notification. The payload is immutable after this point.
///
/// # Errors
/// Returns `AppError::NotFound` if the service does not exist.
/// Returns `AppError::BadRequest` if the custom payload is not a JSON object.
pub async fn create_notification(
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse> {
    if let Some(custom) = &payload.custom_payload
        && !custom.is_object()
    {
        return Err(AppError::BadRequest("custom payload must be a JSON object".to_string()));
    }
    if state.services.find_apn_service(payload.service_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let notification = state
        .notifications
        .create(CreateNotification {
            service_id: payload.service_id,
            message: payload.message,
            badge: payload.badge,
            sound: payload.sound,
            custom_payload: payload.custom_payload,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(NotificationResponse::from(notification))))
}

/// Dispatches a notification to every active device of its service and
/// returns the per-device outcome counts.
///
/// # Errors
/// Returns `AppError::NotFound` if the notification or its service is gone,
/// a gateway error if the connection cannot be established, or a database
/// error from the registry.
pub async fn push_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PushRequest>,
) -> Result<impl IntoResponse> {
    let notification = state.notifications.find(id).await?.ok_or(AppError::NotFound)?;
    let service = state.services.find_apn_service(notification.service_id).await?.ok_or(AppError::NotFound)?;

    let report = state.dispatcher.push_notification(&notification, &service, &payload.requested_by).await?;
    Ok(Json(report))
}
