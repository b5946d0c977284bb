use crate::api::AppState;
use crate::api::schemas::{DeviceResponse, RegisterDeviceRequest};
use crate::error::{AppError, Result};
use crate::storage::device_repo::RegisterDevice;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use time::OffsetDateTime;
use uuid::Uuid;

/// Registers a device token, reactivating it if it was previously
/// deactivated by feedback or an admin.
///
/// # Errors
/// Returns `AppError::BadRequest` if the token is not non-empty hex.
/// Returns `AppError::Database` if the upsert fails.
pub async fn register_device(
    State(state): State<AppState>,
    Json(payload): Json<RegisterDeviceRequest>,
) -> Result<impl IntoResponse> {
    let token = payload.token.to_lowercase();
    match hex::decode(&token) {
        Ok(bytes) if !bytes.is_empty() => {}
        _ => return Err(AppError::BadRequest("device token must be non-empty hex".to_string())),
    }
    if state.services.find_apn_service(payload.service_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let device = state
        .devices
        .register(RegisterDevice {
            service_id: payload.service_id,
            token,
            platform: payload.platform,
            display: payload.display,
            os_version: payload.os_version,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}

/// Explicit admin deactivation of a device.
///
/// # Errors
/// Returns `AppError::NotFound` if the device does not exist.
/// Returns `AppError::Database` if the update fails.
pub async fn deactivate_device(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let device = state.devices.find(id).await?.ok_or(AppError::NotFound)?;
    if device.is_active {
        state.registry.deactivate(device.id, OffsetDateTime::now_utc()).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
