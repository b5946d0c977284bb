use crate::api::AppState;
use crate::api::schemas::FeedbackRunResponse;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// Runs one feedback cycle for a feedback service and reports how many
/// devices were deactivated.
///
/// The two user-visible outcomes are a success count or a credential error
/// message; transport failures surface as gateway errors.
///
/// # Errors
/// Returns `AppError::NotFound` if the feedback service or its owning push
/// service is gone, or the propagated gateway/credential error.
pub async fn run_feedback(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let feedback_service = state.services.find_feedback_service(id).await?.ok_or(AppError::NotFound)?;
    let service = state.services.find_apn_service(feedback_service.apn_service_id).await?.ok_or(AppError::NotFound)?;

    let deactivated = state.feedback.run(&feedback_service, &service).await?;
    Ok(Json(FeedbackRunResponse { deactivated }))
}
