use crate::config::Config;
use crate::services::dispatch::PushDispatcher;
use crate::services::feedback::FeedbackProcessor;
use crate::services::registry::DeviceRegistry;
use crate::storage::DbPool;
use crate::storage::device_repo::DeviceRepository;
use crate::storage::notification_repo::NotificationRepository;
use crate::storage::service_repo::ServiceRepository;
use axum::body::Body;
use axum::http::Request;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod devices;
pub mod feedback;
pub mod health;
pub mod notifications;
pub mod schemas;

#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<PushDispatcher>,
    pub feedback: Arc<FeedbackProcessor>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub devices: DeviceRepository,
    pub notifications: NotificationRepository,
    pub services: ServiceRepository,
    pub pool: DbPool,
}

/// Configures and returns the application router.
pub fn app_router(config: &Config, state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/devices", post(devices::register_device))
        .route("/devices/{id}", delete(devices::deactivate_device))
        .route("/notifications", post(notifications::create_notification))
        .route("/notifications/{id}/push", post(notifications::push_notification))
        .route("/feedback-services/{id}/run", post(feedback::run_feedback));

    Router::new()
        .route("/healthz", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/v1", api_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .with_state(state)
}
