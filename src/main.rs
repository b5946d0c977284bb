#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use apns_courier::api::AppState;
use apns_courier::config::Config;
use apns_courier::gateway::{GatewayTransport, TlsTransport};
use apns_courier::services::dispatch::PushDispatcher;
use apns_courier::services::feedback::FeedbackProcessor;
use apns_courier::services::registry::DeviceRegistry;
use apns_courier::storage::device_repo::DeviceRepository;
use apns_courier::storage::notification_repo::NotificationRepository;
use apns_courier::storage::registry::PgRegistry;
use apns_courier::storage::service_repo::ServiceRepository;
use apns_courier::{api, storage, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    let boot_span = tracing::info_span!("boot_server");
    let (listener, app_router) = async {
        // Phase 1: Infrastructure Setup
        let pool = storage::init_pool(&config.database_url).await?;
        storage::run_migrations(&pool).await?;

        // Phase 2: Component Wiring
        let transport: Arc<dyn GatewayTransport> = Arc::new(TlsTransport::new(&config.gateway)?);
        let registry: Arc<dyn DeviceRegistry> = Arc::new(PgRegistry::new(pool.clone()));
        let dispatcher = Arc::new(PushDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&transport),
            Duration::from_secs(config.gateway.expiry_secs),
        ));
        let feedback = Arc::new(FeedbackProcessor::new(Arc::clone(&registry), Arc::clone(&transport)));

        let state = AppState {
            dispatcher,
            feedback,
            registry,
            devices: DeviceRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            services: ServiceRepository::new(pool.clone()),
            pool,
        };

        // Phase 3: Runtime Setup
        let app_router = api::app_router(&config, state);
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        tracing::info!(address = %addr, "listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;

        Ok::<(tokio::net::TcpListener, axum::Router), anyhow::Error>((listener, app_router))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Serve until a shutdown signal arrives
    if let Err(e) = axum::serve(listener, app_router).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "Server error");
    }

    telemetry_guard.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
