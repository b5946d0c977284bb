use crate::domain::service::{ApnService, FeedbackService};
use crate::error::{AppError, Result};
use crate::gateway::{GatewayConnection, GatewayTransport, Read, TlsIdentity};
use crate::protocol::{FeedbackCodec, FeedbackTuple};
use crate::services::registry::DeviceRegistry;
use bytes::BytesMut;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio_util::codec::Decoder;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    tuples_read: Counter<u64>,
    devices_deactivated: Counter<u64>,
    tuples_skipped: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("apns-courier");
        Self {
            tuples_read: meter
                .u64_counter("feedback_tuples_read_total")
                .with_description("Total tuples decoded from feedback streams")
                .build(),
            devices_deactivated: meter
                .u64_counter("feedback_devices_deactivated_total")
                .with_description("Devices deactivated by feedback reports")
                .build(),
            tuples_skipped: meter
                .u64_counter("feedback_tuples_skipped_total")
                .with_description("Tuples skipped because the token was unknown or the report stale")
                .build(),
        }
    }
}

/// Drains one batch from a feedback channel and deactivates the devices the
/// gateway reports as permanently unreachable.
#[derive(Debug)]
pub struct FeedbackProcessor {
    registry: Arc<dyn DeviceRegistry>,
    transport: Arc<dyn GatewayTransport>,
    metrics: Metrics,
}

impl FeedbackProcessor {
    #[must_use]
    pub fn new(registry: Arc<dyn DeviceRegistry>, transport: Arc<dyn GatewayTransport>) -> Self {
        Self { registry, transport, metrics: Metrics::new() }
    }

    /// Runs one feedback cycle and returns the number of devices deactivated.
    ///
    /// The server closing the stream ends the batch; this is a finite read
    /// per invocation, not a subscription.
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidCredential` unchanged when the owning
    /// service's credentials are unusable — in that case no deactivation has
    /// been applied — or a connect/database error from mid-stream failure.
    #[tracing::instrument(err, skip(self, feedback, service), fields(feedback_service = %feedback.name))]
    pub async fn run(&self, feedback: &FeedbackService, service: &ApnService) -> Result<u64> {
        let identity = TlsIdentity::from_pem(&service.certificate_pem, &service.private_key_pem)?;
        let mut conn = self.transport.open(&feedback.endpoint(), &identity).await?;

        // The connection is closed on every exit path, including errors.
        let result = self.drain(&mut conn, service.id).await;
        conn.shutdown().await;

        let deactivated = result?;
        tracing::info!(deactivated, "feedback cycle completed");
        Ok(deactivated)
    }

    async fn drain(&self, conn: &mut GatewayConnection, service_id: Uuid) -> Result<u64> {
        let mut codec = FeedbackCodec;
        let mut buf = BytesMut::with_capacity(4096);
        let mut deactivated = 0u64;

        loop {
            let read = conn.read_available(&mut buf).await?;

            while let Some(tuple) = codec.decode(&mut buf)? {
                self.metrics.tuples_read.add(1, &[]);
                if self.apply(service_id, &tuple).await? {
                    deactivated += 1;
                }
            }

            if read == Read::Closed {
                break;
            }
        }

        Ok(deactivated)
    }

    /// Applies one deactivation tuple; returns whether a device was
    /// deactivated.
    async fn apply(&self, service_id: Uuid, tuple: &FeedbackTuple) -> Result<bool> {
        let token = hex::encode(&tuple.token);
        let reported_at = OffsetDateTime::from_unix_timestamp(i64::from(tuple.timestamp))
            .map_err(|_| AppError::Internal)?;

        let Some(device) = self.registry.find_by_token(service_id, &token).await? else {
            tracing::debug!(%token, "feedback tuple for unknown token");
            self.metrics.tuples_skipped.add(1, &[]);
            return Ok(false);
        };

        if !device.eligible_for_deactivation(reported_at) {
            tracing::debug!(device_id = %device.id, %token, "feedback tuple is stale, device keeps its registration");
            self.metrics.tuples_skipped.add(1, &[]);
            return Ok(false);
        }

        self.registry.deactivate(device.id, reported_at).await?;
        self.metrics.devices_deactivated.add(1, &[]);
        tracing::info!(device_id = %device.id, %token, "device deactivated by feedback report");
        Ok(true)
    }
}
