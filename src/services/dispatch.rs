use crate::domain::notification::Notification;
use crate::domain::service::ApnService;
use crate::error::{AppError, Result};
use crate::gateway::{GatewayTransport, TlsIdentity};
use crate::protocol::{EncodeError, MAX_PAYLOAD_BYTES, encode_push_frame};
use crate::services::registry::DeviceRegistry;
use dashmap::DashMap;
use opentelemetry::{KeyValue, global, metrics::Counter};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    frames_sent: Counter<u64>,
    send_failures: Counter<u64>,
    devices_aborted: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("apns-courier");
        Self {
            frames_sent: meter
                .u64_counter("push_frames_sent_total")
                .with_description("Total push frames written to a gateway")
                .build(),
            send_failures: meter
                .u64_counter("push_send_failures_total")
                .with_description("Per-device send failures, including failed retries")
                .build(),
            devices_aborted: meter
                .u64_counter("push_devices_aborted_total")
                .with_description("Devices skipped because the gateway connection was lost mid-batch")
                .build(),
        }
    }
}

/// Per-device outcome counts for one dispatch, plus who asked for it.
/// The requester identity is carried for the caller's audit trail; the
/// core does not persist it.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
    pub requested_by: String,
}

/// Sends one notification to every eligible device of its service over a
/// single gateway connection.
#[derive(Debug)]
pub struct PushDispatcher {
    registry: Arc<dyn DeviceRegistry>,
    transport: Arc<dyn GatewayTransport>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    frame_ids: AtomicU32,
    expiry: Duration,
    metrics: Metrics,
}

impl PushDispatcher {
    #[must_use]
    pub fn new(registry: Arc<dyn DeviceRegistry>, transport: Arc<dyn GatewayTransport>, expiry: Duration) -> Self {
        Self {
            registry,
            transport,
            locks: DashMap::new(),
            frame_ids: AtomicU32::new(0),
            expiry,
            metrics: Metrics::new(),
        }
    }

    /// Dispatches `notification` to the current active device set of
    /// `service`.
    ///
    /// Individual send failures get one reconnect-and-retry and are then
    /// recorded as `failed`; losing the connection aborts the remainder of
    /// the batch, recorded as `aborted`. `last_sent_at` moves only if at
    /// least one device succeeded.
    ///
    /// # Errors
    /// Returns a credential or connect error if the initial connection
    /// cannot be established, an encoding error if the payload exceeds the
    /// protocol limit, or a database error from the registry.
    #[tracing::instrument(
        err,
        skip(self, notification, service),
        fields(notification_id = %notification.id, service = %service.name, requested_by = %requested_by)
    )]
    pub async fn push_notification(
        &self,
        notification: &Notification,
        service: &ApnService,
        requested_by: &str,
    ) -> Result<DispatchReport> {
        let payload = notification.payload_bytes();
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(AppError::Encoding(EncodeError::PayloadTooLarge(payload.len())));
        }

        // The gateway protocol forbids interleaved writers on one stream, so
        // concurrent dispatches for the same service take turns. Dispatches
        // for different services proceed in parallel on their own connections.
        let lock = {
            let entry = self.locks.entry(service.id).or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = lock.lock().await;

        let started_at = OffsetDateTime::now_utc();
        let devices = self.registry.active_devices_for(service.id).await?;
        if devices.is_empty() {
            tracing::info!("no active devices, nothing to dispatch");
            return Ok(DispatchReport {
                attempted: 0,
                succeeded: 0,
                failed: 0,
                aborted: 0,
                requested_by: requested_by.to_string(),
            });
        }

        let identity = TlsIdentity::from_pem(&service.certificate_pem, &service.private_key_pem)?;
        let endpoint = service.endpoint();
        let mut conn = self.transport.open(&endpoint, &identity).await?;

        let expiry = expiry_epoch(started_at, self.expiry);
        let mut succeeded_ids: Vec<Uuid> = Vec::with_capacity(devices.len());
        let mut failed = 0usize;
        let mut aborted = 0usize;

        for (index, device) in devices.iter().enumerate() {
            let frame = match device.token_bytes().map_err(|e| e.to_string()).and_then(|token| {
                encode_push_frame(&token, &payload, self.next_frame_id(), expiry).map_err(|e| e.to_string())
            }) {
                Ok(frame) => frame,
                Err(reason) => {
                    tracing::warn!(device_id = %device.id, %reason, "skipping device with unencodable token");
                    self.metrics.send_failures.add(1, &[KeyValue::new("reason", "bad_token")]);
                    failed += 1;
                    continue;
                }
            };

            match conn.send(&frame).await {
                Ok(()) => {
                    self.metrics.frames_sent.add(1, &[]);
                    succeeded_ids.push(device.id);
                }
                Err(send_err) => {
                    tracing::warn!(device_id = %device.id, error = %send_err, "send failed, reconnecting once");
                    conn.shutdown().await;
                    match self.transport.open(&endpoint, &identity).await {
                        Ok(fresh) => {
                            conn = fresh;
                            if let Err(retry_err) = conn.send(&frame).await {
                                tracing::warn!(device_id = %device.id, error = %retry_err, "retry failed, recording device as failed");
                                self.metrics.send_failures.add(1, &[KeyValue::new("reason", "send")]);
                                failed += 1;
                            } else {
                                self.metrics.frames_sent.add(1, &[]);
                                succeeded_ids.push(device.id);
                            }
                        }
                        Err(reopen_err) => {
                            aborted = devices.len() - index;
                            tracing::error!(
                                error = %reopen_err,
                                aborted,
                                "gateway connection lost, aborting remainder of batch"
                            );
                            self.metrics.devices_aborted.add(aborted as u64, &[]);
                            break;
                        }
                    }
                }
            }
        }

        conn.shutdown().await;

        let succeeded = succeeded_ids.len();
        if succeeded > 0 {
            self.registry.mark_notified(&succeeded_ids, started_at).await?;
            self.registry.touch_last_sent(notification.id, started_at).await?;
        }

        let report = DispatchReport {
            attempted: succeeded + failed,
            succeeded,
            failed,
            aborted,
            requested_by: requested_by.to_string(),
        };
        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            aborted = report.aborted,
            "dispatch completed"
        );
        Ok(report)
    }

    fn next_frame_id(&self) -> u32 {
        self.frame_ids.fetch_add(1, Ordering::Relaxed)
    }
}

fn expiry_epoch(started_at: OffsetDateTime, ttl: Duration) -> u32 {
    let expires_at = started_at + ttl;
    u32::try_from(expires_at.unix_timestamp()).unwrap_or(u32::MAX)
}
