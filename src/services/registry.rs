use crate::domain::device::Device;
use crate::error::Result;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Thin contract over the datastore for the dispatcher and the feedback
/// processor. No business logic lives behind it; it exists so both
/// components run against an in-memory implementation in tests.
///
/// `last_notified_at` and `last_sent_at` are monotonic: implementations
/// must ignore writes that would move either backwards.
#[async_trait]
pub trait DeviceRegistry: Send + Sync + std::fmt::Debug {
    /// The active device set for a service at the moment of the call.
    async fn active_devices_for(&self, service_id: Uuid) -> Result<Vec<Device>>;

    /// Looks up a device by its hex token within one service.
    async fn find_by_token(&self, service_id: Uuid, token: &str) -> Result<Option<Device>>;

    /// Stamps `last_notified_at` on the given devices.
    async fn mark_notified(&self, device_ids: &[Uuid], at: OffsetDateTime) -> Result<()>;

    /// Deactivates a device, stamping `deactivated_at`.
    async fn deactivate(&self, device_id: Uuid, at: OffsetDateTime) -> Result<()>;

    /// Stamps `last_sent_at` on a notification.
    async fn touch_last_sent(&self, notification_id: Uuid, at: OffsetDateTime) -> Result<()>;
}
