use crate::domain::device::Device;
use crate::error::Result;
use crate::services::registry::DeviceRegistry;
use crate::storage::DbPool;
use crate::storage::records::DeviceRecord;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Postgres-backed implementation of the device registry facade.
///
/// The monotonic rules for `last_notified_at` and `last_sent_at` are
/// expressed in the UPDATE guards, which also makes concurrent writers
/// last-write-wins without moving either field backwards.
#[derive(Clone, Debug)]
pub struct PgRegistry {
    pool: DbPool,
}

impl PgRegistry {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRegistry for PgRegistry {
    async fn active_devices_for(&self, service_id: Uuid) -> Result<Vec<Device>> {
        let records = sqlx::query_as::<_, DeviceRecord>(
            r"
            SELECT id, service_id, token, is_active, platform, display, os_version,
                   added_at, last_notified_at, deactivated_at
            FROM devices
            WHERE service_id = $1 AND is_active
            ORDER BY added_at ASC
            ",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Device::from).collect())
    }

    async fn find_by_token(&self, service_id: Uuid, token: &str) -> Result<Option<Device>> {
        let record = sqlx::query_as::<_, DeviceRecord>(
            r"
            SELECT id, service_id, token, is_active, platform, display, os_version,
                   added_at, last_notified_at, deactivated_at
            FROM devices
            WHERE service_id = $1 AND token = $2
            ",
        )
        .bind(service_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Device::from))
    }

    async fn mark_notified(&self, device_ids: &[Uuid], at: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r"
            UPDATE devices
            SET last_notified_at = $2
            WHERE id = ANY($1) AND (last_notified_at IS NULL OR last_notified_at < $2)
            ",
        )
        .bind(device_ids.to_vec())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn deactivate(&self, device_id: Uuid, at: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r"
            UPDATE devices
            SET is_active = FALSE, deactivated_at = $2
            WHERE id = $1 AND is_active
            ",
        )
        .bind(device_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch_last_sent(&self, notification_id: Uuid, at: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r"
            UPDATE notifications
            SET last_sent_at = $2
            WHERE id = $1 AND (last_sent_at IS NULL OR last_sent_at < $2)
            ",
        )
        .bind(notification_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
