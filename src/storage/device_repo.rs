use crate::domain::device::Device;
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::DeviceRecord;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RegisterDevice {
    pub service_id: Uuid,
    pub token: String,
    pub platform: Option<String>,
    pub display: Option<String>,
    pub os_version: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DeviceRepository {
    pool: DbPool,
}

impl DeviceRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Registers a device token, reactivating it if it was previously
    /// deactivated. Metadata is refreshed from the new registration when
    /// provided.
    ///
    /// # Errors
    /// Returns a database error if the upsert fails.
    pub async fn register(&self, params: RegisterDevice) -> Result<Device> {
        let record = sqlx::query_as::<_, DeviceRecord>(
            r"
            INSERT INTO devices (service_id, token, platform, display, os_version)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (service_id, token) DO UPDATE
            SET is_active = TRUE,
                deactivated_at = NULL,
                platform = COALESCE(EXCLUDED.platform, devices.platform),
                display = COALESCE(EXCLUDED.display, devices.display),
                os_version = COALESCE(EXCLUDED.os_version, devices.os_version)
            RETURNING id, service_id, token, is_active, platform, display, os_version,
                      added_at, last_notified_at, deactivated_at
            ",
        )
        .bind(params.service_id)
        .bind(params.token)
        .bind(params.platform)
        .bind(params.display)
        .bind(params.os_version)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    /// Fetches a device by id.
    ///
    /// # Errors
    /// Returns a database error if the query fails.
    pub async fn find(&self, device_id: Uuid) -> Result<Option<Device>> {
        let record = sqlx::query_as::<_, DeviceRecord>(
            r"
            SELECT id, service_id, token, is_active, platform, display, os_version,
                   added_at, last_notified_at, deactivated_at
            FROM devices
            WHERE id = $1
            ",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Device::from))
    }
}
