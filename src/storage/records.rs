use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct DeviceRecord {
    pub id: Uuid,
    pub service_id: Uuid,
    pub token: String,
    pub is_active: bool,
    pub platform: Option<String>,
    pub display: Option<String>,
    pub os_version: Option<String>,
    pub added_at: OffsetDateTime,
    pub last_notified_at: Option<OffsetDateTime>,
    pub deactivated_at: Option<OffsetDateTime>,
}

impl From<DeviceRecord> for crate::domain::device::Device {
    fn from(record: DeviceRecord) -> Self {
        Self {
            id: record.id,
            service_id: record.service_id,
            token: record.token,
            is_active: record.is_active,
            platform: record.platform,
            display: record.display,
            os_version: record.os_version,
            added_at: record.added_at,
            last_notified_at: record.last_notified_at,
            deactivated_at: record.deactivated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct NotificationRecord {
    pub id: Uuid,
    pub service_id: Uuid,
    pub message: String,
    pub badge: Option<i32>,
    pub sound: Option<String>,
    pub custom_payload: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
    pub last_sent_at: Option<OffsetDateTime>,
}

impl From<NotificationRecord> for crate::domain::notification::Notification {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            service_id: record.service_id,
            message: record.message,
            badge: record.badge,
            sound: record.sound,
            custom_payload: record.custom_payload,
            created_at: record.created_at,
            last_sent_at: record.last_sent_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ApnServiceRecord {
    pub id: Uuid,
    pub name: String,
    pub hostname: String,
    pub port: i32,
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub created_at: OffsetDateTime,
}

impl From<ApnServiceRecord> for crate::domain::service::ApnService {
    fn from(record: ApnServiceRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            hostname: record.hostname,
            // The schema constrains ports to the u16 range.
            port: u16::try_from(record.port).unwrap_or_default(),
            certificate_pem: record.certificate_pem,
            private_key_pem: record.private_key_pem,
            created_at: record.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FeedbackServiceRecord {
    pub id: Uuid,
    pub name: String,
    pub hostname: String,
    pub port: i32,
    pub apn_service_id: Uuid,
}

impl From<FeedbackServiceRecord> for crate::domain::service::FeedbackService {
    fn from(record: FeedbackServiceRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            hostname: record.hostname,
            port: u16::try_from(record.port).unwrap_or_default(),
            apn_service_id: record.apn_service_id,
        }
    }
}
