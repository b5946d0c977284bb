use crate::domain::notification::Notification;
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::NotificationRecord;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub service_id: Uuid,
    pub message: String,
    pub badge: Option<i32>,
    pub sound: Option<String>,
    pub custom_payload: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct NotificationRepository {
    pool: DbPool,
}

impl NotificationRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Creates a notification. The payload is immutable from here on.
    ///
    /// # Errors
    /// Returns a database error if the insert fails.
    pub async fn create(&self, params: CreateNotification) -> Result<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r"
            INSERT INTO notifications (service_id, message, badge, sound, custom_payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, service_id, message, badge, sound, custom_payload, created_at, last_sent_at
            ",
        )
        .bind(params.service_id)
        .bind(params.message)
        .bind(params.badge)
        .bind(params.sound)
        .bind(params.custom_payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    /// Fetches a notification by id.
    ///
    /// # Errors
    /// Returns a database error if the query fails.
    pub async fn find(&self, notification_id: Uuid) -> Result<Option<Notification>> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r"
            SELECT id, service_id, message, badge, sound, custom_payload, created_at, last_sent_at
            FROM notifications
            WHERE id = $1
            ",
        )
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Notification::from))
    }
}
