use crate::domain::service::{ApnService, FeedbackService};
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::{ApnServiceRecord, FeedbackServiceRecord};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ServiceRepository {
    pool: DbPool,
}

impl ServiceRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetches a push service, including its credential material.
    ///
    /// # Errors
    /// Returns a database error if the query fails.
    pub async fn find_apn_service(&self, service_id: Uuid) -> Result<Option<ApnService>> {
        let record = sqlx::query_as::<_, ApnServiceRecord>(
            r"
            SELECT id, name, hostname, port, certificate_pem, private_key_pem, created_at
            FROM apn_services
            WHERE id = $1
            ",
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ApnService::from))
    }

    /// Fetches a feedback service.
    ///
    /// # Errors
    /// Returns a database error if the query fails.
    pub async fn find_feedback_service(&self, feedback_service_id: Uuid) -> Result<Option<FeedbackService>> {
        let record = sqlx::query_as::<_, FeedbackServiceRecord>(
            r"
            SELECT id, name, hostname, port, apn_service_id
            FROM feedback_services
            WHERE id = $1
            ",
        )
        .bind(feedback_service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(FeedbackService::from))
    }
}
