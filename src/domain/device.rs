use time::OffsetDateTime;
use uuid::Uuid;

/// A registered device token within one push service.
///
/// Devices are never physically deleted: the feedback channel (or an
/// explicit admin action) flips `is_active` off and stamps `deactivated_at`,
/// and a later re-registration flips it back on.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: Uuid,
    pub service_id: Uuid,
    /// Hex-encoded token; raw bytes on the wire.
    pub token: String,
    pub is_active: bool,
    pub platform: Option<String>,
    pub display: Option<String>,
    pub os_version: Option<String>,
    pub added_at: OffsetDateTime,
    pub last_notified_at: Option<OffsetDateTime>,
    pub deactivated_at: Option<OffsetDateTime>,
}

impl Device {
    /// Decodes the stored token into the raw bytes sent on the wire.
    ///
    /// # Errors
    /// Returns an error if the stored token is not valid hex.
    pub fn token_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.token)
    }

    /// Whether a feedback report at `reported_at` should deactivate this device.
    ///
    /// A device notified after the gateway recorded the failure has
    /// re-registered in the meantime, so the report is stale and ignored.
    #[must_use]
    pub fn eligible_for_deactivation(&self, reported_at: OffsetDateTime) -> bool {
        self.is_active && self.last_notified_at.is_none_or(|at| at <= reported_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn device(last_notified_at: Option<OffsetDateTime>, is_active: bool) -> Device {
        Device {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            token: "616263".to_string(),
            is_active,
            platform: None,
            display: None,
            os_version: None,
            added_at: OffsetDateTime::UNIX_EPOCH,
            last_notified_at,
            deactivated_at: if is_active { None } else { Some(OffsetDateTime::UNIX_EPOCH) },
        }
    }

    #[test]
    fn never_notified_device_is_eligible() {
        let now = OffsetDateTime::now_utc();
        assert!(device(None, true).eligible_for_deactivation(now));
    }

    #[test]
    fn stale_report_is_ignored() {
        let reported_at = OffsetDateTime::now_utc();
        let renotified = device(Some(reported_at + Duration::seconds(10)), true);
        assert!(!renotified.eligible_for_deactivation(reported_at));
    }

    #[test]
    fn report_at_exact_notification_time_deactivates() {
        let at = OffsetDateTime::now_utc();
        assert!(device(Some(at), true).eligible_for_deactivation(at));
    }

    #[test]
    fn inactive_device_is_not_eligible() {
        let now = OffsetDateTime::now_utc();
        assert!(!device(None, false).eligible_for_deactivation(now));
    }

    #[test]
    fn token_bytes_decodes_hex() {
        assert_eq!(device(None, true).token_bytes().unwrap(), b"abc");
    }
}
