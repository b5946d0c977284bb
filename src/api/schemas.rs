use crate::domain::device::Device;
use crate::domain::notification::Notification;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub service_id: Uuid,
    pub token: String,
    pub platform: Option<String>,
    pub display: Option<String>,
    pub os_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub token: String,
    pub is_active: bool,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self { id: device.id, service_id: device.service_id, token: device.token, is_active: device.is_active }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub service_id: Uuid,
    pub message: String,
    pub badge: Option<i32>,
    pub sound: Option<String>,
    pub custom_payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub message: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self { id: notification.id, service_id: notification.service_id, message: notification.message }
    }
}

#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub requested_by: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackRunResponse {
    pub deactivated: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_minimal_body() {
        let body = format!(r#"{{"service_id": "{}", "token": "abcdef"}}"#, Uuid::nil());
        let request: RegisterDeviceRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(request.token, "abcdef");
        assert!(request.platform.is_none());
    }

    #[test]
    fn push_request_requires_requester() {
        assert!(serde_json::from_str::<PushRequest>("{}").is_err());
    }
}
