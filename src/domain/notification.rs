use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

/// A push message belonging to one service.
///
/// The payload fields are immutable after creation; `last_sent_at` is the
/// only field the dispatcher mutates, and only forward in time.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub service_id: Uuid,
    pub message: String,
    pub badge: Option<i32>,
    pub sound: Option<String>,
    pub custom_payload: Option<Value>,
    pub created_at: OffsetDateTime,
    pub last_sent_at: Option<OffsetDateTime>,
}

impl Notification {
    /// Builds the wire payload: the `aps` dictionary plus any custom
    /// top-level keys. Custom keys never override `aps`.
    #[must_use]
    pub fn payload_json(&self) -> Value {
        let mut aps = Map::new();
        aps.insert("alert".to_string(), json!(self.message));
        if let Some(badge) = self.badge {
            aps.insert("badge".to_string(), json!(badge));
        }
        if let Some(sound) = &self.sound {
            aps.insert("sound".to_string(), json!(sound));
        }

        let mut root = Map::new();
        if let Some(Value::Object(custom)) = &self.custom_payload {
            for (key, value) in custom {
                if key != "aps" {
                    root.insert(key.clone(), value.clone());
                }
            }
        }
        root.insert("aps".to_string(), Value::Object(aps));
        Value::Object(root)
    }

    /// The UTF-8 JSON bytes framed by the wire codec.
    #[must_use]
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload_json().to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(custom_payload: Option<Value>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            message: "hello".to_string(),
            badge: Some(3),
            sound: Some("default".to_string()),
            custom_payload,
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_sent_at: None,
        }
    }

    #[test]
    fn payload_contains_aps_fields() {
        let payload = notification(None).payload_json();
        assert_eq!(payload["aps"]["alert"], "hello");
        assert_eq!(payload["aps"]["badge"], 3);
        assert_eq!(payload["aps"]["sound"], "default");
    }

    #[test]
    fn null_fields_are_omitted() {
        let mut n = notification(None);
        n.badge = None;
        n.sound = None;
        let payload = n.payload_json();
        assert!(payload["aps"].get("badge").is_none());
        assert!(payload["aps"].get("sound").is_none());
    }

    #[test]
    fn custom_keys_are_merged_at_top_level() {
        let payload = notification(Some(json!({"thread": "t-1"}))).payload_json();
        assert_eq!(payload["thread"], "t-1");
        assert_eq!(payload["aps"]["alert"], "hello");
    }

    #[test]
    fn custom_payload_cannot_override_aps() {
        let payload = notification(Some(json!({"aps": {"alert": "spoofed"}}))).payload_json();
        assert_eq!(payload["aps"]["alert"], "hello");
    }
}
