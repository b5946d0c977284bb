use crate::gateway::Endpoint;
use time::OffsetDateTime;
use uuid::Uuid;

/// A push gateway endpoint and the credential material used to authenticate
/// against it. Immutable once in use, except for credential rotation.
#[derive(Debug, Clone)]
pub struct ApnService {
    pub id: Uuid,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    /// Already-decrypted PEM material; malformed or still-encrypted input
    /// surfaces as an invalid-credential error at connect time.
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub created_at: OffsetDateTime,
}

impl ApnService {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint { host: self.hostname.clone(), port: self.port }
    }
}

/// The feedback channel tied to one push service.
#[derive(Debug, Clone)]
pub struct FeedbackService {
    pub id: Uuid,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub apn_service_id: Uuid,
}

impl FeedbackService {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint { host: self.hostname.clone(), port: self.port }
    }
}
