use std::fmt;
use thiserror::Error;

pub mod connection;
pub mod credentials;

pub use connection::{GatewayConnection, GatewayStream, GatewayTransport, Read, TlsTransport};
pub use credentials::TlsIdentity;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Malformed, mismatched, or still-encrypted credential material.
    /// Fatal: surfaced verbatim to the triggering layer, never retried.
    #[error("{0}")]
    InvalidCredential(String),
    /// Transport-level connect or handshake failure. Retryable by the caller.
    #[error("gateway connection failed: {0}")]
    Connect(#[source] std::io::Error),
    /// A single write failed; the batch decides whether to continue.
    #[error("gateway send failed: {0}")]
    Send(#[source] std::io::Error),
}

/// A gateway address, either push or feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
