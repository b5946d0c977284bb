use crate::config::GatewayConfig;
use crate::gateway::credentials::TlsIdentity;
use crate::gateway::{Endpoint, GatewayError};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use bytes::BytesMut;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::rustls::pki_types::ServerName;

pub trait GatewayStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<S: AsyncRead + AsyncWrite + Send + Unpin> GatewayStream for S {}

/// Opens authenticated byte-stream connections to push and feedback gateways.
#[async_trait]
pub trait GatewayTransport: Send + Sync + fmt::Debug {
    /// Connects and authenticates with the given identity.
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidCredential` for unusable credential
    /// material and `GatewayError::Connect` for network-level failure.
    async fn open(&self, endpoint: &Endpoint, identity: &TlsIdentity) -> Result<GatewayConnection, GatewayError>;
}

/// Result of a single read from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// Bytes were appended to the buffer.
    Data(usize),
    /// The server closed the stream; no more data will arrive.
    Closed,
}

/// One established gateway connection. The component that opens a connection
/// is responsible for closing it on every exit path.
pub struct GatewayConnection {
    stream: Box<dyn GatewayStream>,
    endpoint: Endpoint,
    send_timeout: Duration,
    read_timeout: Duration,
}

impl GatewayConnection {
    #[must_use]
    pub fn new(stream: Box<dyn GatewayStream>, endpoint: Endpoint, send_timeout: Duration, read_timeout: Duration) -> Self {
        Self { stream, endpoint, send_timeout, read_timeout }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Writes one complete frame.
    ///
    /// # Errors
    /// Returns `GatewayError::Send` on partial write, broken pipe, or timeout;
    /// the caller decides whether to reconnect and retry.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), GatewayError> {
        let send_timeout = self.send_timeout;
        let write = async {
            self.stream.write_all(frame).await?;
            self.stream.flush().await
        };
        match timeout(send_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(GatewayError::Send(e)),
            Err(_) => Err(GatewayError::Send(io::Error::new(io::ErrorKind::TimedOut, "send timed out"))),
        }
    }

    /// Reads whatever is currently available into `buf`.
    ///
    /// # Errors
    /// Returns `GatewayError::Connect` on IO failure or timeout.
    pub async fn read_available(&mut self, buf: &mut BytesMut) -> Result<Read, GatewayError> {
        match timeout(self.read_timeout, self.stream.read_buf(buf)).await {
            Ok(Ok(0)) => Ok(Read::Closed),
            Ok(Ok(n)) => Ok(Read::Data(n)),
            Ok(Err(e)) => Err(GatewayError::Connect(e)),
            Err(_) => Err(GatewayError::Connect(io::Error::new(io::ErrorKind::TimedOut, "read timed out"))),
        }
    }

    /// Gracefully closes the connection. Close failures are ignored; the
    /// gateway treats an abrupt close the same way.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

impl fmt::Debug for GatewayConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConnection").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

/// Production transport: TCP connect with exponential backoff, then a rustls
/// handshake presenting the service's client certificate.
#[derive(Debug, Clone)]
pub struct TlsTransport {
    roots: Arc<RootCertStore>,
    connect_timeout: Duration,
    connect_retries: usize,
    send_timeout: Duration,
    read_timeout: Duration,
}

impl TlsTransport {
    /// Builds a transport trusting the CA bundle named in the config.
    ///
    /// # Errors
    /// Returns `GatewayError::Connect` when the CA bundle cannot be read.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pem = std::fs::read(&config.ca_file).map_err(GatewayError::Connect)?;
        let mut roots = RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
            let cert = cert.map_err(GatewayError::Connect)?;
            let _ = roots.add(cert);
        }
        if roots.is_empty() {
            return Err(GatewayError::Connect(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no usable CA certificates in {}", config.ca_file.display()),
            )));
        }

        Ok(Self {
            roots: Arc::new(roots),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            connect_retries: config.connect_retries,
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
        })
    }

    async fn connect_tcp(&self, endpoint: &Endpoint) -> Result<TcpStream, io::Error> {
        let attempt = || async {
            match timeout(self.connect_timeout, TcpStream::connect((endpoint.host.as_str(), endpoint.port))).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
            }
        };

        attempt
            .retry(ExponentialBuilder::default().with_max_times(self.connect_retries))
            .notify(|err: &io::Error, after: Duration| {
                tracing::warn!(endpoint = %endpoint, error = %err, retry_in = ?after, "gateway connect failed, retrying");
            })
            .await
    }
}

#[async_trait]
impl GatewayTransport for TlsTransport {
    #[tracing::instrument(level = "debug", skip(self, identity), fields(endpoint = %endpoint))]
    async fn open(&self, endpoint: &Endpoint, identity: &TlsIdentity) -> Result<GatewayConnection, GatewayError> {
        let tls_config = identity.client_config(Arc::clone(&self.roots))?;
        let connector = TlsConnector::from(Arc::new(tls_config));

        let tcp = self.connect_tcp(endpoint).await.map_err(GatewayError::Connect)?;
        tcp.set_nodelay(true).map_err(GatewayError::Connect)?;

        let server_name = ServerName::try_from(endpoint.host.clone())
            .map_err(|e| GatewayError::Connect(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let stream = match timeout(self.connect_timeout, connector.connect(server_name, tcp)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(GatewayError::Connect(e)),
            Err(_) => {
                return Err(GatewayError::Connect(io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out")));
            }
        };

        tracing::debug!(endpoint = %endpoint, "gateway connection established");
        Ok(GatewayConnection::new(Box::new(stream), endpoint.clone(), self.send_timeout, self.read_timeout))
    }
}
