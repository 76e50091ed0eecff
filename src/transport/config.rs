use crate::transport::error::{Result, TransportError};
use std::net::SocketAddr;

/// Default request body limit (50 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Which wire mechanism carries envelopes for this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Newline-delimited JSON over stdin/stdout
    Stream,
    /// JSON bodies over `POST /`
    Http(HttpConfig),
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Listen address (default: 0.0.0.0)
    pub listen_addr: String,
    /// Listen port
    pub listen_port: u16,
    /// Maximum request body size in bytes (default: 50 MiB)
    pub max_body_bytes: usize,
    /// Bearer token required on `POST /` when set
    pub auth_token: Option<String>,
}

impl HttpConfig {
    pub fn new(listen_port: u16) -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            auth_token: None,
        }
    }

    /// Returns the socket address to bind to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_addr, self.listen_port)
            .parse()
            .map_err(|e| {
                TransportError::InvalidAddress(format!(
                    "{}:{}: {}",
                    self.listen_addr, self.listen_port, e
                ))
            })
    }
}

/// Transport session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub kind: TransportKind,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Stream,
        }
    }
}

impl TransportConfig {
    pub fn http(config: HttpConfig) -> Self {
        Self {
            kind: TransportKind::Http(config),
        }
    }

    /// Human-readable transport name for logs
    pub fn name(&self) -> &'static str {
        match self.kind {
            TransportKind::Stream => "stdio",
            TransportKind::Http(_) => "http",
        }
    }
}
