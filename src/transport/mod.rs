// Transport module - carries envelopes between a caller and the message handler
// Two variants share one interface: newline-delimited JSON over stdio, and HTTP.

pub mod config;
pub mod error;
pub mod http;
pub mod stream;

pub use config::{HttpConfig, TransportConfig, TransportKind};
pub use error::{Result, TransportError};
pub use http::HttpTransport;
pub use stream::StreamTransport;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Callbacks a transport invokes while a session is live
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one inbound message; `None` means nothing is written back
    async fn on_message(&self, message: Value) -> Option<Value>;

    /// A transport-level fault (malformed input, bind failure, broken pipe)
    fn on_error(&self, error: &TransportError) {
        warn!(error = %error, "transport error");
    }

    /// The session ended
    fn on_close(&self) {
        info!("transport session closed");
    }
}

/// A wire mechanism for request/response envelopes
#[async_trait]
pub trait Transport: Send {
    /// Begin serving; resolves once the transport is accepting messages
    async fn start(&mut self, handler: Arc<dyn MessageHandler>) -> Result<()>;

    /// Push an unsolicited message to the peer
    async fn send(&self, message: &Value) -> Result<()>;

    /// Stop serving and release the underlying resources
    async fn close(&mut self) -> Result<()>;

    /// Resolves when the session ends without `close` being called
    async fn closed(&mut self);
}

/// Build the transport selected by configuration
pub fn from_config(config: &TransportConfig) -> Box<dyn Transport> {
    match &config.kind {
        TransportKind::Stream => Box::new(StreamTransport::stdio()),
        TransportKind::Http(http) => Box::new(HttpTransport::new(http.clone())),
    }
}
