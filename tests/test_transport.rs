// Integration tests for the transports driving a real executor
// This file should be run with cargo test --test test_transport

#[path = "../src/executor/mod.rs"]
mod executor;

#[path = "../src/protocol/mod.rs"]
mod protocol;

#[path = "../src/transport/mod.rs"]
mod transport;

use executor::{Executor, ExecutorConfig, ExecutorKind};
use protocol::McpHandler;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use transport::{
    HttpConfig, HttpTransport, MessageHandler, StreamTransport, Transport, TransportError,
};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    });
}

fn shell_handler() -> McpHandler {
    let mut config = ExecutorConfig::new(ExecutorKind::Shell);
    config.tools_toml_path = std::path::PathBuf::from("/nonexistent/tools.toml");
    McpHandler::new(Arc::new(Executor::init(config)))
}

/// Delegates to the MCP handler and counts transport callbacks
struct CountingHandler {
    inner: McpHandler,
    errors: AtomicUsize,
    closes: AtomicUsize,
}

impl CountingHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: shell_handler(),
            errors: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl MessageHandler for CountingHandler {
    async fn on_message(&self, message: Value) -> Option<Value> {
        self.inner.handle(message).await
    }

    fn on_error(&self, _error: &TransportError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn loopback() -> HttpConfig {
    let mut config = HttpConfig::new(0);
    config.listen_addr = "127.0.0.1".to_string();
    config
}

async fn started_http(config: HttpConfig, handler: Arc<CountingHandler>) -> (HttpTransport, String) {
    let mut transport = HttpTransport::new(config);
    transport.start(handler).await.unwrap();
    let addr = transport.local_addr().unwrap();
    (transport, format!("http://{addr}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Responses leave the stream in request order
    #[tokio::test]
    async fn test_stream_preserves_order() {
        init_tracing();

        // Lines arrive in separate reads, the last one split mid-record
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n")
            .read(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .read(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n")
            .read(b"{\"name\":\"execute\",")
            .read(b"\"arguments\":{\"command\":\"echo B\"}}\n")
            .build();
        let (writer, mut peer) = tokio::io::duplex(64 * 1024);

        let handler = CountingHandler::new();
        let mut transport = StreamTransport::new(reader, writer);
        transport.start(handler.clone()).await.unwrap();
        transport.closed().await;
        drop(transport);

        let mut out = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut peer, &mut out)
            .await
            .unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[0]["result"]["serverInfo"]["name"], "mcp-shell-executor");
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"]["tools"][0]["name"], "execute");
        assert_eq!(lines[2]["content"][0]["text"], "B\n");
        assert_eq!(handler.closes.load(Ordering::SeqCst), 1);
    }

    /// Malformed lines are reported and do not end the session
    #[tokio::test]
    async fn test_stream_malformed_line() {
        init_tracing();

        let input = "{not json\n{\"jsonrpc\":\"2.0\",\"id\":\"p\",\"method\":\"ping\"}\n";
        let (writer, mut peer) = tokio::io::duplex(4096);

        let handler = CountingHandler::new();
        let mut transport = StreamTransport::new(std::io::Cursor::new(input.as_bytes().to_vec()), writer);
        transport.start(handler.clone()).await.unwrap();
        transport.closed().await;
        drop(transport);

        let mut out = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut peer, &mut out)
            .await
            .unwrap();
        let response: Value = serde_json::from_str(out.trim()).unwrap();

        assert_eq!(response["id"], "p");
        assert_eq!(response["result"], json!({}));
        assert_eq!(handler.errors.load(Ordering::SeqCst), 1);
    }

    /// Health answers before any tool call has been made
    #[tokio::test]
    async fn test_http_health() {
        init_tracing();

        let handler = CountingHandler::new();
        let (mut transport, base) = started_http(loopback(), handler.clone()).await;

        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "status": "ok" }));

        transport.close().await.unwrap();
        assert_eq!(handler.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_tools_call() {
        init_tracing();

        let handler = CountingHandler::new();
        let (mut transport, base) = started_http(loopback(), handler).await;
        let client = reqwest::Client::new();

        let response: Value = client
            .post(format!("{base}/"))
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": { "name": "execute", "arguments": { "command": "echo over-http" } }
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["content"][0]["text"], "over-http\n");

        transport.close().await.unwrap();
    }

    /// A bare `{name, arguments}` body gets a bare result back
    #[tokio::test]
    async fn test_http_bare_call() {
        init_tracing();

        let handler = CountingHandler::new();
        let (mut transport, base) = started_http(loopback(), handler).await;
        let client = reqwest::Client::new();

        let response: Value = client
            .post(format!("{base}/"))
            .json(&json!({ "name": "execute", "arguments": { "command": "whoami" } }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["isError"], true);
        assert!(
            response["content"][0]["text"]
                .as_str()
                .unwrap()
                .starts_with("Error: Command not allowed: whoami.")
        );

        transport.close().await.unwrap();
    }

    /// Unknown methods get a JSON-RPC error, not an HTTP one
    #[tokio::test]
    async fn test_http_method_not_found() {
        init_tracing();

        let handler = CountingHandler::new();
        let (mut transport, base) = started_http(loopback(), handler).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/"))
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "resources/list" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], -32601);

        transport.close().await.unwrap();
    }

    /// The bearer token guards `POST /` only
    #[tokio::test]
    async fn test_http_auth_token() {
        init_tracing();

        let mut config = loopback();
        config.auth_token = Some("s3cret".to_string());
        let handler = CountingHandler::new();
        let (mut transport, base) = started_http(config, handler).await;
        let client = reqwest::Client::new();
        let ping = json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });

        let denied = client
            .post(format!("{base}/"))
            .json(&ping)
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 401);

        let allowed = client
            .post(format!("{base}/"))
            .bearer_auth("s3cret")
            .json(&ping)
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), 200);

        let health = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(health.status(), 200);

        transport.close().await.unwrap();
    }

    /// A port already in use fails start and reports through `on_error`
    #[tokio::test]
    async fn test_http_bind_conflict() {
        init_tracing();

        let first_handler = CountingHandler::new();
        let (mut first, _) = started_http(loopback(), first_handler).await;
        let port = first.local_addr().unwrap().port();

        let mut config = loopback();
        config.listen_port = port;
        let handler = CountingHandler::new();
        let mut second = HttpTransport::new(config);
        let result = second.start(handler.clone()).await;

        assert!(matches!(result, Err(TransportError::BindFailed(_))));
        assert_eq!(handler.errors.load(Ordering::SeqCst), 1);

        first.close().await.unwrap();
    }
}
