use crate::transport::config::HttpConfig;
use crate::transport::error::{Result, TransportError};
use crate::transport::{MessageHandler, Transport};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Error body returned by the HTTP transport: `{"error": {"message": ...}}`
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": { "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

/// Shared state for the HTTP routes
#[derive(Clone)]
pub struct HttpState {
    handler: Arc<dyn MessageHandler>,
    auth_token: Option<Arc<str>>,
}

impl HttpState {
    pub fn new(handler: Arc<dyn MessageHandler>, auth_token: Option<String>) -> Self {
        Self {
            handler,
            auth_token: auth_token.map(Arc::from),
        }
    }
}

/// Build the transport router: `POST /` for messages, `GET /health` for liveness checks
pub fn build_router(state: HttpState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", post(handle_message))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}

/// Render a handler panic as a 500 with the panic text
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    error!(error = %message, "error processing message");
    HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

async fn handle_message(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Response, HttpError> {
    if let Some(token) = state.auth_token.as_deref()
        && !authorized(&headers, token)
    {
        warn!("rejected request with missing or invalid bearer token");
        return Err(HttpError::new(
            StatusCode::UNAUTHORIZED,
            "Missing or invalid bearer token",
        ));
    }

    // Oversized or unreadable bodies keep the JSON error shape
    let body = body.map_err(|rejection| {
        warn!(status = %rejection.status(), error = %rejection.body_text(), "rejected request body");
        HttpError::new(rejection.status(), rejection.body_text())
    })?;

    let message: Value = serde_json::from_slice(&body).map_err(|e| {
        let err = TransportError::Malformed(crate::protocol::ProtocolError::DecodeError(
            e.to_string(),
        ));
        state.handler.on_error(&err);
        HttpError::new(StatusCode::BAD_REQUEST, err.to_string())
    })?;

    debug!(bytes = body.len(), "received message");

    match state.handler.on_message(message).await {
        Some(response) => Ok(Json(response).into_response()),
        None => Ok(StatusCode::ACCEPTED.into_response()),
    }
}

/// HTTP transport: one JSON request body per POST, one JSON response body back
pub struct HttpTransport {
    config: HttpConfig,
    local_addr: Option<SocketAddr>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    handler: Option<Arc<dyn MessageHandler>>,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            local_addr: None,
            shutdown: None,
            task: None,
            handler: None,
        }
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&mut self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        if self.task.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let bound = match self.config.bind_addr() {
            Ok(addr) => TcpListener::bind(addr)
                .await
                .map_err(|e| TransportError::BindFailed(format!("{addr}: {e}"))),
            Err(e) => Err(e),
        };
        let listener = match bound {
            Ok(listener) => listener,
            Err(e) => {
                handler.on_error(&e);
                return Err(e);
            }
        };

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        let state = HttpState::new(handler.clone(), self.config.auth_token.clone());
        let router = build_router(state, self.config.max_body_bytes);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_handler = handler.clone();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
                server_handler.on_error(&TransportError::ServerError(e.to_string()));
            }
        });

        info!(addr = %local_addr, "HTTP transport listening");

        self.local_addr = Some(local_addr);
        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        self.handler = Some(handler);
        Ok(())
    }

    async fn send(&self, _message: &Value) -> Result<()> {
        // Responses are written inside the request that produced them
        debug!("HTTP transport has no outbound channel, message dropped");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await
            .map_err(|e| TransportError::ServerError(e.to_string()))?;

        info!("HTTP transport closed");
        if let Some(handler) = self.handler.as_ref() {
            handler.on_close();
        }
        Ok(())
    }

    async fn closed(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
            if let Some(handler) = self.handler.as_ref() {
                handler.on_close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct StaticHandler;

    #[async_trait]
    impl MessageHandler for StaticHandler {
        async fn on_message(&self, message: Value) -> Option<Value> {
            if message.get("panic").is_some() {
                panic!("boom");
            }
            if message.get("id").is_none() {
                return None;
            }
            Some(serde_json::json!({ "ok": true }))
        }
    }

    fn router(token: Option<&str>) -> Router {
        let state = HttpState::new(Arc::new(StaticHandler), token.map(str::to_string));
        build_router(state, 1024)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_ok() {
        let response = router(None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_health_skips_auth() {
        let response = router(Some("secret"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_returns_handler_response() {
        let response = router(None).oneshot(post_json("{\"id\":1}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_notification_is_accepted() {
        let response = router(None).oneshot(post_json("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let response = router(None).oneshot(post_json("{oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"].as_str().unwrap().contains("Malformed"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_500() {
        let response = router(None)
            .oneshot(post_json("{\"panic\":true}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["message"], "boom");
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let response = router(Some("secret"))
            .oneshot(post_json("{\"id\":1}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_accepted() {
        let mut request = post_json("{\"id\":1}");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            "Bearer secret".parse().unwrap(),
        );
        let response = router(Some("secret")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let big = format!("{{\"id\":\"{}\"}}", "x".repeat(4096));
        let response = router(None).oneshot(post_json(&big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("length limit exceeded")
        );
    }

    #[tokio::test]
    async fn test_handler_panic_does_not_poison_router() {
        let app = router(None);
        let panicked = app
            .clone()
            .oneshot(post_json("{\"panic\":true}"))
            .await
            .unwrap();
        assert_eq!(panicked.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let next = app.oneshot(post_json("{\"id\":2}")).await.unwrap();
        assert_eq!(next.status(), StatusCode::OK);
    }
}
