use crate::executor::Executor;
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::types::{
    JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, RequestId, ServerInfo, ToolCall,
    error_codes,
};
use crate::transport::MessageHandler;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Inbound message after classification
#[derive(Debug)]
enum Inbound {
    /// JSON-RPC request or notification
    Rpc(JsonRpcRequest),
    /// Bare `{name, arguments}` tool call
    Call(ToolCall),
}

fn classify(message: Value) -> Result<Inbound> {
    let Some(object) = message.as_object() else {
        return Err(ProtocolError::InvalidRequest(
            "message must be a JSON object".to_string(),
        ));
    };

    if object.contains_key("method") {
        serde_json::from_value(message)
            .map(Inbound::Rpc)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))
    } else if object.contains_key("name") {
        serde_json::from_value(message)
            .map(Inbound::Call)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))
    } else {
        Err(ProtocolError::InvalidRequest(
            "expected a JSON-RPC request or a tool call".to_string(),
        ))
    }
}

fn to_message<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(error = %e, "failed to encode response");
            None
        }
    }
}

/// MCP message handler: maps protocol methods onto an executor
pub struct McpHandler {
    executor: Arc<Executor>,
    info: ServerInfo,
}

impl McpHandler {
    pub fn new(executor: Arc<Executor>) -> Self {
        let info = ServerInfo {
            name: executor.kind().server_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        Self { executor, info }
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    /// Handle one inbound message, producing at most one response
    pub async fn handle(&self, message: Value) -> Option<Value> {
        match classify(message) {
            Ok(Inbound::Rpc(request)) => {
                let response = self.handle_rpc(request).await?;
                to_message(&response)
            }
            Ok(Inbound::Call(call)) => {
                let result = self.executor.call(&call.name, call.arguments).await;
                to_message(&result)
            }
            Err(e) => {
                warn!(error = %e, "rejecting message");
                to_message(&JsonRpcResponse::error(
                    None,
                    error_codes::INVALID_REQUEST,
                    e.to_string(),
                ))
            }
        }
    }

    async fn handle_rpc(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "handling request");

        if request.is_notification() {
            debug!(method = %request.method, "notification received");
            return None;
        }

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let response = match method.as_str() {
            "initialize" => JsonRpcResponse::result(id, self.initialize_result()),
            "ping" => JsonRpcResponse::result(id, serde_json::json!({})),
            "tools/list" => {
                let tools = self.executor.tool_descriptors();
                JsonRpcResponse::result(id, serde_json::json!({ "tools": tools }))
            }
            "tools/call" => self.call_tool(id, params).await,
            other => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };

        Some(response)
    }

    fn initialize_result(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": self.info,
        })
    }

    async fn call_tool(&self, id: Option<RequestId>, params: Option<Value>) -> JsonRpcResponse {
        let call: ToolCall = match params.map(serde_json::from_value) {
            Some(Ok(call)) => call,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid tools/call params: {e}"),
                );
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing tools/call params",
                );
            }
        };

        let result = self.executor.call(&call.name, call.arguments).await;
        match to_message(&result) {
            Some(value) => JsonRpcResponse::result(id, value),
            None => JsonRpcResponse::error(
                id,
                error_codes::INTERNAL_ERROR,
                "Failed to encode tool result",
            ),
        }
    }
}

#[async_trait]
impl MessageHandler for McpHandler {
    async fn on_message(&self, message: Value) -> Option<Value> {
        self.handle(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rpc() {
        let inbound = classify(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/list"
        }))
        .unwrap();
        assert!(matches!(inbound, Inbound::Rpc(_)));
    }

    #[test]
    fn test_classify_bare_call() {
        let inbound = classify(serde_json::json!({
            "name": "get_cwd", "arguments": {}
        }))
        .unwrap();
        match inbound {
            Inbound::Call(call) => assert_eq!(call.name, "get_cwd"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_bare_call_without_arguments() {
        let inbound = classify(serde_json::json!({ "name": "get_cwd" })).unwrap();
        match inbound {
            Inbound::Call(call) => assert!(call.arguments.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_rejects_other_shapes() {
        assert!(classify(serde_json::json!([1, 2])).is_err());
        assert!(classify(serde_json::json!({ "foo": 1 })).is_err());
        // `method` present but framing incomplete
        assert!(classify(serde_json::json!({ "method": "tools/list" })).is_err());
    }
}
