// Protocol module - tool envelopes, JSON-RPC framing and the MCP message handler

pub mod codec;
pub mod error;
pub mod handler;
pub mod types;

pub use error::ProtocolError;
pub use handler::McpHandler;
pub use types::{CallToolResult, InputShape, ParamKind, ToolDescriptor};
