// Tool trait and shared helpers

use crate::executor::{ExecutorError, Result, ToolOutput};
use crate::protocol::ToolDescriptor;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Internal trait for tool implementations
#[async_trait]
pub trait ToolImpl: Send + Sync {
    /// Get the tool descriptor (name, description, input shape)
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with JSON input
    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput>;
}

/// Deserialize tool arguments into a typed input struct
pub fn parse_input<T: DeserializeOwned>(tool: &str, input: serde_json::Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| ExecutorError::InvalidInput(tool.to_string(), e.to_string()))
}

/// Load tool descriptions from TOML config file
///
/// Each table whose key is a tool name may carry a `description` string that
/// replaces the built-in one. A missing file is not an error.
pub fn load_tool_descriptions(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        debug!(path = %path.display(), "tools.toml not found, using default descriptions");
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)?;
    let config: toml::Table = content.parse()?;

    let descriptions: HashMap<String, String> = config
        .iter()
        .filter_map(|(key, value)| {
            value
                .get("description")
                .and_then(|d| d.as_str())
                .map(|s| (key.clone(), s.to_string()))
        })
        .collect();

    debug!(path = %path.display(), tool_count = descriptions.len(), "loaded tool descriptions from config");
    Ok(descriptions)
}
