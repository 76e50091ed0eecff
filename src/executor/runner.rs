// Main Executor implementation: the tool registry and dispatcher

use crate::executor::browser::{self, BrowserDriver, ChromiumDriver};
use crate::executor::config::ExecutorConfig;
use crate::executor::error::{ExecutorError, Result};
use crate::executor::tool::{ToolImpl, load_tool_descriptions};
use crate::executor::types::{ExecutorKind, ToolOutput};
use crate::executor::{filesystem, shell};
use crate::protocol::{CallToolResult, ToolDescriptor};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registered tool with its resolved descriptor
struct RegisteredTool {
    descriptor: ToolDescriptor,
    tool: Arc<dyn ToolImpl>,
}

/// Main executor: a fixed tool list plus the resources the tools share
pub struct Executor {
    kind: ExecutorKind,
    tools: Vec<RegisteredTool>,
    browser: Option<Arc<dyn BrowserDriver>>,
}

impl Executor {
    /// Initialize with the tool set selected by `config.kind`
    pub fn init(config: ExecutorConfig) -> Self {
        match config.kind {
            ExecutorKind::Shell => {
                let tools = shell::tools(&config.shell);
                Self::assemble(&config, tools, None)
            }
            ExecutorKind::Filesystem => Self::assemble(&config, filesystem::tools(), None),
            ExecutorKind::Browser => {
                let driver = Arc::new(ChromiumDriver::new(config.browser.clone()));
                Self::with_browser(config, driver)
            }
        }
    }

    /// Browser executor around a caller-supplied driver
    pub fn with_browser(config: ExecutorConfig, driver: Arc<dyn BrowserDriver>) -> Self {
        let tools = browser::tools(driver.clone());
        let mut executor = Self::assemble(&config, tools, Some(driver));
        executor.kind = ExecutorKind::Browser;
        executor
    }

    fn assemble(
        config: &ExecutorConfig,
        tools: Vec<Arc<dyn ToolImpl>>,
        browser: Option<Arc<dyn BrowserDriver>>,
    ) -> Self {
        debug!(kind = %config.kind, "initializing executor");

        let descriptions = load_tool_descriptions(&config.tools_toml_path).unwrap_or_else(|e| {
            warn!(path = %config.tools_toml_path.display(), error = %e, "ignoring tool descriptions file");
            Default::default()
        });

        let tools: Vec<RegisteredTool> = tools
            .into_iter()
            .map(|tool| {
                let mut descriptor = tool.descriptor();
                if let Some(description) = descriptions.get(&descriptor.name) {
                    descriptor.description = description.clone();
                }
                RegisteredTool { descriptor, tool }
            })
            .collect();

        info!(kind = %config.kind, tool_count = tools.len(), "executor initialized with tools");

        Self {
            kind: config.kind,
            tools,
            browser,
        }
    }

    pub fn kind(&self) -> ExecutorKind {
        self.kind
    }

    /// Get all tool descriptors, in declaration order
    pub fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Execute a tool by name with JSON arguments
    pub async fn execute(&self, tool_name: &str, arguments: Map<String, Value>) -> Result<ToolOutput> {
        debug!(tool_name = %tool_name, "looking up tool");

        let registered = self
            .tools
            .iter()
            .find(|t| t.descriptor.name == tool_name)
            .ok_or_else(|| ExecutorError::UnknownTool(tool_name.to_string()))?;

        if let Some(missing) = registered
            .descriptor
            .input_schema
            .required_names()
            .find(|name| arguments.get(*name).is_none_or(Value::is_null))
        {
            return Err(ExecutorError::MissingArgument(
                tool_name.to_string(),
                missing.to_string(),
            ));
        }

        info!(tool_name = %tool_name, "executing tool");
        registered.tool.run(Value::Object(arguments)).await
    }

    /// Execute a tool and fold any failure into an error envelope
    pub async fn call(&self, tool_name: &str, arguments: Map<String, Value>) -> CallToolResult {
        match self.execute(tool_name, arguments).await {
            Ok(output) => CallToolResult::success(output.content),
            Err(e) => {
                warn!(tool_name = %tool_name, error = %e, "tool call failed");
                CallToolResult::error(format!("Error: {e}"))
            }
        }
    }

    /// Bring up shared resources ahead of the first call
    pub async fn warm_up(&self) -> Result<()> {
        if let Some(driver) = &self.browser {
            driver.launch().await?;
            info!("browser initialized");
        }
        Ok(())
    }

    /// Drop shared resources; the next call re-creates them
    pub async fn reset(&self) {
        if let Some(driver) = &self.browser {
            driver.reset().await;
        }
    }

    /// Release everything the executor owns
    pub async fn shutdown(&self) {
        info!(kind = %self.kind, "executor shutting down");
        self.reset().await;
    }
}
