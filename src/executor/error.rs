// Error types for Executor module

use thiserror::Error;

/// Executor error types
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument '{1}' for tool '{0}'")]
    MissingArgument(String, String),

    #[error("Invalid input for tool '{0}': {1}")]
    InvalidInput(String, String),

    #[error("Command is required")]
    EmptyCommand,

    #[error("Command not allowed: {command}. Allowed commands: {allowed}")]
    CommandNotAllowed { command: String, allowed: String },

    #[error("Command execution failed: {0}")]
    SpawnFailed(String),

    #[error("Command execution failed: Command failed with exit code {code}: {stderr}")]
    CommandFailed { code: String, stderr: String },

    #[error("Command execution failed: timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to {action}: {message}")]
    Filesystem {
        action: &'static str,
        message: String,
    },

    #[error("Failed to {action}: {message}")]
    Browser {
        action: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ExecutorError {
    pub fn filesystem(action: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Filesystem {
            action,
            message: err.to_string(),
        }
    }

    pub fn browser(action: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Browser {
            action,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
