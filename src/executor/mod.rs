// Executor module - tool registry, dispatcher and the three tool sets

pub mod browser;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod runner;
pub mod shell;
pub mod tool;
pub mod types;

pub use config::ExecutorConfig;
pub use error::{ExecutorError, Result};
pub use runner::Executor;
pub use types::{ExecutorKind, ToolOutput};
