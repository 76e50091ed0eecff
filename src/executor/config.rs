// Executor configuration

use crate::executor::types::ExecutorKind;
use std::path::PathBuf;

/// Commands `execute` accepts when no allow-list is configured
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "ls", "pwd", "cat", "echo", "find", "grep", "mkdir", "cp", "mv", "rm", "ps", "head", "tail",
];

/// Shell executor settings
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Leading tokens `execute` accepts
    pub allowed_commands: Vec<String>,
    /// Working directory for spawned commands (default: process cwd)
    pub working_dir: Option<PathBuf>,
    /// Kill commands that run longer than this (default: no limit)
    pub timeout_secs: Option<u64>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            working_dir: None,
            timeout_secs: None,
        }
    }
}

/// Browser executor settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Chrome/Chromium binary (default: auto-detect)
    pub executable: Option<PathBuf>,
    /// Launch the browser at startup instead of on first use
    pub launch_on_start: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            launch_on_start: true,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Tool set to expose
    pub kind: ExecutorKind,
    /// Path to tools.toml description overrides
    pub tools_toml_path: PathBuf,
    pub shell: ShellConfig,
    pub browser: BrowserSettings,
}

impl ExecutorConfig {
    pub fn new(kind: ExecutorKind) -> Self {
        Self {
            kind,
            tools_toml_path: PathBuf::from("tools.toml"),
            shell: ShellConfig::default(),
            browser: BrowserSettings::default(),
        }
    }
}
