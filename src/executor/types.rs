// Data types for Executor module

/// Output from a successful tool execution
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// The text content produced by the tool
    pub content: String,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Which tool set a process exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutorKind {
    /// Allow-listed subprocess execution and host information
    Shell,
    /// File and directory operations
    Filesystem,
    /// Headless browser automation
    Browser,
}

impl ExecutorKind {
    /// Server name announced to clients
    pub fn server_name(&self) -> &'static str {
        match self {
            ExecutorKind::Shell => "mcp-shell-executor",
            ExecutorKind::Filesystem => "mcp-filesystem-executor",
            ExecutorKind::Browser => "mcp-browser-executor",
        }
    }

    /// HTTP port used when none is configured
    pub fn default_port(&self) -> u16 {
        match self {
            ExecutorKind::Shell => 5002,
            ExecutorKind::Filesystem => 5003,
            ExecutorKind::Browser => 5004,
        }
    }
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutorKind::Shell => "shell",
            ExecutorKind::Filesystem => "filesystem",
            ExecutorKind::Browser => "browser",
        };
        f.write_str(name)
    }
}
