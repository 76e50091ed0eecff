// Shell tools: allow-listed command execution and host information

use crate::executor::config::ShellConfig;
use crate::executor::tool::{ToolImpl, parse_input};
use crate::executor::{ExecutorError, Result, ToolOutput};
use crate::protocol::{InputShape, ParamKind, ToolDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::process::Command;
use tracing::{debug, info, warn};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Command names `execute` may run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    commands: Vec<String>,
}

impl AllowList {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    /// Only the text before the first space is checked
    pub fn is_allowed(&self, command: &str) -> bool {
        let base = leading_token(command);
        self.commands.iter().any(|c| c == base)
    }
}

impl std::fmt::Display for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.commands.join(", "))
    }
}

fn leading_token(command: &str) -> &str {
    command.split(' ').next().unwrap_or_default()
}

/// Build the shell tool set
pub fn tools(config: &ShellConfig) -> Vec<Arc<dyn ToolImpl>> {
    let allow_list = Arc::new(AllowList::new(config.allowed_commands.clone()));
    vec![
        Arc::new(ExecuteTool {
            allow_list: allow_list.clone(),
            working_dir: config.working_dir.clone(),
            timeout_secs: config.timeout_secs,
        }),
        Arc::new(ListAllowedCommandsTool { allow_list }),
        Arc::new(SystemInfoTool),
        Arc::new(CwdTool {
            working_dir: config.working_dir.clone(),
        }),
    ]
}

#[derive(Debug, Deserialize)]
struct ExecuteInput {
    command: String,
}

/// `execute`: run an allow-listed command without a shell
pub struct ExecuteTool {
    allow_list: Arc<AllowList>,
    working_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[async_trait]
impl ToolImpl for ExecuteTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "execute".to_string(),
            description: "Execute a shell command from the approved list".to_string(),
            input_schema: InputShape::new().required(
                "command",
                ParamKind::String,
                "The command to execute",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let start = Instant::now();
        let ExecuteInput { command } = parse_input("execute", input)?;

        if command.is_empty() {
            return Err(ExecutorError::EmptyCommand);
        }

        if !self.allow_list.is_allowed(&command) {
            warn!(command = %command, "command rejected by allow-list");
            return Err(ExecutorError::CommandNotAllowed {
                command,
                allowed: self.allow_list.to_string(),
            });
        }

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(ExecutorError::EmptyCommand)?;

        debug!(command = %command, "executing command");

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = match self.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), cmd.output())
                .await
                .map_err(|_| ExecutorError::Timeout(secs))?,
            None => cmd.output().await,
        }
        .map_err(|e| ExecutorError::SpawnFailed(e.to_string()))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code();

        info!(
            command = %command.chars().take(100).collect::<String>(),
            duration_ms = duration_ms,
            exit_code = exit_code.unwrap_or(-1),
            output_bytes = output.stdout.len() + output.stderr.len(),
            "command executed"
        );

        if !output.status.success() {
            return Err(ExecutorError::CommandFailed {
                code: exit_code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(ToolOutput::success(String::from_utf8_lossy(&output.stdout)))
    }
}

/// `list_allowed_commands`
pub struct ListAllowedCommandsTool {
    allow_list: Arc<AllowList>,
}

#[async_trait]
impl ToolImpl for ListAllowedCommandsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "list_allowed_commands".to_string(),
            description: "List all allowed shell commands".to_string(),
            input_schema: InputShape::new(),
        }
    }

    async fn run(&self, _input: serde_json::Value) -> Result<ToolOutput> {
        Ok(ToolOutput::success(format!(
            "Allowed commands: {}",
            self.allow_list
        )))
    }
}

/// Host snapshot returned by `get_system_info`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: String,
    pub release: String,
    pub hostname: String,
    pub user_home: String,
    pub temp_dir: String,
    pub cpus: usize,
    pub memory_total: String,
    pub memory_free: String,
}

fn format_gb(bytes: u64) -> String {
    format!("{} GB", (bytes as f64 / BYTES_PER_GB).round() as u64)
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        Self {
            platform: std::env::consts::OS.to_string(),
            release: System::kernel_version().unwrap_or_default(),
            hostname: System::host_name().unwrap_or_default(),
            user_home: dirs::home_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            temp_dir: std::env::temp_dir().display().to_string(),
            cpus: sys.cpus().len(),
            memory_total: format_gb(sys.total_memory()),
            memory_free: format_gb(sys.available_memory()),
        }
    }
}

/// `get_system_info`
pub struct SystemInfoTool;

#[async_trait]
impl ToolImpl for SystemInfoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_system_info".to_string(),
            description: "Get information about the system".to_string(),
            input_schema: InputShape::new(),
        }
    }

    async fn run(&self, _input: serde_json::Value) -> Result<ToolOutput> {
        // sysinfo reads /proc synchronously
        let info = tokio::task::spawn_blocking(SystemInfo::collect)
            .await
            .map_err(|e| ExecutorError::Io(std::io::Error::other(e)))?;
        Ok(ToolOutput::success(serde_json::to_string_pretty(&info)?))
    }
}

/// `get_cwd`: the directory `execute` runs commands in
pub struct CwdTool {
    working_dir: Option<PathBuf>,
}

#[async_trait]
impl ToolImpl for CwdTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_cwd".to_string(),
            description: "Get the current working directory".to_string(),
            input_schema: InputShape::new(),
        }
    }

    async fn run(&self, _input: serde_json::Value) -> Result<ToolOutput> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(ToolOutput::success(cwd.display().to_string()))
    }
}
