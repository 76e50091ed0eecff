//! MCP executor CLI client
//!
//! A command-line client that talks to an executor running the HTTP transport.
//! Uses rustyline for readline-style editing and history.
//!
//! Input forms:
//!   `:tools`            list the tools the executor exposes
//!   `:health`           check `GET /health`
//!   `<tool> [json]`     call a tool, e.g. `execute {"command": "ls -la"}`

use clap::Parser;
use rustyline::Editor;
use rustyline::history::FileHistory;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Text block inside a tool result
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Tool result payload
#[derive(Debug, Deserialize)]
struct ToolResult {
    content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

/// Entry of a `tools/list` result
#[derive(Debug, Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: String,
}

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "mcp-client")]
#[command(about = "Interactive client for an MCP executor over HTTP")]
struct Args {
    /// Executor base URL
    #[arg(short, long, default_value = "http://127.0.0.1:5002")]
    target: String,

    /// Bearer token sent with every call
    #[arg(long, env = "AUTH_TOKEN")]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout: u64,

    /// History file path
    #[arg(long)]
    history_file: Option<PathBuf>,
}

/// CLI configuration
#[derive(Debug, Clone)]
struct Config {
    target: String,
    token: Option<String>,
    timeout_secs: u64,
    history_file: PathBuf,
}

impl Config {
    fn from_args(args: Args) -> Self {
        let history_file = args.history_file.unwrap_or_else(|| {
            dirs::home_dir()
                .map(|p| p.join(".mcp_client_history"))
                .unwrap_or_else(|| PathBuf::from(".mcp_client_history"))
        });

        Self {
            target: args.target.trim_end_matches('/').to_string(),
            token: args.token.filter(|t| !t.is_empty()),
            timeout_secs: args.timeout,
            history_file,
        }
    }
}

/// One REPL input line, parsed
#[derive(Debug, PartialEq)]
enum Command {
    Tools,
    Health,
    Call { name: String, arguments: Map<String, Value> },
}

fn parse_command(input: &str) -> Result<Command, String> {
    match input {
        ":tools" => return Ok(Command::Tools),
        ":health" => return Ok(Command::Health),
        _ => {}
    }
    if input.starts_with(':') {
        return Err(format!("unknown command: {input}"));
    }

    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };

    let arguments = if rest.is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(rest) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err("arguments must be a JSON object".to_string()),
            Err(e) => return Err(format!("invalid JSON arguments: {e}")),
        }
    };

    Ok(Command::Call {
        name: name.to_string(),
        arguments,
    })
}

/// Main client state
struct Client {
    http: reqwest::Client,
    config: Config,
    next_id: AtomicU64,
}

impl Client {
    fn new(config: Config) -> io::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(io::Error::other)?;

        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send one JSON-RPC request and return its `result`
    async fn rpc(&self, method: &str, params: Value) -> io::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(format!("{}/", self.config.target)).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(io::Error::other)?;
        let status = response.status();
        let text = response.text().await.map_err(io::Error::other)?;

        if !status.is_success() {
            return Err(io::Error::other(format!(
                "HTTP {status}: {}",
                error_message(&text)
            )));
        }
        let payload: Value = serde_json::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if let Some(error) = payload.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown error");
            return Err(io::Error::other(message.to_string()));
        }

        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn list_tools(&self) -> io::Result<Vec<ToolEntry>> {
        let result = self.rpc("tools/list", json!({})).await?;
        serde_json::from_value(result["tools"].clone())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> io::Result<ToolResult> {
        let result = self
            .rpc("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        serde_json::from_value(result).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn health(&self) -> io::Result<String> {
        let response = self
            .http
            .get(format!("{}/health", self.config.target))
            .send()
            .await
            .map_err(io::Error::other)?;
        let status = response.status();
        let body = response.text().await.map_err(io::Error::other)?;
        Ok(format!("{status} {body}"))
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let config = Config::from_args(args);

    // Build runtime for async network operations
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_client(config).await })
}

async fn run_client(config: Config) -> io::Result<()> {
    let client = Client::new(config.clone())?;

    let mut rl: Editor<(), FileHistory> = Editor::new().map_err(io::Error::other)?;

    if config.history_file.exists()
        && let Err(e) = rl.load_history(&config.history_file)
    {
        eprintln!("[warning] Failed to load history: {}", e);
    }

    println!("mcp-client v{}", env!("CARGO_PKG_VERSION"));
    println!("Target: {}", client.config.target);
    println!("Type `:tools`, `:health` or `<tool> {{json}}`. Ctrl+D to quit.");
    println!();

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                let command = match parse_command(input) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("[error] {}", e);
                        continue;
                    }
                };

                print!("[waiting...]");
                io::stdout().flush()?;

                let outcome = match command {
                    Command::Tools => client.list_tools().await.map(|tools| {
                        tools
                            .iter()
                            .map(|t| format!("{:<24} {}", t.name, t.description))
                            .collect::<Vec<_>>()
                            .join("\n")
                    }),
                    Command::Health => client.health().await,
                    Command::Call { name, arguments } => {
                        client.call_tool(&name, arguments).await.map(|result| {
                            let text: String = result
                                .content
                                .iter()
                                .map(|c| c.text.as_str())
                                .collect();
                            if result.is_error {
                                format!("[error] {text}")
                            } else {
                                text
                            }
                        })
                    }
                };

                print!("\r");
                match outcome {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("[error] {}", e),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("[error] Readline error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&config.history_file) {
        eprintln!("[warning] Failed to save history: {}", e);
    }

    println!("\nGoodbye!");
    Ok(())
}

/// Message from an `{"error": {"message"}}` body, or the raw body text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "request failed".to_string()
            } else {
                body.to_string()
            }
        })
}
