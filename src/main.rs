mod config;
mod executor;
mod protocol;
mod transport;

use clap::Parser;
use config::Config;
use executor::{Executor, ExecutorKind};
use protocol::McpHandler;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::fmt;

/// MCP executor server
#[derive(Debug, Parser)]
#[command(name = "mcp-executor")]
#[command(about = "Serve shell, filesystem or browser tools over MCP")]
struct Args {
    /// Which tool set to serve
    #[arg(value_enum)]
    kind: ExecutorKind,
}

/// Tokio runtime with signal handling
#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::from_env(args.kind);

    // stdout belongs to the stream transport
    fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    config.log_warnings();

    info!(
        kind = %args.kind,
        transport = config.transport.name(),
        "Starting MCP executor..."
    );

    let launch_browser = config.executor.browser.launch_on_start;
    let executor = Arc::new(Executor::init(config.executor));
    info!(
        tools = executor.tool_descriptors().len(),
        "Executor initialized"
    );

    if args.kind == ExecutorKind::Browser && launch_browser {
        // Not fatal: the first browser tool call retries the launch
        if let Err(e) = executor.warm_up().await {
            warn!(error = %e, "Browser launch failed, will retry on first use");
        }
    }

    let handler = Arc::new(McpHandler::new(executor.clone()));
    info!(
        server = %handler.server_info().name,
        version = %handler.server_info().version,
        "Handler ready"
    );

    let mut transport = transport::from_config(&config.transport);
    if let Err(e) = transport.start(handler).await {
        error!(error = %e, "Transport failed to start");
        executor.shutdown().await;
        process::exit(1);
    }

    tokio::select! {
        _ = transport.closed() => {
            info!("Transport session ended");
        }
        // Ctrl+C
        _ = async {
            signal::ctrl_c().await.ok();
        } => {
            info!("Received shutdown signal");
        }
    }

    info!("Starting shutdown...");
    if let Err(e) = transport.close().await {
        warn!(error = %e, "Transport close failed");
    }
    executor.shutdown().await;

    info!("Goodbye!");
    // A blocked stdin read would otherwise hold the runtime open
    process::exit(0);
}
