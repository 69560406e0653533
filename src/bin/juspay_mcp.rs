//! juspay-mcp：Juspay MCP 服务器入口
//!
//! Usage:
//!   juspay-mcp [--mode http|stdio] [--host 0.0.0.0] [--port 8080] [--tool-set core|dashboard]
//!              [--env-file .env]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use juspay_mcp::config::{self, ToolSet};
use juspay_mcp::{mcp, telemetry, Dispatcher, HttpInvoker, McpServer, ServerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Http,
    Stdio,
}

#[derive(Parser, Debug)]
#[command(name = "juspay-mcp", version, about = "Juspay MCP server")]
struct Args {
    /// Transport to serve on.
    #[arg(long, value_enum, default_value_t = Mode::Http)]
    mode: Mode,

    /// Bind host for the HTTP transport.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port for the HTTP transport.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Tool set to expose; defaults to JUSPAY_MCP_TYPE.
    #[arg(long)]
    tool_set: Option<ToolSet>,

    /// Env file exported before configuration is read; skipped if missing.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    // Before telemetry so RUST_LOG may come from the file.
    let env_file = config::load_env_file(&args.env_file);
    telemetry::init();

    let result = match env_file {
        Ok(loaded) => {
            if loaded {
                tracing::debug!(path = %args.env_file.display(), "loaded env file");
            }
            run(args).await
        }
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        tracing::error!(error = %format!("{:#}", e), "juspay-mcp exited with an error");
        eprintln!("juspay-mcp: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ServerConfig::from_env(args.tool_set).context("loading configuration")?;
    let invoker = HttpInvoker::new().context("building HTTP client")?;
    let dispatcher = Dispatcher::new(config, Arc::new(invoker)).context("registering tools")?;
    let server = McpServer::new(Arc::new(dispatcher));

    match args.mode {
        Mode::Stdio => mcp::stdio::serve(server).await?,
        Mode::Http => mcp::http::serve(server, &args.host, args.port).await?,
    }
    Ok(())
}
