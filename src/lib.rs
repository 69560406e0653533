//! # juspay-mcp
//!
//! 将 Juspay 支付与商户后台 API 以 MCP 工具形式暴露给 AI 代理。
//!
//! Model Context Protocol server exposing Juspay payment APIs (core tool set) and
//! merchant-dashboard APIs (dashboard tool set) as agent-callable tools.
//!
//! ## Overview
//!
//! Every tool is a static descriptor: argument schema plus an endpoint template. A call
//! flows through one path regardless of transport:
//!
//! 1. look up the tool in the [`registry`]
//! 2. fold `juspay_meta_info` into the request headers and validate the arguments
//! 3. resolve credentials from headers or environment defaults ([`auth`])
//! 4. shape the upstream request ([`tools`]) and send it through an [`Invoker`]
//! 5. return a [`ToolCallResult`], never a protocol fault
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use juspay_mcp::{Dispatcher, HttpInvoker, McpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> juspay_mcp::Result<()> {
//!     let config = ServerConfig::from_env(None)?;
//!     let dispatcher = Dispatcher::new(config, Arc::new(HttpInvoker::new()?))?;
//!     juspay_mcp::mcp::stdio::serve(McpServer::new(Arc::new(dispatcher))).await
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Tool set, environment and base URL selection |
//! | [`schema`] | Field descriptors and argument validation |
//! | [`registry`] | Name to descriptor table |
//! | [`auth`] | Request headers and credential resolution |
//! | [`tools`] | Core and dashboard tool catalogs |
//! | [`transport`] | Outbound HTTP invocation |
//! | [`dispatch`] | End-to-end tool call handling |
//! | [`mcp`] | JSON-RPC front-end over stdio and HTTP |
//! | [`telemetry`] | Logging setup |

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod mcp;
pub mod registry;
pub mod schema;
pub mod telemetry;
pub mod tools;
pub mod transport;

pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};

pub use config::{Environment, ServerConfig, ToolSet};
pub use dispatch::{Dispatcher, ToolCallRequest, ToolCallResult};
pub use mcp::McpServer;
pub use transport::{HttpInvoker, Invoker};

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
