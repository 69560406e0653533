//! MCP 协议前端：JSON-RPC 2.0 消息处理
//!
//! Model Context Protocol front-end. [`McpServer`] turns JSON-RPC 2.0 messages into
//! dispatcher calls and renders the results in MCP wire format. The transports in
//! [`stdio`] and [`http`] only move raw messages and request headers in and out.
//!
//! Supported methods: `initialize`, `ping`, `tools/list` and `tools/call`. Notifications
//! (no `id`, or a `notifications/*` method) are accepted and never answered.

pub mod http;
pub mod stdio;

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::RequestHeaders;
use crate::dispatch::{Dispatcher, ToolCallRequest, ToolCallResult};
use crate::error::ErrorKind;

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "juspay-mcp";

/// JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || self.method.starts_with("notifications/")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// A tool as advertised in a `tools/list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// Result of a `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    pub content: Vec<McpContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

/// Content block within a tool result. Only `text` blocks are produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl McpContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: Some(text.into()),
        }
    }
}

impl From<ToolCallResult> for McpToolResult {
    fn from(result: ToolCallResult) -> Self {
        let (text, is_error) = if result.success {
            let payload = result.payload.unwrap_or(Value::Null);
            let text = match payload {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (text, false)
        } else {
            let error = result
                .error
                .map(|e| json!({ "error": { "kind": e.kind, "message": e.message } }))
                .unwrap_or_else(|| json!({ "error": { "kind": ErrorKind::InternalError, "message": "unknown failure" } }));
            (error.to_string(), true)
        };
        Self {
            content: vec![McpContent::text(text)],
            is_error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Transport-independent MCP message handler.
#[derive(Debug, Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one raw JSON-RPC message (single or batch).
    ///
    /// Returns `None` when nothing should be written back, i.e. the message held only
    /// notifications.
    pub async fn handle_message(&self, raw: &str, headers: &RequestHeaders) -> Option<Value> {
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable JSON-RPC message");
                let resp = JsonRpcResponse::failure(Value::Null, codes::PARSE_ERROR, format!("parse error: {}", e));
                return serde_json::to_value(resp).ok();
            }
        };

        match parsed {
            Value::Array(items) if items.is_empty() => serde_json::to_value(JsonRpcResponse::failure(
                Value::Null,
                codes::INVALID_REQUEST,
                "empty batch",
            ))
            .ok(),
            Value::Array(items) => {
                let responses: Vec<Value> = join_all(items.into_iter().map(|item| self.handle_value(item, headers)))
                    .await
                    .into_iter()
                    .flatten()
                    .filter_map(|r| serde_json::to_value(r).ok())
                    .collect();
                if responses.is_empty() {
                    None
                } else {
                    Some(Value::Array(responses))
                }
            }
            single => self
                .handle_value(single, headers)
                .await
                .and_then(|r| serde_json::to_value(r).ok()),
        }
    }

    async fn handle_value(&self, value: Value, headers: &RequestHeaders) -> Option<JsonRpcResponse> {
        let id_hint = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request, headers).await,
            Err(e) => Some(JsonRpcResponse::failure(
                id_hint,
                codes::INVALID_REQUEST,
                format!("invalid request: {}", e),
            )),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest, headers: &RequestHeaders) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.list_tools() })),
            "tools/call" => {
                let params = request.params.unwrap_or(Value::Null);
                match serde_json::from_value::<CallParams>(params) {
                    Ok(params) => {
                        let call = ToolCallRequest::new(
                            params.name,
                            params.arguments.unwrap_or_else(|| json!({})),
                        );
                        let result = McpToolResult::from(self.dispatcher.dispatch(call, headers).await);
                        match serde_json::to_value(result) {
                            Ok(v) => JsonRpcResponse::success(id, v),
                            Err(e) => JsonRpcResponse::failure(id, codes::INVALID_PARAMS, e.to_string()),
                        }
                    }
                    Err(e) => JsonRpcResponse::failure(
                        id,
                        codes::INVALID_PARAMS,
                        format!("tools/call requires a tool name: {}", e),
                    ),
                }
            }
            other => JsonRpcResponse::failure(id, codes::METHOD_NOT_FOUND, format!("method not found: {}", other)),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    /// Advertised tools, in registration order.
    pub fn list_tools(&self) -> Vec<McpTool> {
        let include = self.dispatcher.config().include_response_schema;
        self.dispatcher
            .registry()
            .list()
            .into_iter()
            .map(|d| McpTool {
                name: d.name.clone(),
                description: Some(d.advertised_description(include)),
                input_schema: Some(d.input_schema()),
            })
            .collect()
    }
}
