//! Streamable-HTTP transport.
//!
//! `POST /juspay-stream` (core) or `POST /juspay-dashboard-stream` (dashboard) carries one
//! JSON-RPC message per request. Request headers are forwarded to the dispatcher so that
//! per-merchant credentials can ride on each call.

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::McpServer;
use crate::auth::RequestHeaders;
use crate::error::ErrorContext;
use crate::{Error, Result};

/// Build the router for `server`'s tool set.
pub fn router(server: McpServer) -> Router {
    let stream_path = server.dispatcher().config().tool_set.stream_path();
    Router::new()
        .route(
            stream_path,
            post(handle_stream)
                .get(method_not_allowed)
                .delete(method_not_allowed),
        )
        .route("/health", get(health_check))
        .route("/health/ready", get(health_check))
        .with_state(server)
}

/// Resolve `host:port` to the first matching socket address.
///
/// Accepts IP literals (v4 or v6, bracketed or not) and host names such as `localhost`.
pub async fn resolve_bind_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    let bind_error = |details: String| {
        Error::configuration_with_context(
            format!("invalid bind address {}:{}", host, port),
            ErrorContext::new().with_details(details),
        )
    };
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| bind_error(e.to_string()))?
        .next()
        .ok_or_else(|| bind_error("host resolved to no addresses".to_string()))
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(server: McpServer, host: &str, port: u16) -> Result<()> {
    let addr = resolve_bind_addr(host, port).await?;
    let stream_path = server.dispatcher().config().tool_set.stream_path();
    let app = router(server);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        Error::configuration_with_context(
            format!("failed to bind {}", addr),
            ErrorContext::new().with_details(e.to_string()),
        )
    })?;
    tracing::info!(%addr, path = stream_path, "serving MCP over HTTP");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// Sessions and server-sent streams are not offered; only POST is served.
async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "error": "method not allowed; use POST" })),
    )
        .into_response()
}

async fn handle_stream(State(server): State<McpServer>, headers: HeaderMap, body: String) -> Response {
    let headers = forward_headers(&headers);
    match server.handle_message(&body, &headers).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Copy UTF-8 header values; anything else is dropped.
fn forward_headers(headers: &HeaderMap) -> RequestHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forward_headers_normalizes_names() {
        let mut map = HeaderMap::new();
        map.insert("x-web-logintoken", HeaderValue::from_static("tok"));
        map.insert("juspay_merchant_id", HeaderValue::from_static("M1"));
        let headers = forward_headers(&map);
        assert_eq!(headers.get("X-Web-LoginToken"), Some("tok"));
        assert_eq!(headers.get("juspay-merchant-id"), Some("M1"));
    }

    #[tokio::test]
    async fn test_resolve_bind_addr_accepts_names_and_ipv6() {
        let local = resolve_bind_addr("localhost", 8080).await.unwrap();
        assert!(local.ip().is_loopback());
        assert_eq!(local.port(), 8080);

        let v6 = resolve_bind_addr("::1", 9000).await.unwrap();
        assert!(v6.is_ipv6());
        let bracketed = resolve_bind_addr("[::1]", 9000).await.unwrap();
        assert_eq!(bracketed, v6);

        let v4 = resolve_bind_addr("0.0.0.0", 80).await.unwrap();
        assert_eq!(v4.to_string(), "0.0.0.0:80");
    }
}
