use async_trait::async_trait;
use serde_json::Value;
use std::env;
use std::time::{Duration, Instant};

use crate::transport::{HttpMethod, Invoker, OutboundRequest, RawResponse, TransportError};
use crate::{Error, Result};

/// Upper bound on the upstream error body carried inside [`Error::Api`].
pub const MAX_ERROR_BODY_CHARS: usize = 4096;

/// Default per-request timeout when neither config nor env sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pooled `reqwest` client shared by every tool call of the process.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    pub fn new() -> Result<Self> {
        // Pool knobs are env-overridable; the per-request timeout comes from the caller.
        let builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env::var("JUSPAY_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("JUSPAY_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )))
            .user_agent(concat!("juspay-mcp/", env!("CARGO_PKG_VERSION")));

        let client = builder
            .build()
            .map_err(|e| Error::Network(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap an existing client (tests, custom TLS setups).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn map_send_error(err: reqwest::Error, url: &str, started: Instant) -> Error {
        if err.is_timeout() {
            Error::Network(TransportError::Timeout {
                url: url.to_string(),
                elapsed_ms: started.elapsed().as_millis(),
            })
        } else {
            Error::Network(TransportError::Http(err))
        }
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(&self, request: OutboundRequest, timeout: Duration) -> Result<RawResponse> {
        let OutboundRequest {
            method,
            url,
            headers,
            query,
            body,
        } = request;

        let mut req = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        }
        .timeout(timeout);

        for (name, value) in &headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !query.is_empty() {
            req = req.query(&query);
        }
        if let Some(body) = &body {
            req = req.json(body);
        }

        let started = Instant::now();
        tracing::debug!(method = %method, url = %url, "calling upstream");

        let response = req
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, &url, started))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Self::map_send_error(e, &url, started))?;

        tracing::info!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upstream responded"
        );

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            payload: parse_payload(&text),
        })
    }
}

/// Empty body is `null`; non-JSON text is kept as a JSON string.
fn parse_payload(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
