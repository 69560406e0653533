//! Tool dispatcher.
//!
//! `dispatch` is the single entry point used by every front-end. It never returns an
//! `Err`: lookup, validation, credential, transport and upstream failures all come back
//! as a [`ToolCallResult`] with `success = false`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use crate::auth::{self, RequestHeaders};
use crate::config::ServerConfig;
use crate::error::ErrorKind;
use crate::registry::ToolRegistry;
use crate::schema::ArgumentValidator;
use crate::tools::{self, ToolSpec};
use crate::transport::Invoker;
use crate::{Error, Result};

/// One tool invocation as received from the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Failure half of a [`ToolCallResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolCallError>,
}

impl ToolCallResult {
    pub fn ok(payload: Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failed(err: &Error) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(ToolCallError {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Name → {descriptor, endpoint} table plus the invoker used to reach the upstream API.
///
/// Built once at startup and shared behind an `Arc`; it holds no per-call state.
pub struct Dispatcher {
    registry: ToolRegistry,
    specs: HashMap<String, ToolSpec>,
    invoker: Arc<dyn Invoker>,
    config: ServerConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tool_set", &self.config.tool_set)
            .field("tools", &self.registry.len())
            .finish()
    }
}

impl Dispatcher {
    /// Register the configured tool set's catalog.
    pub fn new(config: ServerConfig, invoker: Arc<dyn Invoker>) -> Result<Self> {
        let specs = tools::catalog(config.tool_set);
        Self::with_specs(config, specs, invoker)
    }

    /// Register an explicit list of tool specs.
    pub fn with_specs(
        config: ServerConfig,
        specs: Vec<ToolSpec>,
        invoker: Arc<dyn Invoker>,
    ) -> Result<Self> {
        let mut registry = ToolRegistry::new()
            .with_validator(ArgumentValidator::new(config.strict_arguments))
            .with_ignored(config.ignored_tools.iter().cloned());

        let mut table = HashMap::with_capacity(specs.len());
        for spec in specs {
            registry.register(spec.descriptor.clone())?;
            table.insert(spec.descriptor.name.clone(), spec);
        }

        tracing::info!(
            tool_set = %config.tool_set,
            environment = %config.environment,
            base_url = %config.base_url,
            tools = registry.len(),
            strict = config.strict_arguments,
            "tool registry ready"
        );

        Ok(Self {
            registry,
            specs: table,
            invoker,
            config,
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run one tool call to completion. Each call is independent of every other.
    pub async fn dispatch(&self, request: ToolCallRequest, headers: &RequestHeaders) -> ToolCallResult {
        let request_id = auth::new_request_id();
        let span = tracing::info_span!(
            "tool_call",
            tool = %request.name,
            request_id = %request_id,
        );

        async move {
            let started = Instant::now();
            let name = request.name.clone();
            match self.try_dispatch(request, headers, &request_id).await {
                Ok(payload) => {
                    tracing::info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "tool call succeeded"
                    );
                    ToolCallResult::ok(payload)
                }
                Err(err) => {
                    tracing::warn!(
                        tool = %name,
                        kind = %err.kind(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %err,
                        "tool call failed"
                    );
                    ToolCallResult::failed(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_dispatch(
        &self,
        request: ToolCallRequest,
        headers: &RequestHeaders,
        request_id: &str,
    ) -> Result<Value> {
        let ToolCallRequest {
            name,
            mut arguments,
        } = request;

        let spec = self
            .registry
            .get(&name)
            .and_then(|_| self.specs.get(&name))
            .ok_or_else(|| Error::UnknownTool(name.clone()))?;

        let mut headers = headers.clone();
        auth::fold_meta_info(&mut arguments, &mut headers);

        let validated = self.registry.validate(&name, &arguments)?;
        let credentials = auth::resolve(
            &headers,
            &self.config.credentials,
            self.config.tool_set,
            self.config.environment,
        )?;
        tracing::debug!(credentials = ?credentials, "credentials resolved");

        let base_url = self.config.base_url_for(spec.upstream)?;
        let outbound = spec.build_request(base_url, validated, &credentials, request_id)?;
        let response = self.invoker.invoke(outbound, self.config.http_timeout).await?;
        Ok(spec.map_response(response.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialDefaults;
    use crate::config::ToolSet;
    use crate::schema::{FieldSpec, ToolDescriptor};
    use crate::transport::{HttpMethod, OutboundRequest, RawResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every request and answers with a fixed payload.
    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<OutboundRequest>>,
    }

    #[async_trait]
    impl Invoker for RecordingInvoker {
        async fn invoke(&self, request: OutboundRequest, _timeout: Duration) -> Result<RawResponse> {
            self.calls.lock().unwrap().push(request);
            Ok(RawResponse {
                status: 200,
                payload: json!({"status": "NEW"}),
            })
        }
    }

    fn config() -> ServerConfig {
        ServerConfig::builder(ToolSet::Core)
            .credentials(CredentialDefaults {
                api_key: Some("key".into()),
                merchant_id: Some("M1".into()),
                web_login_token: None,
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_and_request_shape() {
        let invoker = Arc::new(RecordingInvoker::default());
        let dispatcher = Dispatcher::new(config(), invoker.clone()).unwrap();

        let result = dispatcher
            .dispatch(
                ToolCallRequest::new("order_status_api_juspay", json!({"order_id": "ORD123"})),
                &RequestHeaders::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.payload, Some(json!({"status": "NEW"})));
        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, HttpMethod::Get);
        assert!(calls[0].url.ends_with("/orders/ORD123"));
        assert!(calls[0]
            .header_value("x-request-id")
            .unwrap()
            .starts_with("mcp-tool-"));
    }

    #[tokio::test]
    async fn test_failures_never_reach_the_invoker() {
        let invoker = Arc::new(RecordingInvoker::default());
        let dispatcher = Dispatcher::new(config(), invoker.clone()).unwrap();

        let unknown = dispatcher
            .dispatch(ToolCallRequest::new("refund_everything", json!({})), &RequestHeaders::new())
            .await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::UnknownToolError));

        let invalid = dispatcher
            .dispatch(ToolCallRequest::new("order_status_api_juspay", json!({})), &RequestHeaders::new())
            .await;
        assert_eq!(invalid.error_kind(), Some(ErrorKind::ValidationError));
        assert!(invalid.error.unwrap().message.contains("order_id"));

        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let invoker = Arc::new(RecordingInvoker::default());
        let config = ServerConfig::builder(ToolSet::Core).build().unwrap();
        let dispatcher = Dispatcher::new(config, invoker.clone()).unwrap();

        let result = dispatcher
            .dispatch(
                ToolCallRequest::new("order_status_api_juspay", json!({"order_id": "A"})),
                &RequestHeaders::new(),
            )
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::AuthResolutionError));
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_meta_info_is_folded_and_stripped() {
        let invoker = Arc::new(RecordingInvoker::default());
        let config = ServerConfig::builder(ToolSet::Core)
            .strict_arguments(true)
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(config, invoker.clone()).unwrap();

        let result = dispatcher
            .dispatch(
                ToolCallRequest::new(
                    "create_refund_juspay",
                    json!({
                        "order_id": "A",
                        "unique_request_id": "r1",
                        "amount": "1.00",
                        "juspay_meta_info": {"juspay_api_key": "meta", "juspay_merchant_id": "M7"}
                    }),
                ),
                &RequestHeaders::new(),
            )
            .await;
        assert!(result.success, "{:?}", result.error);

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls[0].header_value("x-merchantid"), Some("M7"));
        assert!(calls[0].body.as_ref().unwrap().get("juspay_meta_info").is_none());
    }

    fn dashboard_config() -> crate::config::ServerConfigBuilder {
        ServerConfig::builder(ToolSet::Dashboard).credentials(CredentialDefaults {
            web_login_token: Some("tok".into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_alerts_need_their_own_host() {
        let invoker = Arc::new(RecordingInvoker::default());
        let dispatcher = Dispatcher::new(dashboard_config().build().unwrap(), invoker.clone()).unwrap();
        let call = || ToolCallRequest::new("juspay_list_unified_alerts", json!({"merchantId": "m1"}));

        let result = dispatcher.dispatch(call(), &RequestHeaders::new()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::InternalError));
        assert!(result.error.unwrap().message.contains("ALERT_API_HOST"));
        assert!(invoker.calls.lock().unwrap().is_empty());

        let config = dashboard_config()
            .alert_api_url("https://alerts.example.com")
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(config, invoker.clone()).unwrap();
        let result = dispatcher.dispatch(call(), &RequestHeaders::new()).await;
        assert!(result.success, "{:?}", result.error);
        // single-object replies come back as one row
        assert_eq!(result.payload, Some(json!([{"status": "NEW"}])));

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls[0].url, "https://alerts.example.com/getExternalAlerts");
        assert_eq!(calls[0].header_value("token"), Some("tok"));
    }

    #[tokio::test]
    async fn test_ignored_tool_is_unknown() {
        let invoker = Arc::new(RecordingInvoker::default());
        let config = ServerConfig::builder(ToolSet::Core)
            .ignore_tool("order_status_api_juspay")
            .credentials(CredentialDefaults {
                api_key: Some("key".into()),
                ..Default::default()
            })
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(config, invoker).unwrap();
        assert!(!dispatcher.registry().contains("order_status_api_juspay"));

        let result = dispatcher
            .dispatch(
                ToolCallRequest::new("order_status_api_juspay", json!({"order_id": "A"})),
                &RequestHeaders::new(),
            )
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::UnknownToolError));
    }

    #[test]
    fn test_duplicate_specs_rejected() {
        let spec = ToolSpec::new(
            ToolDescriptor::new("dup", "d").with_fields(vec![FieldSpec::string("a")]),
            HttpMethod::Get,
            "/x",
        );
        let err = Dispatcher::with_specs(
            config(),
            vec![spec.clone(), spec],
            Arc::new(RecordingInvoker::default()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(_)));
    }

    #[test]
    fn test_result_serialization() {
        let ok = serde_json::to_value(ToolCallResult::ok(json!({"a": 1}))).unwrap();
        assert_eq!(ok, json!({"success": true, "payload": {"a": 1}}));

        let failed = serde_json::to_value(ToolCallResult::failed(&Error::UnknownTool("x".into()))).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"]["kind"], "UnknownToolError");
    }
}
