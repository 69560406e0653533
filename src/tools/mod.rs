//! Static tool catalog.
//!
//! Each [`ToolSpec`] pairs a [`ToolDescriptor`] with endpoint metadata: HTTP verb, path
//! template (`/orders/{order_id}`), static headers and an optional body mapper carrying the
//! per-endpoint request shape. The dispatcher turns validated arguments plus resolved
//! credentials into an [`OutboundRequest`] through [`ToolSpec::build_request`].

pub mod core;
pub mod dashboard;
pub mod time;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::auth::Credentials;
use crate::config::ToolSet;
use crate::schema::{FieldError, FieldLocation, ToolDescriptor, ValidatedArguments};
use crate::transport::{HttpMethod, OutboundRequest};
use crate::{Error, Result};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Mutable view of one request while it is being shaped by a [`BodyMapper`].
#[derive(Debug)]
pub struct RequestParts<'a> {
    /// Body-located arguments; the mapper reads and consumes these.
    pub args: Map<String, Value>,
    pub credentials: &'a Credentials,
    pub path_params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl<'a> RequestParts<'a> {
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.args.remove(name)
    }

    pub fn take_str(&mut self, name: &str) -> Option<String> {
        match self.args.remove(name)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Remove a required string argument. Validation has already run, so absence is a
    /// descriptor/mapper mismatch and reported as a validation error for that field.
    pub fn require_str(&mut self, name: &str) -> Result<String> {
        self.take_str(name).ok_or_else(|| {
            Error::validation(
                "missing argument",
                vec![FieldError::with_path("required field is missing", name)],
            )
        })
    }
}

/// Shapes the upstream JSON body. Returning `Value::Null` sends no body.
pub type BodyMapper = fn(&mut RequestParts<'_>) -> Result<Value>;

/// Reshapes a successful upstream payload before it is returned to the agent.
pub type ResponseMapper = fn(Value) -> Value;

/// Which host a tool's path is joined onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Upstream {
    /// The configured API base URL.
    #[default]
    Api,
    /// The alerts service (`ALERT_API_HOST`).
    Alerts,
}

/// A registered tool together with how to reach its endpoint.
#[derive(Clone)]
pub struct ToolSpec {
    pub descriptor: ToolDescriptor,
    pub method: HttpMethod,
    /// Path template relative to the base URL, with `{name}` placeholders.
    pub path: &'static str,
    pub static_headers: &'static [(&'static str, &'static str)],
    pub mapper: Option<BodyMapper>,
    pub response_mapper: Option<ResponseMapper>,
    pub upstream: Upstream,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.descriptor.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("mapped", &self.mapper.is_some())
            .field("upstream", &self.upstream)
            .finish()
    }
}

impl ToolSpec {
    pub fn new(descriptor: ToolDescriptor, method: HttpMethod, path: &'static str) -> Self {
        Self {
            descriptor,
            method,
            path,
            static_headers: &[],
            mapper: None,
            response_mapper: None,
            upstream: Upstream::Api,
        }
    }

    pub fn with_mapper(mut self, mapper: BodyMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn with_response_mapper(mut self, mapper: ResponseMapper) -> Self {
        self.response_mapper = Some(mapper);
        self
    }

    pub fn with_upstream(mut self, upstream: Upstream) -> Self {
        self.upstream = upstream;
        self
    }

    /// Apply the response mapper, if any.
    pub fn map_response(&self, payload: Value) -> Value {
        match self.response_mapper {
            Some(mapper) => mapper(payload),
            None => payload,
        }
    }

    pub fn with_static_headers(mut self, headers: &'static [(&'static str, &'static str)]) -> Self {
        self.static_headers = headers;
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Build the upstream request for one call.
    pub fn build_request(
        &self,
        base_url: &Url,
        arguments: ValidatedArguments,
        credentials: &Credentials,
        request_id: &str,
    ) -> Result<OutboundRequest> {
        let mut parts = RequestParts {
            args: Map::new(),
            credentials,
            path_params: BTreeMap::new(),
            query: Vec::new(),
            headers: Vec::new(),
        };

        for (name, value) in arguments.into_map() {
            let location = self
                .descriptor
                .field(&name)
                .map(|f| f.location.clone())
                .unwrap_or(FieldLocation::Body);
            match location {
                FieldLocation::Body => {
                    parts.args.insert(name, value);
                }
                FieldLocation::Path => {
                    parts.path_params.insert(name, render_scalar(&value));
                }
                FieldLocation::Query => parts.query.push((name, render_scalar(&value))),
                FieldLocation::Header(header) => parts.headers.push((header, render_scalar(&value))),
            }
        }

        // routing_id never reaches the body; customer ids double as routing keys
        let routing_id = parts
            .take_str("routing_id")
            .or_else(|| parts.path_params.get("customer_id").cloned())
            .or_else(|| {
                parts
                    .query
                    .iter()
                    .find(|(name, _)| name == "customer_id")
                    .map(|(_, value)| value.clone())
            })
            .or_else(|| string_arg(&parts.args, "customer_id"))
            .or_else(|| string_arg(&parts.args, "order.customer_id"));

        let body = match self.mapper {
            Some(mapper) => mapper(&mut parts)?,
            None => Value::Object(std::mem::take(&mut parts.args)),
        };

        let url = render_url(base_url, self.path, &parts.path_params)?;
        let mut request = OutboundRequest::new(self.method, url.to_string());

        for (name, value) in credentials.outbound_headers(routing_id.as_deref(), request_id) {
            request.set_header(name, value);
        }
        for (name, value) in self.static_headers {
            request.set_header(*name, *value);
        }
        for (name, value) in parts.headers {
            request.set_header(name, value);
        }
        request.query = parts.query;

        request.body = match (self.method, body) {
            (_, Value::Null) => None,
            (HttpMethod::Get, Value::Object(map)) if map.is_empty() => None,
            (_, body) => Some(body),
        };

        Ok(request)
    }
}

fn string_arg(args: &Map<String, Value>, name: &str) -> Option<String> {
    args.get(name).and_then(Value::as_str).map(str::to_string)
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Join `template` onto `base`, substituting placeholders segment by segment.
/// Substituted values are percent-encoded as single path segments.
pub fn render_url(base: &Url, template: &str, params: &BTreeMap<String, String>) -> Result<Url> {
    let mut missing = Vec::new();
    let segments: Vec<String> = template
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            PLACEHOLDER
                .replace_all(segment, |caps: &regex::Captures<'_>| {
                    let name = &caps[1];
                    match params.get(name) {
                        Some(v) => v.clone(),
                        None => {
                            missing.push(FieldError::with_path("required path parameter is missing", name));
                            String::new()
                        }
                    }
                })
                .into_owned()
        })
        .collect();

    if !missing.is_empty() {
        return Err(Error::validation("cannot build endpoint path", missing));
    }

    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::configuration_with_context(
                "base URL cannot carry a path",
                crate::error::ErrorContext::new().with_details(base.to_string()),
            )
        })?;
        path.pop_if_empty();
        path.extend(segments.iter().map(String::as_str));
    }
    Ok(url)
}

/// All tools of one tool set, in advertising order.
pub fn catalog(tool_set: ToolSet) -> Vec<ToolSpec> {
    match tool_set {
        ToolSet::Core => core::tools(),
        ToolSet::Dashboard => dashboard::tools(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Secret;
    use crate::config::Environment;
    use crate::schema::{ArgumentValidator, FieldSpec};
    use serde_json::json;
    use std::collections::HashSet;

    fn core_credentials() -> Credentials {
        Credentials {
            secret: Secret::ApiKey("key".into()),
            merchant_id: Some("M1".into()),
            environment: Environment::Sandbox,
        }
    }

    fn base() -> Url {
        Url::parse("https://sandbox.juspay.in").unwrap()
    }

    #[test]
    fn test_render_url_percent_encodes_segments() {
        let params = BTreeMap::from([("order_id".to_string(), "ord 1/2?x".to_string())]);
        let url = render_url(&base(), "/orders/{order_id}/refunds", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sandbox.juspay.in/orders/ord%201%2F2%3Fx/refunds"
        );
    }

    #[test]
    fn test_render_url_keeps_base_path() {
        let base = Url::parse("http://127.0.0.1:1234/proxy/").unwrap();
        let url = render_url(&base, "/cards", &BTreeMap::new()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1234/proxy/cards");
    }

    #[test]
    fn test_render_url_missing_param() {
        let err = render_url(&base(), "/orders/{order_id}", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("order_id"));
    }

    #[test]
    fn test_build_request_places_arguments() {
        let spec = ToolSpec::new(
            ToolDescriptor::new("t", "test").with_fields(vec![
                FieldSpec::string("order_id").required().in_path(),
                FieldSpec::string("expand").in_query(),
                FieldSpec::string("tenant_id").in_header("x-tenant-id"),
                FieldSpec::integer("amount"),
                FieldSpec::string("routing_id"),
            ]),
            HttpMethod::Post,
            "/orders/{order_id}",
        )
        .with_static_headers(&[("x-token-type", "Euler")]);

        let args = ArgumentValidator::lenient()
            .validate(
                &spec.descriptor.fields,
                &json!({"order_id": "A1", "expand": "all", "tenant_id": "T", "amount": 5, "routing_id": "R"}),
            )
            .unwrap();
        let req = spec
            .build_request(&base(), args, &core_credentials(), "mcp-tool-1")
            .unwrap();

        assert_eq!(req.url, "https://sandbox.juspay.in/orders/A1");
        assert_eq!(req.query, vec![("expand".to_string(), "all".to_string())]);
        assert_eq!(req.header_value("x-tenant-id"), Some("T"));
        assert_eq!(req.header_value("x-token-type"), Some("Euler"));
        assert_eq!(req.header_value("x-routing-id"), Some("R"));
        assert_eq!(req.body, Some(json!({"amount": 5})));
    }

    #[test]
    fn test_get_without_body_args_sends_no_body() {
        let spec = ToolSpec::new(
            ToolDescriptor::new("t", "test")
                .with_fields(vec![FieldSpec::string("customer_id").required().in_path()]),
            HttpMethod::Get,
            "/customers/{customer_id}",
        );
        let args = ArgumentValidator::lenient()
            .validate(&spec.descriptor.fields, &json!({"customer_id": "cust_9"}))
            .unwrap();
        let req = spec
            .build_request(&base(), args, &core_credentials(), "id")
            .unwrap();
        assert!(req.body.is_none());
        assert_eq!(req.header_value("x-routing-id"), Some("cust_9"));
    }

    #[test]
    fn test_catalog_names_are_unique_and_paths_resolve() {
        for tool_set in [ToolSet::Core, ToolSet::Dashboard] {
            let tools = catalog(tool_set);
            assert!(!tools.is_empty());
            let names: HashSet<_> = tools.iter().map(|t| t.name().to_string()).collect();
            assert_eq!(names.len(), tools.len(), "duplicate tool in {tool_set}");

            for tool in &tools {
                for caps in PLACEHOLDER.captures_iter(tool.path) {
                    let name = &caps[1];
                    // placeholders are either path arguments or filled in by the mapper
                    let declared = tool
                        .descriptor
                        .field(name)
                        .map(|f| f.location == FieldLocation::Path)
                        .unwrap_or(false);
                    assert!(
                        declared || tool.mapper.is_some(),
                        "{} has unbound placeholder {}",
                        tool.name(),
                        name
                    );
                }
            }
        }
    }
}
