//! 凭证上下文：每次调用独立解析，不共享可变状态
//!
//! Per-call credential resolution.
//!
//! Credentials come from (highest precedence first):
//! 1. Explicit per-call headers (`JUSPAY_API_KEY`, `JUSPAY_MERCHANT_ID`,
//!    `JUSPAY_WEB_LOGIN_TOKEN`), including those folded in from a `juspay_meta_info`
//!    argument object.
//! 2. Process-wide defaults loaded from the environment at startup.
//!
//! The resolved [`Credentials`] value travels by reference through one dispatch and is
//! dropped with it.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::config::{Environment, ToolSet};
use crate::error::ErrorContext;
use crate::{Error, Result};

pub const API_KEY_HEADER: &str = "JUSPAY_API_KEY";
pub const MERCHANT_ID_HEADER: &str = "JUSPAY_MERCHANT_ID";
pub const WEB_LOGIN_TOKEN_HEADER: &str = "JUSPAY_WEB_LOGIN_TOKEN";

/// Argument carrying inline credentials.
pub const META_INFO_ARGUMENT: &str = "juspay_meta_info";

const DEFAULT_SOURCE_ID: &str = "juspay-mcp";

/// Inbound headers of one call, keyed case-insensitively with `_` and `-` treated alike.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    values: BTreeMap<String, String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercase, `_` → `-`, and aliases folded onto one key.
    fn normalize(name: &str) -> String {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        match name.as_str() {
            "x-web-logintoken" => "juspay-web-login-token".to_string(),
            _ => name,
        }
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(Self::normalize(name), value.into());
    }

    /// Insert only if no non-blank value is present for `name`.
    pub fn insert_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if self.get(name).is_none() {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&Self::normalize(name))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = RequestHeaders::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

// Header values may be secrets; only names are printed.
impl fmt::Debug for RequestHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Process-wide credential defaults (from the environment).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialDefaults {
    pub api_key: Option<String>,
    pub merchant_id: Option<String>,
    pub web_login_token: Option<String>,
}

impl fmt::Debug for CredentialDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDefaults")
            .field("api_key", &redact(&self.api_key))
            .field("merchant_id", &self.merchant_id)
            .field("web_login_token", &redact(&self.web_login_token))
            .finish()
    }
}

/// The secret that authenticates one call.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    /// Core API key, sent as HTTP Basic auth.
    ApiKey(String),
    /// Dashboard web login token.
    WebLoginToken(String),
}

/// Resolved credentials for a single call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub secret: Secret,
    pub merchant_id: Option<String>,
    pub environment: Environment,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.secret {
            Secret::ApiKey(_) => "api_key",
            Secret::WebLoginToken(_) => "web_login_token",
        };
        f.debug_struct("Credentials")
            .field("secret", &format_args!("{}(<redacted>)", kind))
            .field("merchant_id", &self.merchant_id)
            .field("environment", &self.environment)
            .finish()
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

/// Resolve credentials for one call. Headers win over defaults, field by field.
pub fn resolve(
    headers: &RequestHeaders,
    defaults: &CredentialDefaults,
    tool_set: ToolSet,
    environment: Environment,
) -> Result<Credentials> {
    let merchant_id = headers
        .get(MERCHANT_ID_HEADER)
        .map(str::to_string)
        .or_else(|| defaults.merchant_id.clone());

    let secret = match tool_set {
        ToolSet::Core => headers
            .get(API_KEY_HEADER)
            .map(str::to_string)
            .or_else(|| defaults.api_key.clone())
            .map(Secret::ApiKey)
            .ok_or_else(|| missing(API_KEY_HEADER))?,
        ToolSet::Dashboard => headers
            .get(WEB_LOGIN_TOKEN_HEADER)
            .map(str::to_string)
            .or_else(|| defaults.web_login_token.clone())
            .map(Secret::WebLoginToken)
            .ok_or_else(|| missing(WEB_LOGIN_TOKEN_HEADER))?,
    };

    Ok(Credentials {
        secret,
        merchant_id,
        environment,
    })
}

fn missing(header: &str) -> Error {
    Error::auth_with_context(
        format!("no {} supplied in request headers or environment", header),
        ErrorContext::new()
            .with_field_path(header)
            .with_source("credential_resolver"),
    )
}

/// Move a `juspay_meta_info` object out of `arguments` into `headers`.
///
/// Explicit transport headers take precedence over meta-info values.
pub fn fold_meta_info(arguments: &mut Value, headers: &mut RequestHeaders) {
    let Some(map) = arguments.as_object_mut() else {
        return;
    };
    let Some(Value::Object(meta)) = map.remove(META_INFO_ARGUMENT) else {
        return;
    };

    for (key, value) in meta {
        let Some(value) = value.as_str().filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let header = match key.as_str() {
            "juspay_api_key" => API_KEY_HEADER,
            "juspay_merchant_id" => MERCHANT_ID_HEADER,
            "x-web-logintoken" | "juspay_web_login_token" => WEB_LOGIN_TOKEN_HEADER,
            _ => continue,
        };
        headers.insert_if_absent(header, value);
    }
}

/// Correlation id sent as `x-request-id`.
pub fn new_request_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("mcp-tool-{}", &id[..12])
}

impl Credentials {
    pub fn api_key(&self) -> Option<&str> {
        match &self.secret {
            Secret::ApiKey(key) => Some(key),
            Secret::WebLoginToken(_) => None,
        }
    }

    pub fn web_login_token(&self) -> Option<&str> {
        match &self.secret {
            Secret::WebLoginToken(token) => Some(token),
            Secret::ApiKey(_) => None,
        }
    }

    /// Authentication and correlation headers for the upstream request.
    ///
    /// `routing_id` only applies to core calls; it falls back to the merchant id.
    pub fn outbound_headers(
        &self,
        routing_id: Option<&str>,
        request_id: &str,
    ) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        match &self.secret {
            Secret::ApiKey(key) => {
                let encoded = STANDARD.encode(format!("{}:", key));
                headers.push(("Authorization".to_string(), format!("Basic {}", encoded)));
                if let Some(merchant_id) = &self.merchant_id {
                    headers.push(("x-merchantid".to_string(), merchant_id.clone()));
                }
                if let Some(routing) = routing_id.or(self.merchant_id.as_deref()) {
                    headers.push(("x-routing-id".to_string(), routing.to_string()));
                }
                headers.push(("Accept".to_string(), "application/json".to_string()));
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
            Secret::WebLoginToken(token) => {
                headers.push(("x-web-logintoken".to_string(), token.clone()));
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                headers.push(("accept".to_string(), "*/*".to_string()));
                headers.push(("x-source-id".to_string(), DEFAULT_SOURCE_ID.to_string()));
            }
        }
        headers.push(("x-request-id".to_string(), request_id.to_string()));
        headers
    }
}
