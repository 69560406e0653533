//! Process configuration.
//!
//! Everything is read from environment variables once at startup ([`ServerConfig::from_env`]),
//! optionally seeded from a `.env` file first ([`load_env_file`]).
//! Tests build configs directly through [`ServerConfig::builder`].

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::auth::CredentialDefaults;
use crate::error::ErrorContext;
use crate::tools::Upstream;
use crate::transport::http::DEFAULT_TIMEOUT_SECS;
use crate::{Error, Result};

/// Upstream environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(Error::configuration_with_context(
                format!("unknown environment '{}'", other),
                ErrorContext::new()
                    .with_field_path("JUSPAY_ENV")
                    .with_details("expected sandbox or production"),
            )),
        }
    }
}

/// Family of tools served by one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolSet {
    /// Payment processing APIs, authenticated with an API key.
    Core,
    /// Merchant dashboard APIs, authenticated with a web login token.
    Dashboard,
}

impl ToolSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolSet::Core => "core",
            ToolSet::Dashboard => "dashboard",
        }
    }

    /// `JUSPAY_MCP_TYPE=DASHBOARD` selects dashboard; anything else is core.
    pub fn from_mcp_type(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("dashboard") => ToolSet::Dashboard,
            _ => ToolSet::Core,
        }
    }

    pub fn default_environment(&self) -> Environment {
        match self {
            ToolSet::Core => Environment::Sandbox,
            ToolSet::Dashboard => Environment::Production,
        }
    }

    pub fn default_base_url(&self, environment: Environment) -> &'static str {
        match (self, environment) {
            (ToolSet::Core, Environment::Sandbox) => "https://sandbox.juspay.in",
            (ToolSet::Core, Environment::Production) => "https://api.juspay.in",
            (ToolSet::Dashboard, Environment::Sandbox) => "https://sandbox.portal.juspay.in",
            (ToolSet::Dashboard, Environment::Production) => "https://portal.juspay.in",
        }
    }

    /// Streamable HTTP route of the MCP endpoint.
    pub fn stream_path(&self) -> &'static str {
        match self {
            ToolSet::Core => "/juspay-stream",
            ToolSet::Dashboard => "/juspay-dashboard-stream",
        }
    }
}

impl fmt::Display for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(ToolSet::Core),
            "dashboard" => Ok(ToolSet::Dashboard),
            other => Err(Error::configuration_with_context(
                format!("unknown tool set '{}'", other),
                ErrorContext::new().with_details("expected core or dashboard"),
            )),
        }
    }
}

/// Immutable server configuration, shared by every call.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tool_set: ToolSet,
    pub environment: Environment,
    pub base_url: Url,
    /// Alerts service host; only the unified alerts tool needs it.
    pub alert_api_url: Option<Url>,
    pub http_timeout: Duration,
    pub include_response_schema: bool,
    pub strict_arguments: bool,
    pub ignored_tools: Vec<String>,
    pub credentials: CredentialDefaults,
}

impl ServerConfig {
    pub fn builder(tool_set: ToolSet) -> ServerConfigBuilder {
        ServerConfigBuilder::new(tool_set)
    }

    /// Base URL a tool's path is joined onto.
    pub fn base_url_for(&self, upstream: Upstream) -> Result<&Url> {
        match upstream {
            Upstream::Api => Ok(&self.base_url),
            Upstream::Alerts => self.alert_api_url.as_ref().ok_or_else(|| {
                Error::configuration_with_context(
                    "alerts host is not configured",
                    ErrorContext::new().with_field_path("ALERT_API_HOST"),
                )
            }),
        }
    }

    /// Load from the process environment. `tool_set` overrides `JUSPAY_MCP_TYPE`.
    pub fn from_env(tool_set: Option<ToolSet>) -> Result<Self> {
        let tool_set = tool_set
            .unwrap_or_else(|| ToolSet::from_mcp_type(env::var("JUSPAY_MCP_TYPE").ok().as_deref()));

        let environment = match non_empty_var("JUSPAY_ENV") {
            Some(v) => v.parse()?,
            None => tool_set.default_environment(),
        };

        let base_url_var = match environment {
            Environment::Production => "JUSPAY_PROD_BASE_URL",
            Environment::Sandbox => "JUSPAY_SANDBOX_BASE_URL",
        };

        let mut builder = ServerConfigBuilder::new(tool_set)
            .environment(environment)
            .include_response_schema(bool_var("JUSPAY_INCLUDE_RESPONSE_SCHEMA")?)
            .strict_arguments(bool_var("JUSPAY_STRICT_ARGUMENTS")?)
            .credentials(CredentialDefaults {
                api_key: non_empty_var("JUSPAY_API_KEY"),
                merchant_id: non_empty_var("JUSPAY_MERCHANT_ID"),
                web_login_token: non_empty_var("JUSPAY_WEB_LOGIN_TOKEN"),
            });

        if let Some(url) = non_empty_var(base_url_var) {
            builder = builder.base_url_var(url, base_url_var);
        }
        if let Some(url) = non_empty_var("ALERT_API_HOST") {
            builder = builder.alert_api_url(url);
        }

        if let Some(secs) = non_empty_var("JUSPAY_HTTP_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                Error::configuration_with_context(
                    "invalid HTTP timeout",
                    ErrorContext::new()
                        .with_field_path("JUSPAY_HTTP_TIMEOUT_SECS")
                        .with_details(e.to_string()),
                )
            })?;
            builder = builder.http_timeout(Duration::from_secs(secs));
        }

        if let Some(list) = non_empty_var("JUSPAY_DASHBOARD_IGNORE_TOOL") {
            for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                builder = builder.ignore_tool(name);
            }
        }

        builder.build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    tool_set: ToolSet,
    environment: Option<Environment>,
    base_url: Option<(String, &'static str)>,
    alert_api_url: Option<String>,
    http_timeout: Duration,
    include_response_schema: bool,
    strict_arguments: bool,
    ignored_tools: Vec<String>,
    credentials: CredentialDefaults,
}

impl ServerConfigBuilder {
    pub fn new(tool_set: ToolSet) -> Self {
        Self {
            tool_set,
            environment: None,
            base_url: None,
            alert_api_url: None,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            include_response_schema: false,
            strict_arguments: false,
            ignored_tools: Vec::new(),
            credentials: CredentialDefaults::default(),
        }
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Override the upstream base URL (e.g. a local stub server).
    pub fn base_url(self, url: impl Into<String>) -> Self {
        self.base_url_var(url, "base_url")
    }

    fn base_url_var(mut self, url: impl Into<String>, key: &'static str) -> Self {
        self.base_url = Some((url.into(), key));
        self
    }

    pub fn alert_api_url(mut self, url: impl Into<String>) -> Self {
        self.alert_api_url = Some(url.into());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn include_response_schema(mut self, include: bool) -> Self {
        self.include_response_schema = include;
        self
    }

    pub fn strict_arguments(mut self, strict: bool) -> Self {
        self.strict_arguments = strict;
        self
    }

    pub fn ignore_tool(mut self, name: impl Into<String>) -> Self {
        self.ignored_tools.push(name.into());
        self
    }

    pub fn credentials(mut self, credentials: CredentialDefaults) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn build(self) -> Result<ServerConfig> {
        let environment = self
            .environment
            .unwrap_or_else(|| self.tool_set.default_environment());

        let (raw, key) = self
            .base_url
            .unwrap_or_else(|| (self.tool_set.default_base_url(environment).to_string(), "base_url"));
        let base_url = parse_base_url(&raw, key)?;
        let alert_api_url = self
            .alert_api_url
            .as_deref()
            .map(|raw| parse_base_url(raw, "ALERT_API_HOST"))
            .transpose()?;

        if self.http_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "HTTP timeout must be positive",
                ErrorContext::new().with_field_path("JUSPAY_HTTP_TIMEOUT_SECS"),
            ));
        }

        Ok(ServerConfig {
            tool_set: self.tool_set,
            environment,
            base_url,
            alert_api_url,
            http_timeout: self.http_timeout,
            include_response_schema: self.include_response_schema,
            strict_arguments: self.strict_arguments,
            ignored_tools: self.ignored_tools,
            credentials: self.credentials,
        })
    }
}

/// Export `KEY=value` lines from `path` into the process environment.
///
/// Variables that are already set keep their value. A missing file is not an error;
/// the return value says whether a file was read.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(Error::configuration_with_context(
            format!("failed to load env file {}", path.display()),
            ErrorContext::new().with_details(e.to_string()),
        )),
    }
}

fn parse_base_url(raw: &str, key: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid base URL '{}'", raw),
            ErrorContext::new()
                .with_field_path(key)
                .with_details(e.to_string()),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            format!("unsupported URL scheme '{}'", url.scheme()),
            ErrorContext::new()
                .with_field_path(key)
                .with_details("expected http or https"),
        ));
    }
    Ok(url)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn bool_var(key: &str) -> Result<bool> {
    match non_empty_var(key) {
        None => Ok(false),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(Error::configuration_with_context(
                format!("invalid boolean '{}'", other),
                ErrorContext::new().with_field_path(key),
            )),
        },
    }
}
