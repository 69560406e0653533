use crate::schema::FieldError;
use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Argument or configuration key that caused the error (e.g. "order.amount", "JUSPAY_ENV")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g. expected type, allowed values)
    pub details: Option<String>,
    /// Source of the error (e.g. "argument_validator", "credential_resolver")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type for the MCP server.
///
/// Every variant is caught at the dispatcher boundary and converted into a
/// [`crate::dispatch::ToolCallResult`]; none of them reach the protocol layer as a fault.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {message}{}", format_field_errors(.errors))]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Authentication error: {message}{}", format_context(.context))]
    AuthResolution {
        message: String,
        context: ErrorContext,
    },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Juspay API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(" [{}]", rendered.join("; "))
}

/// Serialisable failure taxonomy reported back to the calling agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    AuthResolutionError,
    NetworkError,
    ApiError,
    UnknownToolError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::AuthResolutionError => "AuthResolutionError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::ApiError => "ApiError",
            ErrorKind::UnknownToolError => "UnknownToolError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a validation error from a list of field failures.
    pub fn validation(msg: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Error::Validation {
            message: msg.into(),
            errors,
        }
    }

    /// Create a credential resolution error with structured context
    pub fn auth_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::AuthResolution {
            message: msg.into(),
            context,
        }
    }

    /// Create a configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Map this error onto the taxonomy surfaced in tool results.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::ValidationError,
            Error::AuthResolution { .. } => ErrorKind::AuthResolutionError,
            Error::Network(_) => ErrorKind::NetworkError,
            Error::Api { .. } => ErrorKind::ApiError,
            Error::UnknownTool(_) => ErrorKind::UnknownToolError,
            Error::DuplicateTool(_)
            | Error::Configuration { .. }
            | Error::Serialization(_)
            | Error::Io(_) => ErrorKind::InternalError,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::AuthResolution { context, .. } | Error::Configuration { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::UnknownTool("x".into()).kind(),
            ErrorKind::UnknownToolError
        );
        assert_eq!(
            Error::Api {
                status: 400,
                body: "{}".into()
            }
            .kind(),
            ErrorKind::ApiError
        );
        assert_eq!(
            Error::DuplicateTool("x".into()).kind(),
            ErrorKind::InternalError
        );
    }

    #[test]
    fn test_context_is_rendered() {
        let err = Error::auth_with_context(
            "no API key available",
            ErrorContext::new()
                .with_field_path("JUSPAY_API_KEY")
                .with_source("credential_resolver"),
        );
        let text = err.to_string();
        assert!(text.contains("field: JUSPAY_API_KEY"));
        assert!(text.contains("source: credential_resolver"));
    }

    #[test]
    fn test_validation_lists_fields() {
        let err = Error::validation(
            "invalid arguments for order_status_api_juspay",
            vec![FieldError::with_path("required field is missing", "order_id")],
        );
        assert!(err.to_string().contains("order_id: required field is missing"));
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
