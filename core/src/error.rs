use serde::Serialize;
use thiserror::Error;

/// Every failure the adapter can produce, before it is wrapped for the tool layer.
///
/// The `Display` text of each variant is part of the external contract: MCP
/// hosts and older integrations match on substrings such as
/// "Invalid IP address format", "(404)", "timeout" or "Unable to connect".
/// Internal code should branch on the variant (or [`GuardianError::code`])
/// and leave the text alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardianError {
    /// Client construction was rejected (missing API key, malformed base URL)
    #[error("{0}")]
    Config(String),
    /// Pre-flight validation failure. Never reaches the network.
    #[error("{0}")]
    InvalidInput(String),
    /// 2xx response whose payload lacks the `result` wrapper or does not match it
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    /// Non-2xx response with an extractable code and message
    #[error("Guardian Intel API Error ({code}): {message}")]
    Upstream { code: String, message: String },
    #[error("Guardian Intel API request timeout")]
    Timeout,
    /// DNS failure or connection refused
    #[error("Unable to connect to Guardian Intel API")]
    Connection,
    /// Any other transport failure, carrying the raw error text
    #[error("Guardian Intel API Error: {0}")]
    Transport(String),
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),
}

impl GuardianError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        GuardianError::InvalidInput(message.into())
    }

    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        GuardianError::Upstream {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable error code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            GuardianError::Config(_) => codes::CONFIGURATION_ERROR,
            GuardianError::InvalidInput(_) => codes::INVALID_INPUT,
            GuardianError::InvalidResponse(_) => codes::INVALID_RESPONSE,
            GuardianError::Upstream { .. } => codes::UPSTREAM_ERROR,
            GuardianError::Timeout => codes::TIMEOUT,
            GuardianError::Connection => codes::CONNECTION_FAILURE,
            GuardianError::Transport(_) => codes::TRANSPORT_ERROR,
            GuardianError::UnknownOperation(_) => codes::UNKNOWN_OPERATION,
        }
    }

    /// Upstream status/code, when the failure came back from the API
    pub fn upstream_code(&self) -> Option<&str> {
        match self {
            GuardianError::Upstream { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A handler failure as surfaced through the tool dispatcher.
///
/// Wrapping is unconditional: validation, upstream and internal failures all
/// come out as `Tool execution failed: <inner message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Tool execution failed: {message}")]
pub struct ToolExecutionError {
    message: String,
    source_error: Option<GuardianError>,
}

impl ToolExecutionError {
    /// Wrap a failure that is not a [`GuardianError`]; only its string form survives.
    pub fn other(err: impl std::fmt::Display) -> Self {
        Self {
            message: err.to_string(),
            source_error: None,
        }
    }

    /// The message without the `Tool execution failed: ` prefix
    pub fn inner_message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> Option<&GuardianError> {
        self.source_error.as_ref()
    }

    pub fn code(&self) -> &'static str {
        self.source_error
            .as_ref()
            .map(GuardianError::code)
            .unwrap_or(codes::INTERNAL_ERROR)
    }

    pub fn to_payload(&self) -> ToolErrorPayload {
        ToolErrorPayload {
            error: self.code().to_string(),
            message: self.to_string(),
            status: self
                .source_error
                .as_ref()
                .and_then(GuardianError::upstream_code)
                .map(str::to_string),
        }
    }
}

impl From<GuardianError> for ToolExecutionError {
    fn from(err: GuardianError) -> Self {
        Self {
            message: err.to_string(),
            source_error: Some(err),
        }
    }
}

/// Structured error data attached to protocol error responses
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolErrorPayload {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Full wrapped message
    pub message: String,
    /// Upstream status or code, when the API answered with an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Error codes used across the adapter
pub mod codes {
    pub const CONFIGURATION_ERROR: &str = "configuration_error";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INVALID_RESPONSE: &str = "invalid_response";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const TIMEOUT: &str = "timeout";
    pub const CONNECTION_FAILURE: &str = "connection_failure";
    pub const TRANSPORT_ERROR: &str = "transport_error";
    pub const UNKNOWN_OPERATION: &str = "unknown_operation";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_keep_stable_text() {
        assert_eq!(
            GuardianError::Timeout.to_string(),
            "Guardian Intel API request timeout"
        );
        assert_eq!(
            GuardianError::Connection.to_string(),
            "Unable to connect to Guardian Intel API"
        );
        assert_eq!(
            GuardianError::Transport("socket closed".into()).to_string(),
            "Guardian Intel API Error: socket closed"
        );
    }

    #[test]
    fn upstream_error_embeds_code_in_parentheses() {
        let err = GuardianError::upstream("404", "Tag not found");
        assert_eq!(err.to_string(), "Guardian Intel API Error (404): Tag not found");
        assert_eq!(err.upstream_code(), Some("404"));
        assert_eq!(err.code(), codes::UPSTREAM_ERROR);
    }

    #[test]
    fn tool_execution_error_wraps_inner_message() {
        let err: ToolExecutionError =
            GuardianError::UnknownOperation("unknown_tool".into()).into();
        assert_eq!(err.to_string(), "Tool execution failed: Unknown tool: unknown_tool");
        assert_eq!(err.inner_message(), "Unknown tool: unknown_tool");
        assert_eq!(err.code(), codes::UNKNOWN_OPERATION);
    }

    #[test]
    fn non_guardian_failures_wrap_their_string_form() {
        let err = ToolExecutionError::other("boom");
        assert_eq!(err.to_string(), "Tool execution failed: boom");
        assert!(err.kind().is_none());
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
    }

    #[test]
    fn payload_carries_upstream_status() {
        let err: ToolExecutionError = GuardianError::upstream("503", "down").into();
        let payload = err.to_payload();
        assert_eq!(payload.error, "upstream_error");
        assert_eq!(payload.status.as_deref(), Some("503"));
        assert_eq!(payload.message, "Tool execution failed: Guardian Intel API Error (503): down");
    }
}
