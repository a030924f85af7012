//! Error types for askflow.
//!
//! Errors are split by layer. Tool errors are recovered and handed back to the
//! model as the outcome of its tool call, model errors abort the current ask,
//! and configuration errors stop startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure kinds visible to callers and to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid configuration. Fatal at startup.
    Configuration,
    /// Malformed or missing tool arguments.
    Argument,
    /// The tool's target state already exists.
    Conflict,
    /// Underlying operation failure.
    Io,
    /// The model requested a tool that is not registered.
    UnknownTool,
    /// The ask or tool call was interrupted.
    Cancellation,
    /// Model-level failure.
    Connection,
    /// An ask is already in flight.
    Busy,
    /// The user declined a tool call.
    Declined,
    /// The controller has been shut down.
    ShutDown,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns the stable name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Argument => "ArgumentError",
            Self::Conflict => "ConflictError",
            Self::Io => "IOError",
            Self::UnknownTool => "UnknownToolError",
            Self::Cancellation => "CancellationError",
            Self::Connection => "ConnectionError",
            Self::Busy => "BusyError",
            Self::Declined => "DeclinedError",
            Self::ShutDown => "ShutDownError",
            Self::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by tool handlers and by tool dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// The raw JSON arguments could not be decoded.
    #[error("error parsing arguments: {reason}")]
    ArgumentParse {
        /// The decoder message.
        reason: String,
    },

    /// A required argument was absent or empty.
    #[error("missing parameter: '{name}'")]
    MissingParameter {
        /// The parameter name.
        name: String,
    },

    /// A path argument could not be resolved.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The raw path string.
        path: String,
        /// Why it could not be resolved.
        reason: String,
    },

    /// A permission string is not a valid octal mode.
    #[error("error parsing permissions '{value}': {reason}")]
    PermissionParse {
        /// The raw permission string.
        value: String,
        /// The parser message.
        reason: String,
    },

    /// The target already exists in a conflicting state.
    #[error("{message}: {path}")]
    PathConflict {
        /// The resolved path.
        path: String,
        /// What was found there.
        message: String,
    },

    /// The target does not exist.
    #[error("no such file or directory: {path}")]
    NotFound {
        /// The resolved path.
        path: String,
    },

    /// An underlying I/O operation failed.
    #[error("error {operation}: {reason}")]
    Io {
        /// The operation, e.g. "creating file".
        operation: String,
        /// The underlying error message.
        reason: String,
    },

    /// A spawned command could not be awaited.
    #[error("command '{command}' failed: {reason}")]
    CommandFailed {
        /// The command name.
        command: String,
        /// The failure reason.
        reason: String,
    },

    /// The model requested a tool that is not in the tool set.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The requested name.
        name: String,
    },

    /// The user declined the tool call.
    #[error("the user declined the execution of tool: {name}")]
    Declined {
        /// The tool name.
        name: String,
    },

    /// The call was interrupted.
    #[error("tool call cancelled")]
    Cancelled,
}

impl ToolError {
    /// Creates an argument parse error.
    #[must_use]
    pub fn argument_parse(reason: impl fmt::Display) -> Self {
        Self::ArgumentParse {
            reason: reason.to_string(),
        }
    }

    /// Creates a missing parameter error.
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Creates an invalid path error.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a permission parse error.
    #[must_use]
    pub fn permission_parse(value: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::PermissionParse {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a path conflict error.
    #[must_use]
    pub fn conflict(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PathConflict {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an I/O error for the given operation.
    #[must_use]
    pub fn io(operation: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            reason: err.to_string(),
        }
    }

    /// Creates an unknown tool error.
    #[must_use]
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Creates a declined error.
    #[must_use]
    pub fn declined(name: impl Into<String>) -> Self {
        Self::Declined { name: name.into() }
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArgumentParse { .. }
            | Self::MissingParameter { .. }
            | Self::InvalidPath { .. }
            | Self::PermissionParse { .. } => ErrorKind::Argument,
            Self::PathConflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } | Self::Io { .. } | Self::CommandFailed { .. } => ErrorKind::Io,
            Self::UnknownTool { .. } => ErrorKind::UnknownTool,
            Self::Declined { .. } => ErrorKind::Declined,
            Self::Cancelled => ErrorKind::Cancellation,
        }
    }

    /// Renders the structured failure handed back to the model.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "kind": self.kind().as_str(),
                "message": self.to_string(),
            }
        })
    }
}

/// Errors raised by the model connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Network, authentication or provider failure.
    #[error("model connection error: {0}")]
    Connection(String),

    /// The provider answered with something that could not be understood.
    #[error("model protocol error: {0}")]
    Protocol(String),

    /// The call observed cancellation.
    #[error("model call cancelled")]
    Cancelled,
}

impl ModelError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection(reason.into())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration document could not be decoded.
    #[error("could not parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("could not read configuration '{path}': {reason}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying error message.
        reason: String,
    },

    /// Two function definitions share a name.
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Environment-derived inputs could not be resolved at startup.
    #[error("could not resolve environment: {0}")]
    Environment(String),
}

/// Errors returned by the ask controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AskError {
    /// Another ask is already in flight.
    #[error("an ask is already in flight")]
    Busy,

    /// The controller has been shut down.
    #[error("the ask controller has been shut down")]
    ShutDown,

    /// The ask was interrupted.
    #[error("ask interrupted: {0}")]
    Cancelled(String),

    /// The model connection failed.
    #[error("{0}")]
    Connection(#[from] ModelError),

    /// Startup configuration failed.
    #[error("{0}")]
    Configuration(#[from] ConfigError),

    /// The model kept requesting tools past the configured bound.
    #[error("the model requested tools for more than {0} rounds")]
    TooManyToolRounds(usize),

    /// The ask task ended unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AskError {
    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy => ErrorKind::Busy,
            Self::ShutDown => ErrorKind::ShutDown,
            Self::Cancelled(_) | Self::Connection(ModelError::Cancelled) => ErrorKind::Cancellation,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::TooManyToolRounds(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error marks an interrupted ask.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_kinds() {
        assert_eq!(ToolError::missing("path").kind(), ErrorKind::Argument);
        assert_eq!(ToolError::permission_parse("abc", "invalid digit").kind(), ErrorKind::Argument);
        assert_eq!(ToolError::conflict("/tmp/x", "file already exists").kind(), ErrorKind::Conflict);
        assert_eq!(ToolError::not_found("/tmp/x").kind(), ErrorKind::Io);
        assert_eq!(ToolError::unknown_tool("nope").kind(), ErrorKind::UnknownTool);
        assert_eq!(ToolError::Cancelled.kind(), ErrorKind::Cancellation);
    }

    #[test]
    fn test_missing_parameter_message() {
        let err = ToolError::missing("path");
        assert_eq!(err.to_string(), "missing parameter: 'path'");
    }

    #[test]
    fn test_tool_error_payload() {
        let payload = ToolError::unknown_tool("__nope").to_payload();

        assert_eq!(payload["error"]["kind"], "UnknownToolError");
        assert_eq!(payload["error"]["message"], "unknown tool: __nope");
    }

    #[test]
    fn test_ask_error_kinds() {
        assert_eq!(AskError::Busy.kind(), ErrorKind::Busy);
        assert!(AskError::Cancelled("user".to_string()).is_cancelled());
        assert!(AskError::from(ModelError::Cancelled).is_cancelled());
        assert_eq!(
            AskError::from(ModelError::connection("unauthorized")).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            AskError::from(ConfigError::DuplicateTool("__x".to_string())).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Io.to_string(), "IOError");
        assert_eq!(ErrorKind::Busy.to_string(), "BusyError");
    }
}
