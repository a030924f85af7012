//! Application configuration.
//!
//! The document format on disk is owned by the host application; this module
//! accepts the already-decoded structure (or JSON) and validates it.

use crate::errors::ConfigError;
use crate::tools::{BuiltIns, ToolSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_max_tool_rounds() -> usize {
    20
}

/// Settings of the ask controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AskConfig {
    /// Upper bound on model turns that request tools within one ask.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Deny pending approvals after this many seconds. `None` waits until
    /// the user answers or the ask is interrupted.
    pub approval_timeout_seconds: Option<f64>,
    /// Prepended to every conversation as a system message.
    pub system_prompt: Option<String>,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            approval_timeout_seconds: None,
            system_prompt: None,
        }
    }
}

impl AskConfig {
    /// Returns the approval timeout as a duration.
    ///
    /// Values a [`Duration`] cannot hold are treated as unset; `validate`
    /// rejects them.
    #[must_use]
    pub fn approval_timeout(&self) -> Option<Duration> {
        self.approval_timeout_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid(
                "max_tool_rounds must be at least 1".to_string(),
            ));
        }
        if let Some(secs) = self.approval_timeout_seconds {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "approval_timeout_seconds must be a positive number, got {secs}"
                )));
            }
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "approval_timeout_seconds is out of range, got {secs}"
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Built-in tool slots.
    pub builtins: BuiltIns,
    /// Controller settings.
    pub ask: AskConfig,
}

impl AppConfig {
    /// Decodes and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, decodes and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ask.validate()
    }

    /// Projects the enabled built-ins into a tool set.
    pub fn tool_set(&self) -> Result<ToolSet, ConfigError> {
        self.builtins.tool_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.ask.max_tool_rounds, 20);
        assert_eq!(config.ask.approval_timeout(), None);
    }

    #[test]
    fn test_partial_document() {
        let config = AppConfig::from_json_str(
            r#"{
                "builtins": {"command-execution": {"disable": true}},
                "ask": {"approval_timeout_seconds": 1.5, "theme": "dark"},
                "window": {"width": 800}
            }"#,
        )
        .unwrap();

        assert!(config.builtins.command_execution.disable);
        assert!(config.builtins.command_execution.needs_approval);
        assert_eq!(config.ask.max_tool_rounds, 20);
        assert_eq!(config.ask.approval_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_rejects_zero_rounds() {
        let err = AppConfig::from_json_str(r#"{"ask": {"max_tool_rounds": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_negative_timeout() {
        let err =
            AppConfig::from_json_str(r#"{"ask": {"approval_timeout_seconds": -1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unrepresentable_timeout() {
        let err = AppConfig::from_json_str(r#"{"ask": {"approval_timeout_seconds": 1e20}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("out of range")));

        let unchecked = AskConfig {
            approval_timeout_seconds: Some(1e20),
            ..AskConfig::default()
        };
        assert_eq!(unchecked.approval_timeout(), None);
    }

    #[test]
    fn test_malformed_document() {
        let err = AppConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"builtins": {{"stats": {{"disable": true}}}}}}"#).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        let names = config.tool_set().unwrap();

        assert!(config.builtins.stats.disable);
        assert!(names.get("__getStats").is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
