//! `getStats`: file metadata.

use super::require_path;
use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration of the stats tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

/// Arguments accepted by `getStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsArguments {
    /// Target path.
    pub path: ToolPath,
}

/// Result of `getStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResult {
    /// Absolute path.
    pub path: String,
    /// Whether it is a regular file.
    pub is_file: bool,
    /// Whether it is a directory.
    pub is_directory: bool,
    /// Whether the path itself is a symbolic link.
    pub is_symlink: bool,
    /// Size in bytes.
    pub size: u64,
    /// Octal permission bits, e.g. "0644".
    pub permissions: String,
    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl ToolProvider for Stats {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("getStats", Arc::new(self.clone()))
                .with_description("Returns information about a file or directory on the user's system.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to inspect. Use '~' for the user's home directory."
                        }
                    },
                    "additionalProperties": false,
                    "required": ["path"]
                }))
                .with_approval(self.needs_approval),
        )
    }
}

#[async_trait]
impl CommandFn for Stats {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: StatsArguments = decode_arguments(arguments)?;
        let path = require_path(&args.path, "path")?;
        ctx.check_cancelled()?;

        let display = path.display().to_string();
        let link_meta = tokio::fs::symlink_metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::not_found(display.clone())
            } else {
                ToolError::io("reading metadata", &e)
            }
        })?;
        // Follow the link for the target's own attributes; a dangling link keeps its own.
        let meta = tokio::fs::metadata(&path).await.unwrap_or_else(|_| link_meta.clone());

        encode_result(&StatsResult {
            path: display,
            is_file: meta.is_file(),
            is_directory: meta.is_dir(),
            is_symlink: link_meta.file_type().is_symlink(),
            size: meta.len(),
            permissions: permission_string(&meta),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

#[cfg(unix)]
fn permission_string(meta: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:04o}", meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_string(meta: &std::fs::Metadata) -> String {
    if meta.permissions().readonly() {
        "0444".to_string()
    } else {
        "0644".to_string()
    }
}
