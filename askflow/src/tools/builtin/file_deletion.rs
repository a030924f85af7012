//! `deleteFile`: removes a regular file.

use super::require_path;
use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration of the file deletion tool.
///
/// Approval is required unless configured otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeletion {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

impl Default for FileDeletion {
    fn default() -> Self {
        Self {
            disable: false,
            needs_approval: true,
        }
    }
}

/// Arguments accepted by `deleteFile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeletionArguments {
    /// Target path.
    pub path: ToolPath,
}

/// Result of `deleteFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeletionResult {
    /// Absolute path of the removed file.
    pub path: String,
}

impl ToolProvider for FileDeletion {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("deleteFile", Arc::new(self.clone()))
                .with_description("Deletes a file on the user's system.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to the file to delete. Use '~' for the user's home directory."
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
impl CommandFn for FileDeletion {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: FileDeletionArguments = decode_arguments(arguments)?;
        let path = require_path(&args.path, "path")?;
        ctx.check_cancelled()?;

        let display = path.display().to_string();
        match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(ToolError::conflict(display, "path is a directory"));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::not_found(display));
            }
            Err(e) => return Err(ToolError::io("checking path", &e)),
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ToolError::io("deleting file", &e))?;

        encode_result(&FileDeletionResult { path: display })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_requires_approval_by_default() {
        let def = FileDeletion::default().as_function_definition().unwrap();
        assert!(def.needs_approval);
    }

    #[tokio::test]
    async fn test_deletes_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("gone.txt");
        std::fs::write(&target, "x").unwrap();

        FileDeletion::default()
            .call(
                &ToolContext::detached(),
                &serde_json::json!({"path": target.display().to_string()}).to_string(),
            )
            .await
            .unwrap();

        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_refuses_directory() {
        let dir = TempDir::new().unwrap();

        let err = FileDeletion::default()
            .call(
                &ToolContext::detached(),
                &serde_json::json!({"path": dir.path().display().to_string()}).to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::PathConflict { .. }));
        assert!(dir.path().exists());
    }
}
