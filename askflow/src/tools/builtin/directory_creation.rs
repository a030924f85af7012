//! `createDirectory`: creates a directory and its parents.

use super::{require_path, DEFAULT_DIR_PERMISSION};
use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, parse_permission, CommandFn, FunctionDefinition, ToolContext,
    ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration of the directory creation tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryCreation {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

/// Arguments accepted by `createDirectory`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryCreationArguments {
    /// Target path.
    pub path: ToolPath,
    /// Octal permission string.
    pub permission: String,
}

/// Result of `createDirectory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCreationResult {
    /// Absolute path of the directory.
    pub path: String,
}

impl ToolProvider for DirectoryCreation {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("createDirectory", Arc::new(self.clone()))
                .with_description("Creates a new directory (and missing parents) on the user's system.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to the directory to create. Use '~' for the user's home directory."
                        },
                        "permission": {
                            "type": "string",
                            "description": "The permission of the directory. Default is 0755."
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
impl CommandFn for DirectoryCreation {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: DirectoryCreationArguments = decode_arguments(arguments)?;
        let path = require_path(&args.path, "path")?;
        let mode = parse_permission(&args.permission, DEFAULT_DIR_PERMISSION)?;
        ctx.check_cancelled()?;

        let display = path.display().to_string();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                return encode_result(&DirectoryCreationResult { path: display });
            }
            Ok(_) => return Err(ToolError::conflict(display, "path exists but is a file")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ToolError::io("checking path", &e)),
        }

        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        builder
            .create(&path)
            .await
            .map_err(|e| ToolError::io("creating directory", &e))?;

        encode_result(&DirectoryCreationResult { path: display })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/c");

        DirectoryCreation::default()
            .call(
                &ToolContext::detached(),
                &serde_json::json!({"path": target.display().to_string()}).to_string(),
            )
            .await
            .unwrap();

        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_existing_directory_is_success() {
        let dir = TempDir::new().unwrap();

        let out = DirectoryCreation::default()
            .call(
                &ToolContext::detached(),
                &serde_json::json!({"path": dir.path().display().to_string()}).to_string(),
            )
            .await
            .unwrap();
        let result: DirectoryCreationResult = serde_json::from_slice(&out).unwrap();

        assert_eq!(result.path, dir.path().display().to_string());
    }

    #[tokio::test]
    async fn test_existing_file_is_conflict() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file");
        std::fs::write(&target, "x").unwrap();

        let err = DirectoryCreation::default()
            .call(
                &ToolContext::detached(),
                &serde_json::json!({"path": target.display().to_string()}).to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::PathConflict { .. }));
        assert!(target.is_file());
    }
}
