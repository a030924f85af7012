//! `readTextFile`: reads a text file, optionally a byte window of it.

use super::require_path;
use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Configuration of the file reading tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReading {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

/// Byte window to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadLimits {
    /// Bytes to skip from the start.
    pub offset: u64,
    /// Maximum number of bytes to read; 0 means no limit.
    pub limit: u64,
}

/// Arguments accepted by `readTextFile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReadingArguments {
    /// Target path.
    pub path: ToolPath,
    /// Optional byte window.
    pub limits: Option<ReadLimits>,
}

/// Result of `readTextFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReadingResult {
    /// Absolute path of the file.
    pub path: String,
    /// The (lossily decoded) content.
    pub content: String,
}

impl ToolProvider for FileReading {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("readTextFile", Arc::new(self.clone()))
                .with_description("Reads the content of a text file on the user's system.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to the file to read. Use '~' for the user's home directory."
                        },
                        "limits": {
                            "type": "object",
                            "description": "Optional byte window of the file to read.",
                            "properties": {
                                "offset": {"type": "integer", "description": "Bytes to skip."},
                                "limit": {"type": "integer", "description": "Maximum bytes to read."}
                            }
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
impl CommandFn for FileReading {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: FileReadingArguments = decode_arguments(arguments)?;
        let path = require_path(&args.path, "path")?;
        ctx.check_cancelled()?;

        let display = path.display().to_string();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(ToolError::conflict(display, "path is a directory"));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::not_found(display));
            }
            Err(e) => return Err(ToolError::io("checking path", &e)),
        }

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| ToolError::io("opening file", &e))?;

        let limits = args.limits.unwrap_or_default();
        if limits.offset > 0 {
            file.seek(std::io::SeekFrom::Start(limits.offset))
                .await
                .map_err(|e| ToolError::io("seeking file", &e))?;
        }

        let mut buf = Vec::new();
        if limits.limit > 0 {
            file.take(limits.limit)
                .read_to_end(&mut buf)
                .await
                .map_err(|e| ToolError::io("reading file", &e))?;
        } else {
            file.read_to_end(&mut buf)
                .await
                .map_err(|e| ToolError::io("reading file", &e))?;
        }

        encode_result(&FileReadingResult {
            path: display,
            content: String::from_utf8_lossy(&buf).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn read(arguments: serde_json::Value) -> Result<FileReadingResult, ToolError> {
        let out = FileReading::default()
            .call(&ToolContext::detached(), &arguments.to_string())
            .await?;
        Ok(serde_json::from_slice(&out).unwrap())
    }

    #[tokio::test]
    async fn test_reads_whole_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.txt");
        std::fs::write(&target, "hello world").unwrap();

        let result = read(serde_json::json!({"path": target.display().to_string()}))
            .await
            .unwrap();

        assert_eq!(result.content, "hello world");
    }

    #[tokio::test]
    async fn test_reads_window() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.txt");
        std::fs::write(&target, "hello world").unwrap();

        let result = read(serde_json::json!({
            "path": target.display().to_string(),
            "limits": {"offset": 6, "limit": 3}
        }))
        .await
        .unwrap();

        assert_eq!(result.content, "wor");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read(serde_json::json!({"path": dir.path().join("nope").display().to_string()}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_path() {
        let err = read(serde_json::json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::missing("path"));
    }
}
