//! `appendFile`: appends content to an existing regular file.

use super::require_path;
use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Configuration of the file appending tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAppending {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

/// Arguments accepted by `appendFile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAppendingArguments {
    /// Target path.
    pub path: ToolPath,
    /// Content to append.
    pub content: String,
}

/// Result of `appendFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAppendingResult {
    /// Absolute path of the file.
    pub path: String,
    /// Number of bytes appended.
    pub written: usize,
}

impl ToolProvider for FileAppending {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("appendFile", Arc::new(self.clone()))
                .with_description("Appends content to an existing file on the user's system.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to the file to append to. Use '~' for the user's home directory."
                        },
                        "content": {
                            "type": "string",
                            "description": "The content to append."
                        }
                    },
                    "additionalProperties": false,
                    "required": ["path", "content"]
                }))
                .with_approval(self.needs_approval),
        )
    }
}

#[async_trait]
impl CommandFn for FileAppending {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: FileAppendingArguments = decode_arguments(arguments)?;
        let path = require_path(&args.path, "path")?;
        if args.content.is_empty() {
            return Err(ToolError::missing("content"));
        }
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

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ToolError::io("opening file", &e))?;
        file.write_all(args.content.as_bytes())
            .await
            .map_err(|e| ToolError::io("appending to file", &e))?;
        file.flush()
            .await
            .map_err(|e| ToolError::io("appending to file", &e))?;

        encode_result(&FileAppendingResult {
            path: display,
            written: args.content.len(),
        })
    }
}
