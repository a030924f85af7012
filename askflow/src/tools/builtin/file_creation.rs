//! `createFile`: creates a new file, refusing to overwrite.

use super::{conflict_if_exists, DEFAULT_FILE_PERMISSION};
use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, parse_permission, CommandFn, FunctionDefinition, ToolContext,
    ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Configuration of the file creation tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCreation {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

/// Arguments accepted by `createFile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCreationArguments {
    /// Target path; `~` expands to the home directory.
    pub path: ToolPath,
    /// File content.
    pub content: String,
    /// Octal permission string.
    pub permission: String,
}

/// Result of `createFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCreationResult {
    /// Absolute path of the created file.
    pub path: String,
    /// Number of bytes written.
    pub written: usize,
}

impl ToolProvider for FileCreation {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("createFile", Arc::new(self.clone()))
                .with_description("Creates a new file on the user's system.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to the file to create. Use '~' for the user's home directory."
                        },
                        "content": {
                            "type": "string",
                            "description": "The content of the file."
                        },
                        "permission": {
                            "type": "string",
                            "description": "The permission of the file. Default is 0644."
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
impl CommandFn for FileCreation {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: FileCreationArguments = decode_arguments(arguments)?;
        if args.path.is_empty() {
            return Err(ToolError::missing("path"));
        }

        let path = args.path.resolve()?;
        let mode = parse_permission(&args.permission, DEFAULT_FILE_PERMISSION)?;
        ctx.check_cancelled()?;

        conflict_if_exists(&path).await?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ToolError::conflict(path.display().to_string(), "file already exists")
            } else {
                ToolError::io("creating file", &e)
            }
        })?;

        file.write_all(args.content.as_bytes())
            .await
            .map_err(|e| ToolError::io("writing to file", &e))?;
        file.flush()
            .await
            .map_err(|e| ToolError::io("writing to file", &e))?;

        encode_result(&FileCreationResult {
            path: path.display().to_string(),
            written: args.content.len(),
        })
    }
}
