//! `executeCommand`: runs a program on the user's system.

use crate::errors::ToolError;
use crate::tools::definitions::{
    decode_arguments, encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider,
};
use crate::tools::path::ToolPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tracing::debug;

/// Configuration of the command execution tool.
///
/// Approval is required unless configured otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandExecution {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

impl Default for CommandExecution {
    fn default() -> Self {
        Self {
            disable: false,
            needs_approval: true,
        }
    }
}

/// Arguments accepted by `executeCommand`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandExecutionArguments {
    /// Program name or path.
    pub name: String,
    /// Program arguments.
    pub arguments: Vec<String>,
    /// Working directory; defaults to the process working directory.
    pub working_directory: ToolPath,
    /// Additional environment variables.
    pub environment: HashMap<String, String>,
}

/// Result of `executeCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExecutionResult {
    /// Exit code; `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolProvider for CommandExecution {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("executeCommand", Arc::new(self.clone()))
                .with_description(
                    "Executes a command on the user's system and returns its exit code and output.",
                )
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name or path of the program to execute."
                        },
                        "arguments": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "The arguments passed to the program."
                        },
                        "working_directory": {
                            "type": "string",
                            "description": "The working directory of the program. Use '~' for the user's home directory."
                        },
                        "environment": {
                            "type": "object",
                            "additionalProperties": {"type": "string"},
                            "description": "Additional environment variables."
                        }
                    },
                    "additionalProperties": false,
                    "required": ["name"]
                }))
                .with_approval(self.needs_approval),
        )
    }
}

#[async_trait]
impl CommandFn for CommandExecution {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        let args: CommandExecutionArguments = decode_arguments(arguments)?;
        if args.name.trim().is_empty() {
            return Err(ToolError::missing("name"));
        }
        ctx.check_cancelled()?;

        let mut command = tokio::process::Command::new(&args.name);
        command
            .args(&args.arguments)
            .envs(&args.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !args.working_directory.is_empty() {
            command.current_dir(args.working_directory.resolve()?);
        }

        debug!(command = %args.name, arguments = ?args.arguments, "Spawning command");
        let child = command
            .spawn()
            .map_err(|e| ToolError::io(format!("starting command '{}'", args.name), &e))?;

        // Dropping the wait future kills the child.
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|e| ToolError::CommandFailed {
                command: args.name.clone(),
                reason: e.to_string(),
            })?,
            () = ctx.cancel_token.cancelled() => return Err(ToolError::Cancelled),
        };

        encode_result(&CommandExecutionResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn run(ctx: &ToolContext, arguments: serde_json::Value) -> Result<CommandExecutionResult, ToolError> {
        let out = CommandExecution::default()
            .call(ctx, &arguments.to_string())
            .await?;
        Ok(serde_json::from_slice(&out).unwrap())
    }

    #[tokio::test]
    async fn test_captures_output() {
        let result = run(
            &ToolContext::detached(),
            serde_json::json!({"name": "sh", "arguments": ["-c", "echo out; echo err >&2; exit 3"]}),
        )
        .await
        .unwrap();

        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_passes_environment() {
        let result = run(
            &ToolContext::detached(),
            serde_json::json!({
                "name": "sh",
                "arguments": ["-c", "printf %s \"$ASKFLOW_TEST\""],
                "environment": {"ASKFLOW_TEST": "yes"}
            }),
        )
        .await
        .unwrap();

        assert_eq!(result.stdout, "yes");
    }

    #[tokio::test]
    async fn test_missing_name() {
        let err = run(&ToolContext::detached(), serde_json::json!({"arguments": ["x"]}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::missing("name"));
    }

    #[tokio::test]
    async fn test_unknown_program_is_io_error() {
        let err = run(
            &ToolContext::detached(),
            serde_json::json!({"name": "askflow-definitely-not-a-program"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_kills_command() {
        let ctx = ToolContext::detached();
        let token = ctx.cancel_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel("interrupt");
        });

        let started = std::time::Instant::now();
        let err = run(&ctx, serde_json::json!({"name": "sleep", "arguments": ["10"]}))
            .await
            .unwrap_err();

        assert_eq!(err, ToolError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
