//! Function definitions and the tool contract.

use crate::cancellation::CancellationToken;
use crate::errors::ToolError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Execution context handed to a tool handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The ask this call belongs to.
    pub ask_id: Uuid,
    /// The model-assigned call id.
    pub call_id: String,
    /// Cancellation token of the surrounding ask.
    pub cancel_token: Arc<CancellationToken>,
}

impl ToolContext {
    /// Creates a new tool context.
    #[must_use]
    pub fn new(ask_id: Uuid, call_id: impl Into<String>, cancel_token: Arc<CancellationToken>) -> Self {
        Self {
            ask_id,
            call_id: call_id.into(),
            cancel_token,
        }
    }

    /// Creates a detached context with a fresh token.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Uuid::new_v4(), "", Arc::new(CancellationToken::new()))
    }

    /// Returns whether the surrounding ask was interrupted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Fails with [`ToolError::Cancelled`] if the ask was interrupted.
    pub fn check_cancelled(&self) -> Result<(), ToolError> {
        if self.is_cancelled() {
            Err(ToolError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The executable part of a function definition.
#[async_trait]
pub trait CommandFn: Send + Sync {
    /// Executes the command with the raw JSON arguments from the model.
    ///
    /// Returns the JSON-encoded result.
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError>;
}

/// Anything that can contribute a function definition from its configuration.
pub trait ToolProvider: Send + Sync {
    /// Produces the definition, or `None` if the tool is disabled.
    fn as_function_definition(&self) -> Option<FunctionDefinition>;
}

/// Model-facing description of a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: serde_json::Value,
}

/// Definition of a tool the model may call.
#[derive(Clone)]
pub struct FunctionDefinition {
    /// The tool name as the model sees it.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the arguments, sent to the model verbatim.
    pub parameters: serde_json::Value,
    /// Whether the user must consent before the handler runs.
    pub needs_approval: bool,
    /// The bound handler.
    pub command: Arc<dyn CommandFn>,
}

impl FunctionDefinition {
    /// Creates a new function definition.
    #[must_use]
    pub fn new(name: impl Into<String>, command: Arc<dyn CommandFn>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
            needs_approval: false,
            command,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the parameters schema.
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the approval requirement.
    #[must_use]
    pub fn with_approval(mut self, needs_approval: bool) -> Self {
        self.needs_approval = needs_approval;
        self
    }

    /// Returns the model-facing projection.
    #[must_use]
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Invokes the bound handler.
    pub async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        self.command.call(ctx, arguments).await
    }
}

impl std::fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("needs_approval", &self.needs_approval)
            .finish_non_exhaustive()
    }
}

/// Decodes raw JSON arguments into a typed structure.
///
/// An empty string is treated as `{}`.
pub fn decode_arguments<T: DeserializeOwned>(raw: &str) -> Result<T, ToolError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(ToolError::argument_parse)
}

/// Encodes a tool result.
pub fn encode_result<T: Serialize>(result: &T) -> Result<Vec<u8>, ToolError> {
    serde_json::to_vec(result).map_err(|e| ToolError::Io {
        operation: "encoding result".to_string(),
        reason: e.to_string(),
    })
}

/// Parses an octal permission string such as `"0644"`.
///
/// Falls back to `default` when the string is empty.
pub fn parse_permission(raw: &str, default: u32) -> Result<u32, ToolError> {
    if raw.is_empty() {
        return Ok(default);
    }

    let mode = u32::from_str_radix(raw, 8).map_err(|e| ToolError::permission_parse(raw, e))?;
    if mode > 0o7777 {
        return Err(ToolError::permission_parse(raw, "mode out of range"));
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CommandFn for Echo {
        async fn call(&self, _ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
            Ok(arguments.as_bytes().to_vec())
        }
    }

    #[derive(Debug, Deserialize)]
    struct Args {
        path: String,
    }

    #[test]
    fn test_function_definition_builder() {
        let def = FunctionDefinition::new("echo", Arc::new(Echo))
            .with_description("Echoes")
            .with_approval(true);

        assert_eq!(def.name, "echo");
        assert!(def.needs_approval);
        assert_eq!(def.spec().description, "Echoes");
    }

    #[test]
    fn test_spec_omits_handler_and_approval() {
        let def = FunctionDefinition::new("echo", Arc::new(Echo)).with_approval(true);
        let json = serde_json::to_value(def.spec()).unwrap();

        assert!(json.get("needs_approval").is_none());
        assert_eq!(json["name"], "echo");
    }

    #[tokio::test]
    async fn test_invoke_calls_handler() {
        let def = FunctionDefinition::new("echo", Arc::new(Echo));
        let out = def.invoke(&ToolContext::detached(), "{\"a\":1}").await.unwrap();
        assert_eq!(out, b"{\"a\":1}");
    }

    #[test]
    fn test_decode_arguments() {
        let args: Args = decode_arguments("{\"path\": \"/tmp\"}").unwrap();
        assert_eq!(args.path, "/tmp");

        let err = decode_arguments::<Args>("not json").unwrap_err();
        assert!(matches!(err, ToolError::ArgumentParse { .. }));
    }

    #[test]
    fn test_parse_permission() {
        assert_eq!(parse_permission("", 0o644).unwrap(), 0o644);
        assert_eq!(parse_permission("0600", 0o644).unwrap(), 0o600);
        assert_eq!(parse_permission("755", 0o644).unwrap(), 0o755);
        assert!(matches!(
            parse_permission("abc", 0o644).unwrap_err(),
            ToolError::PermissionParse { .. }
        ));
        assert!(parse_permission("99", 0o644).is_err());
    }

    #[test]
    fn test_context_cancellation() {
        let ctx = ToolContext::detached();
        assert!(ctx.check_cancelled().is_ok());

        ctx.cancel_token.cancel("stop");
        assert_eq!(ctx.check_cancelled().unwrap_err(), ToolError::Cancelled);
    }
}
