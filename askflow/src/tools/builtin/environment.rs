//! `getEnvironment`: the process environment variables.

use crate::errors::ToolError;
use crate::tools::definitions::{encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Configuration of the environment tool.
///
/// Variables may carry secrets, so approval is required unless configured
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            disable: false,
            needs_approval: true,
        }
    }
}

/// Result of `getEnvironment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentResult {
    /// Variables sorted by name.
    pub env: BTreeMap<String, String>,
}

impl ToolProvider for Environment {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("getEnvironment", Arc::new(self.clone()))
                .with_description("Returns the environment variables of the user's session.")
                .with_parameters(serde_json::json!({
                    "type": "object",
                    "properties": {},
                    "additionalProperties": false,
                    "required": []
                }))
                .with_approval(self.needs_approval),
        )
    }
}

#[async_trait]
impl CommandFn for Environment {
    async fn call(&self, ctx: &ToolContext, _arguments: &str) -> Result<Vec<u8>, ToolError> {
        ctx.check_cancelled()?;
        encode_result(&EnvironmentResult {
            env: std::env::vars_os()
                .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
                .collect(),
        })
    }
}
