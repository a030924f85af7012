//! `getSystemInformation`: facts about the host the user runs on.

use crate::errors::ToolError;
use crate::tools::definitions::{encode_result, CommandFn, FunctionDefinition, ToolContext, ToolProvider};
use async_trait::async_trait;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration of the system information tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    /// Disable the tool.
    pub disable: bool,
    /// Needs user approval to be executed.
    #[serde(rename = "approval")]
    pub needs_approval: bool,
}

/// Result of `getSystemInformation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfoResult {
    /// Operating system, e.g. "linux".
    pub os: String,
    /// CPU architecture, e.g. "x86_64".
    pub arch: String,
    /// OS family, e.g. "unix".
    pub family: String,
    /// Host name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// The user's home directory, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_dir: Option<String>,
    /// The process working directory, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Process id of this application.
    pub process_id: u32,
    /// Available parallelism.
    pub num_cpus: usize,
}

impl SystemInfoResult {
    /// Collects information about the current host.
    pub async fn collect() -> Self {
        let from_env = std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .filter(|s| !s.is_empty());
        let hostname = match from_env {
            Some(name) => Some(name),
            None => tokio::fs::read_to_string("/etc/hostname")
                .await
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            hostname,
            user_dir: BaseDirs::new().map(|d| d.home_dir().display().to_string()),
            working_dir: std::env::current_dir().ok().map(|p| p.display().to_string()),
            process_id: std::process::id(),
            num_cpus: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
        }
    }
}

impl ToolProvider for SystemInfo {
    fn as_function_definition(&self) -> Option<FunctionDefinition> {
        if self.disable {
            return None;
        }

        Some(
            FunctionDefinition::new("getSystemInformation", Arc::new(self.clone()))
                .with_description(
                    "Returns information about the user's system: operating system, architecture, \
                     hostname, home and working directory.",
                )
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
impl CommandFn for SystemInfo {
    async fn call(&self, ctx: &ToolContext, _arguments: &str) -> Result<Vec<u8>, ToolError> {
        ctx.check_cancelled()?;
        encode_result(&SystemInfoResult::collect().await)
    }
}
