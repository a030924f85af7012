//! Tools the model may call.
//!
//! This module provides:
//! - The tool contract ([`CommandFn`], [`ToolProvider`], [`FunctionDefinition`])
//! - Path resolution for tool arguments
//! - The built-in tools and their registry
//! - The approval gate for tools that need user consent

mod approval;
pub mod builtin;
mod definitions;
mod path;
mod registry;

pub use approval::{
    ApprovalChannel, ApprovalDecision, ApprovalService, AutoApprove, AutoDeny, PendingToolCall,
};
#[cfg(test)]
pub use approval::MockApprovalChannel;
pub use definitions::{
    decode_arguments, encode_result, parse_permission, CommandFn, FunctionDefinition, ToolContext,
    ToolProvider, ToolSpec,
};
pub use path::ToolPath;
pub use registry::{BuiltIns, ToolSet, BUILTIN_PREFIX};
