//! # Askflow
//!
//! Ask a conversational model a question and let it call local tools while
//! answering.
//!
//! Askflow provides:
//!
//! - **Single-flight asks**: one question at a time, interruptible, with
//!   streamed partial output
//! - **Tool dispatch**: model-requested calls routed by name to typed handlers
//! - **Approval gating**: tools that need consent wait for the user
//! - **Built-in tools**: files, directories, stats, environment and commands
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use askflow::prelude::*;
//!
//! let config = AppConfig::from_file("askflow.json")?;
//! let controller = AskController::builder(model)
//!     .tools(config.tool_set()?)
//!     .config(config.ask.clone())
//!     .build();
//!
//! let result = controller.ask("Create notes.txt in my home directory")?.wait().await?;
//! controller.shutdown().await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod model;
pub mod observability;
pub mod testing;
pub mod tools;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{AppConfig, AskConfig};
    pub use crate::controller::{
        AskController, AskHandle, EnvironmentResolver, LastResult, StreamWriter,
    };
    pub use crate::errors::{AskError, ConfigError, ErrorKind, ModelError, ToolError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::model::{ChatModel, Message, ModelRequest, ModelResponse, ToolCallRequest};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::tools::{
        ApprovalChannel, ApprovalDecision, ApprovalService, BuiltIns, CommandFn,
        FunctionDefinition, ToolContext, ToolProvider, ToolSet, BUILTIN_PREFIX,
    };
}
