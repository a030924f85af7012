//! Event sinks used to push ask progress to the UI layer.
//!
//! The controller emits one event per lifecycle step of an ask. Event types
//! are plain dotted strings so front ends can filter by prefix.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// An ask was accepted and its task spawned.
pub const ASK_STARTED: &str = "ask.started";
/// A streamed chunk of model output.
pub const ASK_CHUNK: &str = "ask.chunk";
/// The ask finished with an answer.
pub const ASK_COMPLETED: &str = "ask.completed";
/// The ask was interrupted.
pub const ASK_INTERRUPTED: &str = "ask.interrupted";
/// The ask ended with an error.
pub const ASK_FAILED: &str = "ask.failed";
/// The model requested a tool call.
pub const TOOL_INVOKED: &str = "tool.invoked";
/// A tool call finished successfully.
pub const TOOL_COMPLETED: &str = "tool.completed";
/// A tool call failed; the failure was handed to the model.
pub const TOOL_FAILED: &str = "tool.failed";
/// A tool call is waiting for user consent.
pub const APPROVAL_REQUESTED: &str = "approval.requested";
/// The user decided on a pending tool call.
pub const APPROVAL_DECIDED: &str = "approval.decided";
