//! Test doubles for driving the controller without a real model.
//!
//! This module provides:
//! - [`ScriptedModel`], a model that replays a fixed script
//! - [`RecordingCommand`], a tool handler that records its calls
//! - [`CollectingEventSink`], re-exported for asserting emitted events
//! - [`LogCapture`], an in-memory log writer

mod command;
mod logs;
mod model;

pub use crate::events::CollectingEventSink;
pub use command::RecordingCommand;
pub use logs::LogCapture;
pub use model::{ScriptStep, ScriptedModel};
