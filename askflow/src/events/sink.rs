//! Where ask events go.

use super::{ASK_CHUNK, ASK_FAILED, TOOL_FAILED};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{info, trace, warn};

/// Receives ask lifecycle events.
///
/// The controller emits from inside the ask task and, for `ask.chunk`,
/// while holding the stream lock, so implementations must return quickly
/// and never fail.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records an event from async context. Defaults to [`EventSink::try_emit`].
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.try_emit(event_type, data);
    }

    /// Records an event without awaiting.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards every event. The controller default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// The identifying fields of an event payload.
#[derive(Debug, Default, PartialEq, Eq)]
struct EventFields<'a> {
    ask_id: Option<&'a str>,
    tool: Option<&'a str>,
    call_id: Option<&'a str>,
    kind: Option<&'a str>,
    message: Option<&'a str>,
}

impl<'a> EventFields<'a> {
    fn from_data(data: Option<&'a Value>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };
        let text = |key: &str| data.get(key).and_then(Value::as_str);
        Self {
            ask_id: text("ask_id"),
            // Approval requests carry the pending call, which names the tool `name`.
            tool: text("tool").or_else(|| text("name")),
            call_id: text("call_id"),
            kind: text("kind"),
            message: text("message"),
        }
    }
}

/// Turns ask events into structured log lines.
///
/// Failures log at WARN and everything else at INFO, each with `ask_id`,
/// `tool`, `call_id` and `kind` fields when the payload has them. Streamed
/// chunks are only logged, at TRACE, when enabled with
/// [`LoggingEventSink::with_chunks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink {
    chunks: bool,
}

impl LoggingEventSink {
    /// Creates a sink that skips streamed chunks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also logs every streamed chunk.
    #[must_use]
    pub fn with_chunks(mut self) -> Self {
        self.chunks = true;
        self
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        let fields = EventFields::from_data(data.as_ref());
        match event_type {
            ASK_CHUNK => {
                if self.chunks {
                    let len = data
                        .as_ref()
                        .and_then(|d| d.get("chunk"))
                        .and_then(Value::as_str)
                        .map_or(0, str::len);
                    trace!(event = event_type, ask_id = fields.ask_id, len, "Ask event");
                }
            }
            ASK_FAILED | TOOL_FAILED => warn!(
                event = event_type,
                ask_id = fields.ask_id,
                tool = fields.tool,
                call_id = fields.call_id,
                kind = fields.kind,
                error = fields.message,
                "Ask event"
            ),
            _ => info!(
                event = event_type,
                ask_id = fields.ask_id,
                tool = fields.tool,
                call_id = fields.call_id,
                "Ask event"
            ),
        }
    }
}

/// Keeps every event in memory, for tests and headless front ends.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Events whose type starts with `prefix`, in emission order.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<(String, Option<Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}
