//! Accumulation of streamed model output.

use crate::events::{EventSink, NoOpEventSink, ASK_CHUNK};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct StreamState {
    /// The ask currently allowed to append.
    ask_id: Option<Uuid>,
    content: String,
}

/// Partial output of the current ask.
///
/// Reset at the start of every ask. Writers bound to an earlier ask are
/// ignored, so a late chunk can never leak into the next answer.
#[derive(Debug, Clone, Default)]
pub struct StreamBuffer {
    state: Arc<Mutex<StreamState>>,
}

impl StreamBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer and returns a writer bound to `ask_id`.
    #[must_use]
    pub fn begin(&self, ask_id: Uuid) -> StreamWriter {
        {
            let mut state = self.state.lock();
            state.ask_id = Some(ask_id);
            state.content.clear();
        }
        StreamWriter {
            buffer: self.clone(),
            ask_id,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Returns everything appended for the current ask.
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.state.lock().content.clone()
    }
}

/// Append handle given to the model for one ask.
#[derive(Clone)]
pub struct StreamWriter {
    buffer: StreamBuffer,
    ask_id: Uuid,
    events: Arc<dyn EventSink>,
}

impl StreamWriter {
    /// A writer on a private buffer, for driving a model outside a controller.
    #[must_use]
    pub fn detached() -> Self {
        StreamBuffer::new().begin(Uuid::new_v4())
    }

    /// Mirrors every accepted chunk to `events` as `ask.chunk`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The ask this writer belongs to.
    #[must_use]
    pub fn ask_id(&self) -> Uuid {
        self.ask_id
    }

    /// Appends a chunk. Returns false if the buffer has moved on to another ask.
    pub fn write(&self, chunk: &str) -> bool {
        let mut state = self.buffer.state.lock();
        if state.ask_id != Some(self.ask_id) {
            return false;
        }
        state.content.push_str(chunk);
        // Emitted under the lock so events keep append order.
        self.events.try_emit(
            ASK_CHUNK,
            Some(serde_json::json!({"ask_id": self.ask_id, "chunk": chunk})),
        );
        true
    }

    /// Returns the content written so far by this ask.
    #[must_use]
    pub fn snapshot(&self) -> String {
        let state = self.buffer.state.lock();
        if state.ask_id == Some(self.ask_id) {
            state.content.clone()
        } else {
            String::new()
        }
    }
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("ask_id", &self.ask_id)
            .finish_non_exhaustive()
    }
}
