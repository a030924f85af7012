//! A tool handler that records its calls.

use crate::errors::ToolError;
use crate::tools::{CommandFn, ToolContext};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// A tool handler returning a fixed response and recording every call.
#[derive(Debug)]
pub struct RecordingCommand {
    response: Result<Vec<u8>, ToolError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl RecordingCommand {
    /// Succeeds with the given JSON.
    #[must_use]
    pub fn ok(json: impl Into<String>) -> Self {
        Self {
            response: Ok(json.into().into_bytes()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails with the given error.
    #[must_use]
    pub fn failing(error: ToolError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Waits this long before answering, or until the ask is interrupted.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the raw arguments of every call.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandFn for RecordingCommand {
    async fn call(&self, ctx: &ToolContext, arguments: &str) -> Result<Vec<u8>, ToolError> {
        self.calls.lock().push(arguments.to_string());

        if let Some(delay) = self.delay {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = ctx.cancel_token.cancelled() => return Err(ToolError::Cancelled),
            }
        }

        self.response.clone()
    }
}
