//! A model that replays a fixed script.

use crate::cancellation::CancellationToken;
use crate::controller::StreamWriter;
use crate::errors::ModelError;
use crate::model::{ChatModel, ModelRequest, ModelResponse, ToolCallRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Streams the chunks, then answers with their concatenation.
    Reply(Vec<String>),
    /// Requests tool calls.
    ToolCalls(Vec<ToolCallRequest>),
    /// Fails the turn.
    Fail(ModelError),
    /// Streams the chunks, then waits for cancellation and reports it.
    Hang(Vec<String>),
    /// Streams the chunks, then never returns, even when cancelled.
    Stall(Vec<String>),
}

/// A [`ChatModel`] that replays [`ScriptStep`]s in order.
///
/// Each call to `generate` consumes one step. Running out of steps is a
/// protocol error.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<ModelRequest>>,
    close_count: AtomicUsize,
}

impl ScriptedModel {
    /// Creates a model with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn step(self, step: ScriptStep) -> Self {
        self.steps.lock().push_back(step);
        self
    }

    /// Appends a single-chunk reply.
    #[must_use]
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.step(ScriptStep::Reply(vec![text.into()]))
    }

    /// Appends a streamed reply.
    #[must_use]
    pub fn reply_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(ScriptStep::Reply(chunks.into_iter().map(Into::into).collect()))
    }

    /// Appends a turn requesting one tool call.
    #[must_use]
    pub fn tool_call(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        self.step(ScriptStep::ToolCalls(vec![ToolCallRequest::new(id, name, arguments)]))
    }

    /// Appends a failing turn.
    #[must_use]
    pub fn fail(self, error: ModelError) -> Self {
        self.step(ScriptStep::Fail(error))
    }

    /// Appends a turn that streams and then waits for cancellation.
    #[must_use]
    pub fn hang_after<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(ScriptStep::Hang(chunks.into_iter().map(Into::into).collect()))
    }

    /// Appends a turn that streams and then never returns.
    #[must_use]
    pub fn stall_after<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(ScriptStep::Stall(chunks.into_iter().map(Into::into).collect()))
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    /// Returns how often `close` was called.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Returns the number of unconsumed steps.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }
}

fn stream_all(stream: &StreamWriter, chunks: &[String]) {
    for chunk in chunks {
        stream.write(chunk);
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(
        &self,
        request: &ModelRequest,
        stream: &StreamWriter,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, ModelError> {
        self.requests.lock().push(request.clone());
        let step = self.steps.lock().pop_front();

        match step {
            Some(ScriptStep::Reply(chunks)) => {
                stream_all(stream, &chunks);
                Ok(ModelResponse::text(chunks.concat()))
            }
            Some(ScriptStep::ToolCalls(calls)) => Ok(ModelResponse::tool_calls(calls)),
            Some(ScriptStep::Fail(err)) => Err(err),
            Some(ScriptStep::Hang(chunks)) => {
                stream_all(stream, &chunks);
                cancel.cancelled().await;
                Err(ModelError::Cancelled)
            }
            Some(ScriptStep::Stall(chunks)) => {
                stream_all(stream, &chunks);
                futures::future::pending::<()>().await;
                Err(ModelError::Cancelled)
            }
            None => Err(ModelError::Protocol("script exhausted".to_string())),
        }
    }

    async fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_replays_steps_in_order() {
        let model = ScriptedModel::new()
            .tool_call("c1", "__getStats", "{}")
            .reply_chunks(["Hel", "lo"]);
        let stream = StreamWriter::detached();
        let cancel = CancellationToken::new();
        let request = ModelRequest::default();

        let first = model.generate(&request, &stream, &cancel).await.unwrap();
        let second = model.generate(&request, &stream, &cancel).await.unwrap();
        let third = model.generate(&request, &stream, &cancel).await;

        assert!(first.has_tool_calls());
        assert_eq!(second.content, "Hello");
        assert_eq!(stream.snapshot(), "Hello");
        assert!(matches!(third, Err(ModelError::Protocol(_))));
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_hang_observes_cancellation() {
        let model = ScriptedModel::new().hang_after(["part"]);
        let stream = StreamWriter::detached();
        let cancel = Arc::new(CancellationToken::new());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel("stop");
        });

        let result = model.generate(&ModelRequest::default(), &stream, &cancel).await;
        assert_eq!(result, Err(ModelError::Cancelled));
        assert_eq!(stream.snapshot(), "part");
    }

    #[tokio::test]
    async fn test_close_is_counted() {
        let model = ScriptedModel::new();
        model.close().await;
        assert_eq!(model.close_count(), 1);
    }
}
