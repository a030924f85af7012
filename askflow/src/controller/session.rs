//! The model/tool exchange of one ask.

use super::dispatch::ToolDispatcher;
use super::stream::StreamWriter;
use crate::cancellation::CancellationToken;
use crate::errors::{AskError, ModelError};
use crate::model::{ChatModel, Message, ModelRequest};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Everything one ask needs, captured when the ask starts.
pub(crate) struct AskSession {
    pub(crate) ask_id: Uuid,
    pub(crate) question: String,
    pub(crate) system_prompt: Option<String>,
    pub(crate) max_tool_rounds: usize,
    pub(crate) model: Arc<dyn ChatModel>,
    pub(crate) dispatcher: ToolDispatcher,
    pub(crate) writer: StreamWriter,
    pub(crate) token: Arc<CancellationToken>,
}

impl AskSession {
    /// Drives the exchange until the model answers without tool calls.
    #[instrument(skip_all, fields(ask_id = %self.ask_id))]
    pub(crate) async fn run(&self) -> Result<String, AskError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.push(Message::user(&self.question));

        let tools = self.dispatcher.tools.specs();
        let mut rounds = 0;

        loop {
            let request = ModelRequest {
                messages: messages.clone(),
                tools: tools.clone(),
            };

            // The model is not trusted to observe the token itself.
            let response = tokio::select! {
                biased;
                () = self.token.cancelled() => return Err(self.cancelled()),
                response = self.model.generate(&request, &self.writer, &self.token) => response,
            };
            let response = match response {
                Ok(response) => response,
                Err(ModelError::Cancelled) => return Err(self.cancelled()),
                Err(err) if self.token.is_cancelled() => {
                    debug!(error = %err, "Model failed after interrupt");
                    return Err(self.cancelled());
                }
                Err(err) => return Err(err.into()),
            };

            if !response.has_tool_calls() {
                return Ok(response.content);
            }
            if rounds == self.max_tool_rounds {
                return Err(AskError::TooManyToolRounds(self.max_tool_rounds));
            }
            rounds += 1;

            debug!(round = rounds, calls = response.tool_calls.len(), "Model requested tools");
            messages.push(Message::assistant(
                response.content,
                response.tool_calls.clone(),
            ));

            // One call at a time, in the order the model asked for them.
            for call in &response.tool_calls {
                let outcome = self.dispatcher.dispatch(call).await;
                if outcome.is_cancelled() || self.token.is_cancelled() {
                    return Err(self.cancelled());
                }
                messages.push(outcome.into_message());
            }
        }
    }

    fn cancelled(&self) -> AskError {
        AskError::Cancelled(
            self.token
                .reason()
                .unwrap_or_else(|| "interrupted".to_string()),
        )
    }
}
