//! Routing of model-requested tool calls to their handlers.

use crate::cancellation::CancellationToken;
use crate::errors::ToolError;
use crate::events::{
    EventSink, APPROVAL_DECIDED, APPROVAL_REQUESTED, TOOL_COMPLETED, TOOL_FAILED, TOOL_INVOKED,
};
use crate::model::{Message, ToolCallRequest};
use crate::tools::{ApprovalChannel, ApprovalDecision, PendingToolCall, ToolContext, ToolSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// The outcome of one tool call, as handed back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallOutcome {
    /// The call this answers.
    pub call_id: String,
    /// The requested tool name.
    pub name: String,
    /// The handler's JSON result or the failure.
    pub result: Result<String, ToolError>,
}

impl ToolCallOutcome {
    /// Returns the text fed back to the model.
    #[must_use]
    pub fn content(&self) -> String {
        match &self.result {
            Ok(json) => json.clone(),
            Err(err) => err.to_payload().to_string(),
        }
    }

    /// Renders the outcome as a tool message.
    #[must_use]
    pub fn into_message(self) -> Message {
        let content = self.content();
        Message::tool(self.call_id, content)
    }

    /// Returns true if the call was interrupted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.result, Err(ToolError::Cancelled))
    }
}

/// Dispatches tool calls for one ask.
pub(crate) struct ToolDispatcher {
    pub(crate) ask_id: Uuid,
    pub(crate) tools: Arc<ToolSet>,
    pub(crate) approval: Arc<dyn ApprovalChannel>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) token: Arc<CancellationToken>,
}

impl ToolDispatcher {
    /// Runs one tool call to completion, failure or cancellation.
    ///
    /// Never fails: every error becomes part of the outcome.
    pub(crate) async fn dispatch(&self, call: &ToolCallRequest) -> ToolCallOutcome {
        let result = self.run(call).await;

        match &result {
            Ok(_) => {
                debug!(ask_id = %self.ask_id, tool = %call.name, call_id = %call.id, "Tool completed");
                self.events
                    .emit(
                        TOOL_COMPLETED,
                        Some(serde_json::json!({
                            "ask_id": self.ask_id,
                            "call_id": call.id,
                            "tool": call.name,
                        })),
                    )
                    .await;
            }
            Err(err) => {
                warn!(
                    ask_id = %self.ask_id,
                    tool = %call.name,
                    call_id = %call.id,
                    kind = %err.kind(),
                    error = %err,
                    "Tool failed"
                );
                self.events
                    .emit(
                        TOOL_FAILED,
                        Some(serde_json::json!({
                            "ask_id": self.ask_id,
                            "call_id": call.id,
                            "tool": call.name,
                            "kind": err.kind().as_str(),
                            "message": err.to_string(),
                        })),
                    )
                    .await;
            }
        }

        ToolCallOutcome {
            call_id: call.id.clone(),
            name: call.name.clone(),
            result,
        }
    }

    async fn run(&self, call: &ToolCallRequest) -> Result<String, ToolError> {
        let Some(def) = self.tools.get(&call.name) else {
            return Err(ToolError::unknown_tool(&call.name));
        };

        self.events
            .emit(
                TOOL_INVOKED,
                Some(serde_json::json!({
                    "ask_id": self.ask_id,
                    "call_id": call.id,
                    "tool": call.name,
                    "needs_approval": def.needs_approval,
                })),
            )
            .await;

        if def.needs_approval {
            let decision = self.request_approval(call).await?;
            if !decision.is_approved() {
                return Err(ToolError::declined(&call.name));
            }
        }

        let ctx = ToolContext::new(self.ask_id, &call.id, self.token.clone());
        let output = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(ToolError::Cancelled),
            output = def.invoke(&ctx, &call.arguments) => output?,
        };

        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    async fn request_approval(&self, call: &ToolCallRequest) -> Result<ApprovalDecision, ToolError> {
        let pending = PendingToolCall {
            ask_id: self.ask_id,
            call_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        };
        self.events
            .emit(
                APPROVAL_REQUESTED,
                Some(serde_json::to_value(&pending).unwrap_or_default()),
            )
            .await;

        let decision = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(ToolError::Cancelled),
            decision = self.approval.decide(&pending) => decision,
        };

        debug!(ask_id = %self.ask_id, tool = %call.name, ?decision, "Approval decided");
        self.events
            .emit(
                APPROVAL_DECIDED,
                Some(serde_json::json!({
                    "ask_id": self.ask_id,
                    "call_id": call.id,
                    "tool": call.name,
                    "decision": decision,
                })),
            )
            .await;

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::testing::RecordingCommand;
    use crate::tools::{AutoApprove, AutoDeny, FunctionDefinition, MockApprovalChannel};
    use std::time::Duration;

    fn dispatcher(tools: ToolSet, approval: Arc<dyn ApprovalChannel>) -> (ToolDispatcher, Arc<CollectingEventSink>) {
        let events = Arc::new(CollectingEventSink::new());
        let dispatcher = ToolDispatcher {
            ask_id: Uuid::new_v4(),
            tools: Arc::new(tools),
            approval,
            events: events.clone(),
            token: Arc::new(CancellationToken::new()),
        };
        (dispatcher, events)
    }

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest::new("call_1", name, r#"{"x":1}"#)
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported() {
        let (dispatcher, events) = dispatcher(ToolSet::default(), Arc::new(AutoApprove));

        let outcome = dispatcher.dispatch(&call("__nope")).await;

        assert_eq!(outcome.result, Err(ToolError::unknown_tool("__nope")));
        let payload: serde_json::Value = serde_json::from_str(&outcome.content()).unwrap();
        assert_eq!(payload["error"]["kind"], "UnknownToolError");
        assert_eq!(events.event_types(), vec![TOOL_FAILED]);
    }

    #[tokio::test]
    async fn test_handler_receives_arguments() {
        let command = Arc::new(RecordingCommand::ok(r#"{"done":true}"#));
        let tools = ToolSet::new([FunctionDefinition::new("run", command.clone())]).unwrap();
        let (dispatcher, events) = dispatcher(tools, Arc::new(AutoDeny));

        let outcome = dispatcher.dispatch(&call("run")).await;

        assert_eq!(outcome.content(), r#"{"done":true}"#);
        assert_eq!(command.calls(), vec![r#"{"x":1}"#.to_string()]);
        assert_eq!(events.event_types(), vec![TOOL_INVOKED, TOOL_COMPLETED]);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_payload() {
        let command = Arc::new(RecordingCommand::failing(ToolError::missing("path")));
        let tools = ToolSet::new([FunctionDefinition::new("run", command)]).unwrap();
        let (dispatcher, _events) = dispatcher(tools, Arc::new(AutoApprove));

        let outcome = dispatcher.dispatch(&call("run")).await;

        let payload: serde_json::Value = serde_json::from_str(&outcome.content()).unwrap();
        assert_eq!(payload["error"]["kind"], "ArgumentError");
        assert_eq!(payload["error"]["message"], "missing parameter: 'path'");
    }

    #[tokio::test]
    async fn test_denied_call_never_runs_handler() {
        let command = Arc::new(RecordingCommand::ok("{}"));
        let def = FunctionDefinition::new("guarded", command.clone()).with_approval(true);
        let tools = ToolSet::new([def]).unwrap();

        let mut approval = MockApprovalChannel::new();
        approval
            .expect_decide()
            .withf(|pending| pending.name == "guarded" && pending.arguments == r#"{"x":1}"#)
            .times(1)
            .returning(|_| ApprovalDecision::Denied);
        let (dispatcher, events) = dispatcher(tools, Arc::new(approval));

        let outcome = dispatcher.dispatch(&call("guarded")).await;

        assert_eq!(outcome.result, Err(ToolError::declined("guarded")));
        assert_eq!(command.call_count(), 0);
        assert_eq!(
            events.event_types(),
            vec![TOOL_INVOKED, APPROVAL_REQUESTED, APPROVAL_DECIDED, TOOL_FAILED]
        );
    }

    #[tokio::test]
    async fn test_approved_call_runs_handler() {
        let command = Arc::new(RecordingCommand::ok("{}"));
        let def = FunctionDefinition::new("guarded", command.clone()).with_approval(true);
        let tools = ToolSet::new([def]).unwrap();

        let mut approval = MockApprovalChannel::new();
        approval
            .expect_decide()
            .times(1)
            .returning(|_| ApprovalDecision::Approved);
        let (dispatcher, _events) = dispatcher(tools, Arc::new(approval));

        let outcome = dispatcher.dispatch(&call("guarded")).await;

        assert!(outcome.result.is_ok());
        assert_eq!(command.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_during_approval_wait() {
        let command = Arc::new(RecordingCommand::ok("{}"));
        let def = FunctionDefinition::new("guarded", command.clone()).with_approval(true);
        let tools = ToolSet::new([def]).unwrap();
        let service = Arc::new(crate::tools::ApprovalService::new());
        let (dispatcher, _events) = dispatcher(tools, service.clone());

        let token = dispatcher.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel("interrupted");
        });

        let outcome = dispatcher.dispatch(&call("guarded")).await;

        assert!(outcome.is_cancelled());
        assert_eq!(command.call_count(), 0);
        assert_eq!(service.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_handler() {
        let command = Arc::new(RecordingCommand::ok("{}").with_delay(Duration::from_secs(30)));
        let tools = ToolSet::new([FunctionDefinition::new("slow", command)]).unwrap();
        let (dispatcher, _events) = dispatcher(tools, Arc::new(AutoApprove));

        let token = dispatcher.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel("interrupted");
        });

        let outcome = tokio::time::timeout(Duration::from_secs(5), dispatcher.dispatch(&call("slow")))
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn test_outcome_message() {
        let outcome = ToolCallOutcome {
            call_id: "c1".to_string(),
            name: "__getStats".to_string(),
            result: Ok(r#"{"size":3}"#.to_string()),
        };

        let msg = outcome.into_message();
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.content, r#"{"size":3}"#);
    }
}
