//! Approval gate for tool calls that need user consent.

use crate::config::AskConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// A tool call waiting for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToolCall {
    /// The ask the call belongs to.
    pub ask_id: Uuid,
    /// The model-assigned call id.
    pub call_id: String,
    /// The tool name.
    pub name: String,
    /// The raw JSON arguments.
    pub arguments: String,
}

/// The user's answer to a pending tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Run the tool.
    Approved,
    /// Do not run the tool.
    Denied,
}

impl ApprovalDecision {
    /// Returns true if the call may run.
    #[must_use]
    pub fn is_approved(self) -> bool {
        self == Self::Approved
    }
}

/// Asks the user whether a tool call may run.
///
/// Implementations may wait indefinitely; the controller races the decision
/// against the ask's cancellation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    /// Returns the decision for the given call.
    async fn decide(&self, call: &PendingToolCall) -> ApprovalDecision;
}

/// Approves every call. For headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalChannel for AutoApprove {
    async fn decide(&self, _call: &PendingToolCall) -> ApprovalDecision {
        ApprovalDecision::Approved
    }
}

/// Denies every call. The default when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDeny;

#[async_trait]
impl ApprovalChannel for AutoDeny {
    async fn decide(&self, _call: &PendingToolCall) -> ApprovalDecision {
        ApprovalDecision::Denied
    }
}

/// An approval request held by the service.
#[derive(Debug)]
struct ApprovalRequest {
    /// The call waiting for a decision.
    call: PendingToolCall,
    /// When the request was created.
    created_at: Instant,
    /// Response channel.
    response_tx: Option<oneshot::Sender<ApprovalDecision>>,
}

/// UI-facing approval channel.
///
/// Pending calls are kept until the UI answers with [`ApprovalService::approve`]
/// or [`ApprovalService::deny`], the optional timeout elapses, or the waiting
/// ask is interrupted.
#[derive(Default)]
pub struct ApprovalService {
    /// Pending requests.
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
    /// Deny after this long; `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl ApprovalService {
    /// Creates a new approval service that waits indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service using the configured approval timeout.
    #[must_use]
    pub fn from_config(config: &AskConfig) -> Self {
        Self::new().with_timeout(config.approval_timeout())
    }

    /// Sets a timeout after which pending calls are denied.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Approves a pending request.
    pub fn approve(&self, request_id: Uuid) -> bool {
        self.respond(request_id, ApprovalDecision::Approved)
    }

    /// Denies a pending request.
    pub fn deny(&self, request_id: Uuid) -> bool {
        self.respond(request_id, ApprovalDecision::Denied)
    }

    fn respond(&self, request_id: Uuid, decision: ApprovalDecision) -> bool {
        if let Some(mut request) = self.requests.write().remove(&request_id) {
            if let Some(tx) = request.response_tx.take() {
                debug!(
                    request_id = %request_id,
                    tool = %request.call.name,
                    waited_ms = request.created_at.elapsed().as_millis() as u64,
                    ?decision,
                    "Approval decided"
                );
                return tx.send(decision).is_ok();
            }
        }
        false
    }

    /// Returns the number of pending requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Lists pending requests with their ids.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<(Uuid, PendingToolCall)> {
        self.requests
            .read()
            .iter()
            .map(|(id, request)| (*id, request.call.clone()))
            .collect()
    }
}

/// Removes the request when the waiting future completes or is dropped.
struct RequestGuard<'a> {
    service: &'a ApprovalService,
    id: Uuid,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.service.requests.write().remove(&self.id);
    }
}

#[async_trait]
impl ApprovalChannel for ApprovalService {
    async fn decide(&self, call: &PendingToolCall) -> ApprovalDecision {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        self.requests.write().insert(
            request_id,
            ApprovalRequest {
                call: call.clone(),
                created_at: Instant::now(),
                response_tx: Some(tx),
            },
        );
        let _guard = RequestGuard {
            service: self,
            id: request_id,
        };

        let outcome = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, rx).await.ok(),
            None => Some(rx.await),
        };

        match outcome {
            Some(Ok(decision)) => decision,
            Some(Err(_)) => {
                warn!(tool = %call.name, "Approval channel closed, denying");
                ApprovalDecision::Denied
            }
            None => {
                warn!(tool = %call.name, "Approval timed out, denying");
                ApprovalDecision::Denied
            }
        }
    }
}

impl std::fmt::Debug for ApprovalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalService")
            .field("pending_count", &self.pending_count())
            .field("timeout", &self.timeout)
            .finish()
    }
}
