//! Single-flight controller for asks.
//!
//! The controller owns the model connection and runs at most one ask at a
//! time. An ask runs on its own tokio task; the caller gets an [`AskHandle`]
//! back immediately and may await it, drop it, or poll
//! [`AskController::last_result`] later.
//!
//! ```rust,ignore
//! let controller = AskController::builder(model)
//!     .tools(config.tool_set()?)
//!     .config(config.ask.clone())
//!     .approval(Arc::new(ApprovalService::from_config(&config.ask)))
//!     .build();
//!
//! let handle = controller.ask("What is in ~/notes.txt?")?;
//! let result = handle.wait().await?;
//! ```

mod dispatch;
mod session;
mod stream;


pub use dispatch::ToolCallOutcome;
pub use stream::{StreamBuffer, StreamWriter};

use crate::cancellation::CancellationToken;
use crate::config::AskConfig;
use crate::errors::{AskError, ConfigError, ErrorKind};
use crate::events::{EventSink, NoOpEventSink, ASK_COMPLETED, ASK_FAILED, ASK_INTERRUPTED, ASK_STARTED};
use crate::model::ChatModel;
use crate::tools::{ApprovalChannel, AutoDeny, ToolSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch::ToolDispatcher;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use session::AskSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Resolves environment-derived inputs before the first ask.
///
/// Placement, geometry and similar host concerns live behind this trait.
#[async_trait]
pub trait EnvironmentResolver: Send + Sync {
    /// Resolves the environment. Any error is fatal to startup.
    async fn resolve(&self) -> Result<(), ConfigError>;
}

/// The terminal state of the most recent ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastResult {
    /// The ask this result belongs to.
    pub ask_id: Uuid,
    /// The answer, or the partial output streamed before an interrupt or failure.
    pub content: String,
    /// Why the ask did not complete.
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<AskError>,
    /// When the ask was accepted.
    pub started_at: DateTime<Utc>,
    /// When the terminal state was recorded.
    pub finished_at: DateTime<Utc>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<AskError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serde_json::json!({
            "kind": err.kind().as_str(),
            "message": err.to_string(),
        })
        .serialize(serializer),
        None => serializer.serialize_none(),
    }
}

impl LastResult {
    /// Returns true if the ask produced an answer.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the ask was interrupted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(AskError::is_cancelled)
    }

    /// Returns the failure kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(AskError::kind)
    }
}

/// Handle to a running ask.
///
/// Dropping the handle does not cancel the ask.
#[derive(Debug)]
pub struct AskHandle {
    ask_id: Uuid,
    join: JoinHandle<LastResult>,
}

impl AskHandle {
    /// The id of the ask.
    #[must_use]
    pub fn ask_id(&self) -> Uuid {
        self.ask_id
    }

    /// Waits for the terminal state.
    pub async fn wait(self) -> Result<LastResult, AskError> {
        self.join
            .await
            .map_err(|e| AskError::Internal(format!("ask task ended abnormally: {e}")))
    }

    /// Returns true once the ask has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// The cancellation handle of the ask in flight.
///
/// Present exactly while the ask task holds the session lock.
#[derive(Debug)]
struct InFlight {
    ask_id: Uuid,
    token: Arc<CancellationToken>,
    /// Closes once the ask task has released the session.
    released: watch::Receiver<()>,
}

struct Inner {
    /// Held by the running ask task for its whole lifetime.
    session: Arc<tokio::sync::Mutex<()>>,
    current: Mutex<Option<InFlight>>,
    model: Mutex<Option<Arc<dyn ChatModel>>>,
    tools: RwLock<Arc<ToolSet>>,
    approval: Arc<dyn ApprovalChannel>,
    events: Arc<dyn EventSink>,
    config: AskConfig,
    stream: StreamBuffer,
    last_result: RwLock<Option<LastResult>>,
    closing: AtomicBool,
}

impl Inner {
    /// Clears the in-flight entry and releases the session in one step, so
    /// `ask` never observes a free session with a stale entry.
    fn release(&self, ask_id: Uuid, guard: OwnedMutexGuard<()>) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.ask_id == ask_id) {
            *current = None;
        }
        drop(guard);
    }

    /// Records the terminal state. Runs before exclusivity is released.
    async fn finish(
        &self,
        ask_id: Uuid,
        started_at: DateTime<Utc>,
        outcome: Result<String, AskError>,
    ) -> LastResult {
        let (content, error) = match outcome {
            Ok(content) => (content, None),
            Err(err) => (self.stream.snapshot(), Some(err)),
        };
        let result = LastResult {
            ask_id,
            content,
            error,
            started_at,
            finished_at: Utc::now(),
        };

        *self.last_result.write() = Some(result.clone());

        let duration_ms = (result.finished_at - started_at).num_milliseconds();
        match &result.error {
            None => {
                info!(ask_id = %ask_id, duration_ms, "Ask completed");
                self.events
                    .emit(
                        ASK_COMPLETED,
                        Some(serde_json::json!({
                            "ask_id": ask_id,
                            "content": result.content,
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
            }
            Some(err) if err.is_cancelled() => {
                info!(ask_id = %ask_id, duration_ms, reason = %err, "Ask interrupted");
                self.events
                    .emit(
                        ASK_INTERRUPTED,
                        Some(serde_json::json!({
                            "ask_id": ask_id,
                            "partial": result.content,
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
            }
            Some(err) => {
                warn!(ask_id = %ask_id, duration_ms, kind = %err.kind(), error = %err, "Ask failed");
                self.events
                    .emit(
                        ASK_FAILED,
                        Some(serde_json::json!({
                            "ask_id": ask_id,
                            "kind": err.kind().as_str(),
                            "message": err.to_string(),
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
            }
        }

        result
    }
}

/// Builder for [`AskController`].
pub struct AskControllerBuilder {
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    approval: Arc<dyn ApprovalChannel>,
    events: Arc<dyn EventSink>,
    config: AskConfig,
}

impl AskControllerBuilder {
    /// Sets the tools exposed to the model.
    #[must_use]
    pub fn tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the approval channel. Defaults to [`AutoDeny`].
    #[must_use]
    pub fn approval(mut self, approval: Arc<dyn ApprovalChannel>) -> Self {
        self.approval = approval;
        self
    }

    /// Sets the event sink. Defaults to [`NoOpEventSink`].
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the controller configuration.
    #[must_use]
    pub fn config(mut self, config: AskConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the controller.
    #[must_use]
    pub fn build(self) -> AskController {
        AskController {
            inner: Arc::new(Inner {
                session: Arc::new(tokio::sync::Mutex::new(())),
                current: Mutex::new(None),
                model: Mutex::new(Some(self.model)),
                tools: RwLock::new(Arc::new(self.tools)),
                approval: self.approval,
                events: self.events,
                config: self.config,
                stream: StreamBuffer::new(),
                last_result: RwLock::new(None),
                closing: AtomicBool::new(false),
            }),
        }
    }
}

/// Owns the model connection and serializes asks.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct AskController {
    inner: Arc<Inner>,
}

impl AskController {
    /// Starts building a controller around a model connection.
    #[must_use]
    pub fn builder(model: Arc<dyn ChatModel>) -> AskControllerBuilder {
        AskControllerBuilder {
            model,
            tools: ToolSet::default(),
            approval: Arc::new(AutoDeny),
            events: Arc::new(NoOpEventSink),
            config: AskConfig::default(),
        }
    }

    /// Resolves environment-derived inputs. Failures are fatal to the caller.
    pub async fn startup(&self, resolver: &dyn EnvironmentResolver) -> Result<(), AskError> {
        self.inner.config.validate()?;
        resolver.resolve().await?;
        info!(
            tools = self.inner.tools.read().len(),
            max_tool_rounds = self.inner.config.max_tool_rounds,
            "Ask controller started"
        );
        Ok(())
    }

    /// Starts an ask and returns immediately.
    ///
    /// Fails with [`AskError::Busy`] while another ask is in flight, leaving
    /// that ask untouched, and with [`AskError::ShutDown`] after shutdown.
    pub fn ask(&self, question: impl Into<String>) -> Result<AskHandle, AskError> {
        if self.inner.closing.load(Ordering::SeqCst) {
            return Err(AskError::ShutDown);
        }

        let ask_id = Uuid::new_v4();
        let token = Arc::new(CancellationToken::new());
        let (released_tx, released) = watch::channel(());

        // Taking the session and publishing the in-flight entry happen under
        // the `current` lock, so `interrupt` sees either both or neither.
        let (guard, model) = {
            let mut current = self.inner.current.lock();
            let guard = self
                .inner
                .session
                .clone()
                .try_lock_owned()
                .map_err(|_| AskError::Busy)?;
            // Shutdown may have started between the flag check and the lock.
            let model = match self.inner.model.lock().clone() {
                Some(model) if !self.inner.closing.load(Ordering::SeqCst) => model,
                _ => return Err(AskError::ShutDown),
            };
            *current = Some(InFlight {
                ask_id,
                token: token.clone(),
                released,
            });
            (guard, model)
        };

        let question = question.into();
        let started_at = Utc::now();
        let writer = self.inner.stream.begin(ask_id).with_events(self.inner.events.clone());
        let session = AskSession {
            ask_id,
            question,
            system_prompt: self.inner.config.system_prompt.clone(),
            max_tool_rounds: self.inner.config.max_tool_rounds,
            model,
            dispatcher: ToolDispatcher {
                ask_id,
                tools: self.inner.tools.read().clone(),
                approval: self.inner.approval.clone(),
                events: self.inner.events.clone(),
                token: token.clone(),
            },
            writer,
            token,
        };

        debug!(ask_id = %ask_id, "Ask accepted");
        self.inner.events.try_emit(
            ASK_STARTED,
            Some(serde_json::json!({"ask_id": ask_id, "question": session.question})),
        );

        let inner = self.inner.clone();
        let join = tokio::spawn(async move {
            let outcome = session.run().await;
            let result = inner.finish(ask_id, started_at, outcome).await;
            inner.release(ask_id, guard);
            drop(released_tx);
            result
        });

        Ok(AskHandle { ask_id, join })
    }

    /// Interrupts the ask in flight, if any.
    ///
    /// Returns once the interrupted ask has recorded its terminal state and
    /// released exclusivity. A no-op when idle, even if an ask starts while
    /// this call runs.
    pub async fn interrupt(&self) {
        let in_flight = self
            .inner
            .current
            .lock()
            .as_ref()
            .map(|c| (c.ask_id, c.token.clone(), c.released.clone()));
        let Some((ask_id, token, mut released)) = in_flight else {
            return;
        };

        if token.cancel("interrupted by user") {
            debug!(ask_id = %ask_id, "Interrupt requested");
        }
        // The sender is never used to send; `changed` errors once it is dropped.
        while released.changed().await.is_ok() {}
    }

    /// Interrupts any ask in flight and closes the model connection.
    ///
    /// Safe to call when no ask ever ran. Only the first call closes the
    /// model; later calls return immediately.
    pub async fn shutdown(&self) {
        if self.inner.closing.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already requested");
            return;
        }

        // Asks accepted from here on see `closing` while holding the session
        // and back out, so at most the ask interrupted below still runs.
        self.interrupt().await;
        let _session = self.inner.session.lock().await;
        let model = self.inner.model.lock().take();
        if let Some(model) = model {
            model.close().await;
            info!("Model connection closed");
        }
    }

    /// Returns the terminal state of the most recent ask.
    #[must_use]
    pub fn last_result(&self) -> Option<LastResult> {
        self.inner.last_result.read().clone()
    }

    /// Returns the output streamed so far by the current or most recent ask.
    #[must_use]
    pub fn stream_snapshot(&self) -> String {
        self.inner.stream.snapshot()
    }

    /// Returns true while an ask holds the session.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.session.try_lock().is_err()
    }

    /// Returns true once shutdown has been requested.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    /// The id of the ask in flight.
    #[must_use]
    pub fn current_ask(&self) -> Option<Uuid> {
        self.inner.current.lock().as_ref().map(|c| c.ask_id)
    }

    /// Replaces the tool set. Takes effect from the next ask.
    pub fn set_tools(&self, tools: ToolSet) {
        *self.inner.tools.write() = Arc::new(tools);
    }

    /// Returns the current tool set.
    #[must_use]
    pub fn tools(&self) -> Arc<ToolSet> {
        self.inner.tools.read().clone()
    }
}

impl std::fmt::Debug for AskController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskController")
            .field("busy", &self.is_busy())
            .field("current_ask", &self.current_ask())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
