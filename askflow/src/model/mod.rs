//! Boundary to the conversational model.
//!
//! The provider wire protocol lives outside this crate. A provider adapter
//! implements [`ChatModel`] and translates these types to and from its own
//! request format.

mod message;

pub use message::{Message, ModelRequest, ModelResponse, Role, ToolCallRequest};

use crate::cancellation::CancellationToken;
use crate::controller::StreamWriter;
use crate::errors::ModelError;
use async_trait::async_trait;

/// A live model connection.
///
/// One connection is owned by the controller and reused across asks until
/// shutdown, when [`ChatModel::close`] is called exactly once.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Runs one model turn.
    ///
    /// Partial output should be pushed to `stream` as it arrives. When
    /// `cancel` fires the call should return [`ModelError::Cancelled`]
    /// promptly; the controller does not wait for it either way.
    async fn generate(
        &self,
        request: &ModelRequest,
        stream: &StreamWriter,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, ModelError>;

    /// Releases the connection.
    async fn close(&self) {}
}
