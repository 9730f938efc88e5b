//! Messaging trait abstractions

use crate::messaging::error::MessagingResult;
use crate::messaging::provider::ProviderIdentity;
use async_trait::async_trait;

/// Publish/subscribe contract implemented once per backend
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Identity used to select this adapter for an operation
    fn provider(&self) -> ProviderIdentity;

    /// Send one message to the backend
    ///
    /// Must not block indefinitely; backend timeouts apply.
    async fn publish(&self, message: &str) -> MessagingResult<()>;

    /// Retrieve the messages currently available
    ///
    /// Returned messages are consumed: the same adapter instance never
    /// hands them out twice.
    async fn subscribe(&self) -> MessagingResult<Vec<String>>;

    /// Release backend resources
    async fn shutdown(&self) -> MessagingResult<()> {
        Ok(())
    }
}
