pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::messaging::QueueGateway;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<QueueGateway>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(gateway: Arc<QueueGateway>) -> Self {
        Self {
            gateway,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
