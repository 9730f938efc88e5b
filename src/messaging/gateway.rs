//! Composite gateway over several queue adapters
//!
//! Every publish and subscribe is dispatched to the selected adapters
//! concurrently, one task per adapter. The gateway is a failure boundary: an
//! adapter that returns an error or panics is logged and skipped, and callers
//! never see the fault.

use crate::messaging::provider::ProviderIdentity;
use crate::messaging::traits::QueueAdapter;
use crate::metrics::{
    MESSAGES_PUBLISHED_TOTAL, MESSAGES_RECEIVED_TOTAL, PUBLISH_DURATION_SECONDS,
    PUBLISH_FAILURES_TOTAL, SUBSCRIBE_FAILURES_TOTAL,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Routes operations to an ordered set of adapters
pub struct QueueGateway {
    adapters: Vec<Arc<dyn QueueAdapter>>,
}

impl QueueGateway {
    /// Wrap adapters, keeping their order for fan-in concatenation
    pub fn new(adapters: Vec<Arc<dyn QueueAdapter>>) -> Self {
        Self { adapters }
    }

    /// Adapters matching `queues`, in gateway order; an empty filter selects all
    pub fn select_adapters(&self, queues: &[ProviderIdentity]) -> Vec<Arc<dyn QueueAdapter>> {
        self.adapters
            .iter()
            .filter(|adapter| queues.is_empty() || queues.contains(&adapter.provider()))
            .cloned()
            .collect()
    }

    /// Identities of the held adapters
    pub fn providers(&self) -> Vec<ProviderIdentity> {
        self.adapters.iter().map(|a| a.provider()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Publish `message` to every selected adapter
    ///
    /// Completes once every adapter has finished; per-adapter failures are
    /// only logged.
    #[instrument(skip_all, fields(queues = ?queues))]
    pub async fn publish(&self, message: &str, queues: &[ProviderIdentity]) {
        let selected = self.select_adapters(queues);
        if selected.is_empty() {
            warn!("No queue adapter matched the publish request");
            return;
        }

        let tasks = selected.into_iter().map(|adapter| {
            let provider = adapter.provider();
            let message = message.to_string();
            let handle = tokio::spawn(async move {
                let started = Instant::now();
                let result = adapter.publish(&message).await;
                PUBLISH_DURATION_SECONDS
                    .with_label_values(&[provider.as_str()])
                    .observe(started.elapsed().as_secs_f64());
                result
            });
            async move { (provider, handle.await) }
        });

        for (provider, outcome) in join_all(tasks).await {
            match outcome {
                Ok(Ok(())) => {
                    MESSAGES_PUBLISHED_TOTAL
                        .with_label_values(&[provider.as_str()])
                        .inc();
                }
                Ok(Err(e)) => {
                    PUBLISH_FAILURES_TOTAL.with_label_values(&[provider.as_str()]).inc();
                    error!(provider = %provider, error = %e, "Error publishing message");
                }
                Err(e) => {
                    PUBLISH_FAILURES_TOTAL.with_label_values(&[provider.as_str()]).inc();
                    error!(provider = %provider, error = %e, "Publish task failed");
                }
            }
        }
    }

    /// Collect messages from every selected adapter
    ///
    /// Results are concatenated in gateway order; a faulting adapter
    /// contributes nothing.
    #[instrument(skip_all, fields(queues = ?queues))]
    pub async fn subscribe(&self, queues: &[ProviderIdentity]) -> Vec<String> {
        let selected = self.select_adapters(queues);

        let tasks = selected.into_iter().map(|adapter| {
            let provider = adapter.provider();
            let handle = tokio::spawn(async move { adapter.subscribe().await });
            async move { (provider, handle.await) }
        });

        let mut messages = Vec::new();
        for (provider, outcome) in join_all(tasks).await {
            match outcome {
                Ok(Ok(received)) => {
                    MESSAGES_RECEIVED_TOTAL
                        .with_label_values(&[provider.as_str()])
                        .inc_by(received.len() as f64);
                    messages.extend(received);
                }
                Ok(Err(e)) => {
                    SUBSCRIBE_FAILURES_TOTAL.with_label_values(&[provider.as_str()]).inc();
                    error!(provider = %provider, error = %e, "Error subscribing to messages");
                }
                Err(e) => {
                    SUBSCRIBE_FAILURES_TOTAL.with_label_values(&[provider.as_str()]).inc();
                    error!(provider = %provider, error = %e, "Subscribe task failed");
                }
            }
        }

        messages
    }

    /// Run every adapter's teardown hook
    pub async fn shutdown(&self) {
        for adapter in &self.adapters {
            let provider = adapter.provider();
            match adapter.shutdown().await {
                Ok(()) => info!(provider = %provider, "Queue adapter shut down"),
                Err(e) => error!(provider = %provider, error = %e, "Error shutting down queue adapter"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::error::MessagingResult;
    use async_trait::async_trait;

    struct StaticAdapter {
        provider: ProviderIdentity,
        inbox: Vec<&'static str>,
    }

    #[async_trait]
    impl QueueAdapter for StaticAdapter {
        fn provider(&self) -> ProviderIdentity {
            self.provider
        }

        async fn publish(&self, _message: &str) -> MessagingResult<()> {
            Ok(())
        }

        async fn subscribe(&self) -> MessagingResult<Vec<String>> {
            Ok(self.inbox.iter().map(|m| m.to_string()).collect())
        }
    }

    fn gateway() -> QueueGateway {
        QueueGateway::new(vec![
            Arc::new(StaticAdapter {
                provider: ProviderIdentity::Sqs,
                inbox: vec!["a1", "a2"],
            }),
            Arc::new(StaticAdapter {
                provider: ProviderIdentity::RabbitMq,
                inbox: vec!["b1"],
            }),
        ])
    }

    #[test]
    fn test_empty_selection_returns_all_in_order() {
        let gateway = gateway();
        let selected: Vec<_> = gateway.select_adapters(&[]).iter().map(|a| a.provider()).collect();
        assert_eq!(selected, vec![ProviderIdentity::Sqs, ProviderIdentity::RabbitMq]);
    }

    #[test]
    fn test_selection_filters_by_identity() {
        let gateway = gateway();
        let selected = gateway.select_adapters(&[ProviderIdentity::RabbitMq]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].provider(), ProviderIdentity::RabbitMq);

        let only_sqs = QueueGateway::new(vec![Arc::new(StaticAdapter {
            provider: ProviderIdentity::Sqs,
            inbox: vec![],
        })]);
        assert!(only_sqs.select_adapters(&[ProviderIdentity::RabbitMq]).is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_concatenates_in_gateway_order() {
        let gateway = gateway();
        assert_eq!(gateway.subscribe(&[]).await, vec!["a1", "a2", "b1"]);
        assert_eq!(gateway.subscribe(&[ProviderIdentity::RabbitMq]).await, vec!["b1"]);
    }

    #[test]
    fn test_providers() {
        assert_eq!(
            gateway().providers(),
            vec![ProviderIdentity::Sqs, ProviderIdentity::RabbitMq]
        );
        assert_eq!(gateway().len(), 2);
    }
}
