//! Builds adapters from configuration

use crate::messaging::config::QueueConfig;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::gateway::QueueGateway;
use crate::messaging::provider::ProviderIdentity;
use crate::messaging::rabbitmq::RabbitMqAdapter;
use crate::messaging::sqs::SqsAdapter;
use crate::messaging::traits::QueueAdapter;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub struct QueueFactory;

impl QueueFactory {
    /// Build one adapter per requested provider, SQS first, then RabbitMQ
    ///
    /// Unknown provider names are skipped with a warning; duplicates collapse.
    /// Must be called from within a Tokio runtime because the RabbitMQ adapter
    /// starts connecting immediately.
    pub fn create_adapters(config: &QueueConfig) -> MessagingResult<Vec<Arc<dyn QueueAdapter>>> {
        let requested = Self::requested_providers(&config.providers);

        let mut adapters: Vec<Arc<dyn QueueAdapter>> = Vec::with_capacity(requested.len());
        for provider in ProviderIdentity::ALL {
            if !requested.contains(&provider) {
                continue;
            }

            let adapter: Arc<dyn QueueAdapter> = match provider {
                ProviderIdentity::Sqs => Arc::new(SqsAdapter::new(&config.sqs)?),
                ProviderIdentity::RabbitMq => Arc::new(RabbitMqAdapter::new(config.rabbitmq.clone())),
            };
            info!(provider = %provider, "Queue adapter created");
            adapters.push(adapter);
        }

        if adapters.is_empty() {
            return Err(MessagingError::Configuration(
                "No valid queue provider specified".to_string(),
            ));
        }

        Ok(adapters)
    }

    /// Build the adapters and wrap them in a gateway
    pub fn create_gateway(config: &QueueConfig) -> MessagingResult<QueueGateway> {
        Ok(QueueGateway::new(Self::create_adapters(config)?))
    }

    fn requested_providers(names: &[String]) -> Vec<ProviderIdentity> {
        names
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| match ProviderIdentity::from_str(name) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    warn!(error = %e, "Ignoring queue provider");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_requested_providers_skips_unknown() {
        let requested = QueueFactory::requested_providers(&names(&["KAFKA", "rabbitmq"]));
        assert_eq!(requested, vec![ProviderIdentity::RabbitMq]);
    }

    #[test]
    fn test_requested_providers_splits_joined_entries() {
        let requested = QueueFactory::requested_providers(&names(&["RABBITMQ, SQS"]));
        assert_eq!(requested, vec![ProviderIdentity::RabbitMq, ProviderIdentity::Sqs]);
    }

    #[test]
    fn test_empty_provider_list_is_rejected() {
        let err = QueueFactory::create_adapters(&QueueConfig::default())
            .err()
            .expect("should fail");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("No valid queue provider specified"));
    }

    #[tokio::test]
    async fn test_adapters_follow_canonical_order() {
        let mut config = QueueConfig::default();
        config.providers = names(&["RABBITMQ", "SQS", "SQS"]);
        config.sqs.region = Some("us-east-1".to_string());
        config.sqs.access_key_id = Some("AKIA".to_string());
        config.sqs.secret_access_key = Some("secret".to_string());
        config.sqs.queue_name = Some("orders".to_string());
        config.rabbitmq.url = "amqp://127.0.0.1:1".to_string();

        let adapters = QueueFactory::create_adapters(&config).unwrap();
        let providers: Vec<_> = adapters.iter().map(|a| a.provider()).collect();
        assert_eq!(providers, vec![ProviderIdentity::Sqs, ProviderIdentity::RabbitMq]);

        for adapter in adapters {
            adapter.shutdown().await.unwrap();
        }
    }

    #[test]
    fn test_sqs_configuration_error_propagates() {
        let mut config = QueueConfig::default();
        config.providers = names(&["SQS"]);

        let err = QueueFactory::create_adapters(&config).err().expect("should fail");
        assert!(err.is_configuration());
    }
}
