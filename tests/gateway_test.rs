//! Integration tests for the queue gateway and factory

mod common;

use common::{gateway_of, Fault, FaultyAdapter, InMemoryAdapter};
use queue_gateway::messaging::{ProviderIdentity, QueueAdapter, QueueConfig, QueueFactory};
use std::sync::Arc;

/// Publishing to all queues reaches every healthy adapter
#[tokio::test]
async fn test_publish_fans_out_to_all_adapters() {
    let sqs = InMemoryAdapter::new(ProviderIdentity::Sqs);
    let rabbit = InMemoryAdapter::new(ProviderIdentity::RabbitMq);
    let gateway = gateway_of(vec![sqs.clone(), rabbit.clone()]);

    gateway.publish("hello", &[]).await;

    assert_eq!(sqs.published(), vec!["hello"]);
    assert_eq!(rabbit.published(), vec!["hello"]);
}

/// Only the named provider receives the message
#[tokio::test]
async fn test_publish_respects_selection() {
    let sqs = InMemoryAdapter::new(ProviderIdentity::Sqs);
    let rabbit = InMemoryAdapter::new(ProviderIdentity::RabbitMq);
    let gateway = gateway_of(vec![sqs.clone(), rabbit.clone()]);

    gateway.publish("only-rabbit", &[ProviderIdentity::RabbitMq]).await;

    assert!(sqs.published().is_empty());
    assert_eq!(rabbit.published(), vec!["only-rabbit"]);
}

/// A selection naming a provider the gateway does not hold is a no-op
#[tokio::test]
async fn test_publish_to_unheld_provider_is_noop() {
    let sqs = InMemoryAdapter::new(ProviderIdentity::Sqs);
    let gateway = gateway_of(vec![sqs.clone()]);

    gateway.publish("nowhere", &[ProviderIdentity::RabbitMq]).await;
    assert!(sqs.published().is_empty());
    assert!(gateway.subscribe(&[ProviderIdentity::RabbitMq]).await.is_empty());
}

/// A failing adapter does not stop the others
#[tokio::test]
async fn test_publish_isolates_adapter_errors() {
    let faulty = FaultyAdapter::new(ProviderIdentity::Sqs, Fault::Error);
    let rabbit = InMemoryAdapter::new(ProviderIdentity::RabbitMq);
    let gateway = gateway_of(vec![faulty.clone(), rabbit.clone()]);

    gateway.publish("survives", &[]).await;

    assert_eq!(faulty.calls(), 1);
    assert_eq!(rabbit.published(), vec!["survives"]);
}

/// A panicking adapter does not stop the others
#[tokio::test]
async fn test_publish_isolates_adapter_panics() {
    let faulty = FaultyAdapter::new(ProviderIdentity::Sqs, Fault::Panic);
    let rabbit = InMemoryAdapter::new(ProviderIdentity::RabbitMq);
    let gateway = gateway_of(vec![faulty.clone(), rabbit.clone()]);

    gateway.publish("survives", &[]).await;

    assert_eq!(rabbit.published(), vec!["survives"]);
}

/// Fan-in concatenates in gateway order
#[tokio::test]
async fn test_subscribe_concatenates_in_order() {
    let sqs = InMemoryAdapter::with_messages(ProviderIdentity::Sqs, &["a1", "a2"]);
    let rabbit = InMemoryAdapter::with_messages(ProviderIdentity::RabbitMq, &["b1"]);
    let gateway = gateway_of(vec![sqs, rabbit]);

    assert_eq!(gateway.subscribe(&[]).await, vec!["a1", "a2", "b1"]);
    assert!(gateway.subscribe(&[]).await.is_empty());
}

/// Faulting adapters contribute nothing to fan-in
#[tokio::test]
async fn test_subscribe_skips_faulting_adapters() {
    let erroring = FaultyAdapter::new(ProviderIdentity::Sqs, Fault::Error);
    let rabbit = InMemoryAdapter::with_messages(ProviderIdentity::RabbitMq, &["b1"]);
    assert_eq!(
        gateway_of(vec![erroring, rabbit]).subscribe(&[]).await,
        vec!["b1"]
    );

    let panicking = FaultyAdapter::new(ProviderIdentity::RabbitMq, Fault::Panic);
    let sqs = InMemoryAdapter::with_messages(ProviderIdentity::Sqs, &["a1"]);
    assert_eq!(
        gateway_of(vec![sqs, panicking]).subscribe(&[]).await,
        vec!["a1"]
    );
}

/// Shutdown reaches every adapter even when one fails
#[tokio::test]
async fn test_shutdown_runs_all_hooks() {
    let faulty = FaultyAdapter::new(ProviderIdentity::Sqs, Fault::Error);
    let rabbit = InMemoryAdapter::new(ProviderIdentity::RabbitMq);
    let gateway = gateway_of(vec![faulty.clone(), rabbit.clone()]);

    gateway.shutdown().await;

    assert_eq!(faulty.calls(), 1);
    assert_eq!(rabbit.shutdowns(), 1);
}

/// Empty and unrecognized provider lists are rejected
#[test]
fn test_factory_rejects_missing_providers() {
    let empty = QueueConfig::default();
    assert!(QueueFactory::create_adapters(&empty)
        .err()
        .expect("empty list must fail")
        .is_configuration());

    let mut unknown = QueueConfig::default();
    unknown.providers = vec!["KAFKA".to_string(), "REDIS".to_string()];
    assert!(QueueFactory::create_adapters(&unknown)
        .err()
        .expect("unknown providers must fail")
        .is_configuration());
}

/// One adapter per recognized distinct identity
#[tokio::test]
async fn test_factory_builds_recognized_providers() {
    let mut config = QueueConfig::default();
    config.providers = vec![
        "RABBITMQ".to_string(),
        "KAFKA".to_string(),
        "rabbitmq".to_string(),
    ];
    config.rabbitmq.url = "amqp://127.0.0.1:1".to_string();

    let gateway = QueueFactory::create_gateway(&config).expect("RabbitMQ is valid");
    assert_eq!(gateway.len(), 1);
    assert_eq!(gateway.providers(), vec![ProviderIdentity::RabbitMq]);

    // Never connected: publish is a silent no-op and subscribe is empty
    gateway.publish("dropped", &[]).await;
    assert!(gateway.subscribe(&[]).await.is_empty());

    gateway.shutdown().await;
}

/// Adapters are usable through the trait object alone
#[tokio::test]
async fn test_adapter_trait_objects() {
    let adapter: Arc<dyn QueueAdapter> = InMemoryAdapter::new(ProviderIdentity::Sqs);
    adapter.publish("x").await.unwrap();
    assert_eq!(adapter.subscribe().await.unwrap(), vec!["x"]);
    assert!(adapter.subscribe().await.unwrap().is_empty());
}
