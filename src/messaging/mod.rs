//! Unified message queue layer
//!
//! Callers publish to and subscribe from several backends through one
//! contract, regardless of whether the backend is pulled (Amazon SQS) or
//! pushes deliveries (RabbitMQ).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 QueueGateway                     │
//! ├─────────────────────────────────────────────────┤
//! │  - publish(message, queues)   fan-out            │
//! │  - subscribe(queues)          fan-in             │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │            QueueAdapter trait                    │
//! └─────────────────────────────────────────────────┘
//!           │                        │
//!           ▼                        ▼
//! ┌──────────────────┐    ┌──────────────────┐
//! │   SqsAdapter     │    │ RabbitMqAdapter  │
//! ├──────────────────┤    ├──────────────────┤
//! │ - Long polling   │    │ - Push consumer  │
//! │ - Delete on read │    │ - Local buffer   │
//! │ - Lazy queue URL │    │ - Auto reconnect │
//! └──────────────────┘    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use queue_gateway::messaging::{ProviderIdentity, QueueConfig, QueueFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = QueueConfig::default();
//!     config.providers = vec!["RABBITMQ".to_string()];
//!
//!     let gateway = QueueFactory::create_gateway(&config)?;
//!     gateway.publish("hello", &[ProviderIdentity::RabbitMq]).await;
//!
//!     let messages = gateway.subscribe(&[]).await;
//!     println!("{:?}", messages);
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

mod buffer;
mod config;
mod error;
mod factory;
mod gateway;
mod provider;
pub mod rabbitmq;
pub mod sqs;
mod traits;

pub use buffer::MessageBuffer;
pub use config::{
    QueueConfig, RabbitMqConfig, SqsConfig, RABBITMQ_BUFFER_CAPACITY, RABBITMQ_RETRY_INTERVAL_MS,
    SQS_MAX_NUMBER_OF_MESSAGES, SQS_MAX_NUMBER_OF_MESSAGES_RANGE, SQS_WAIT_TIME_SECONDS,
    SQS_WAIT_TIME_SECONDS_RANGE,
};
pub use error::{MessagingError, MessagingResult};
pub use factory::QueueFactory;
pub use gateway::QueueGateway;
pub use provider::{parse_provider_list, ProviderIdentity, UnknownProvider};
pub use rabbitmq::{ConnectionState, RabbitMqAdapter};
pub use sqs::{SqsAdapter, SqsApi};
pub use traits::QueueAdapter;
