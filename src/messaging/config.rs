//! Messaging configuration

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Maximum messages requested per SQS receive call
pub const SQS_MAX_NUMBER_OF_MESSAGES: i32 = 5;
/// Long-poll wait for SQS receive calls, in seconds
pub const SQS_WAIT_TIME_SECONDS: i32 = 10;
/// Values SQS accepts for `MaxNumberOfMessages`
pub const SQS_MAX_NUMBER_OF_MESSAGES_RANGE: RangeInclusive<i32> = 1..=10;
/// Values SQS accepts for `WaitTimeSeconds`
pub const SQS_WAIT_TIME_SECONDS_RANGE: RangeInclusive<i32> = 0..=20;

/// Queue attributes used when the SQS queue has to be created
pub const SQS_DELAY_SECONDS: &str = "0";
pub const SQS_MESSAGE_RETENTION_PERIOD_SECONDS: &str = "86400"; // 1 day
pub const SQS_VISIBILITY_TIMEOUT_SECONDS: &str = "30";

/// Capacity of the RabbitMQ local buffer
pub const RABBITMQ_BUFFER_CAPACITY: usize = 100;
/// Fixed delay between RabbitMQ connection attempts
pub const RABBITMQ_RETRY_INTERVAL_MS: u64 = 5000;

/// SQS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqsConfig {
    /// AWS region
    #[serde(default)]
    pub region: Option<String>,

    /// AWS access key id
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// AWS secret access key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Queue name, resolved to a URL on first use
    #[serde(default)]
    pub queue_name: Option<String>,

    /// Custom endpoint (LocalStack, ElasticMQ)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Messages per receive call
    #[serde(default = "default_sqs_max_messages")]
    pub max_messages: i32,

    /// Long-poll wait in seconds
    #[serde(default = "default_sqs_wait_time")]
    pub wait_time_secs: i32,
}

impl Default for SqsConfig {
    fn default() -> Self {
        Self {
            region: None,
            access_key_id: None,
            secret_access_key: None,
            queue_name: None,
            endpoint: None,
            max_messages: default_sqs_max_messages(),
            wait_time_secs: default_sqs_wait_time(),
        }
    }
}

/// RabbitMQ configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitMqConfig {
    /// AMQP connection URL
    #[serde(default = "default_rabbitmq_url")]
    pub url: String,

    /// Queue to publish to and consume from
    #[serde(default = "default_rabbitmq_queue")]
    pub queue: String,

    /// Connection name shown in the management UI
    #[serde(default = "default_connection_name")]
    pub connection_name: String,

    /// Local buffer capacity
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Delay between connection attempts in milliseconds
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

impl Default for RabbitMqConfig {
    fn default() -> Self {
        Self {
            url: default_rabbitmq_url(),
            queue: default_rabbitmq_queue(),
            connection_name: default_connection_name(),
            buffer_capacity: default_buffer_capacity(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

impl RabbitMqConfig {
    /// Retry interval as a duration
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Connection URL with credentials stripped, for logging
    pub fn url_redacted(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}***{}", &self.url[..scheme_end + 3], &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }
}

/// Queue gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Requested providers, e.g. `["SQS", "RABBITMQ"]`
    #[serde(default)]
    pub providers: Vec<String>,

    /// SQS configuration
    #[serde(default)]
    pub sqs: SqsConfig,

    /// RabbitMQ configuration
    #[serde(default)]
    pub rabbitmq: RabbitMqConfig,
}

fn default_sqs_max_messages() -> i32 {
    SQS_MAX_NUMBER_OF_MESSAGES
}

fn default_sqs_wait_time() -> i32 {
    SQS_WAIT_TIME_SECONDS
}

fn default_rabbitmq_url() -> String {
    "amqp://localhost".to_string()
}

fn default_rabbitmq_queue() -> String {
    "rabbitmq_queue".to_string()
}

fn default_connection_name() -> String {
    "queue-gateway".to_string()
}

fn default_buffer_capacity() -> usize {
    RABBITMQ_BUFFER_CAPACITY
}

fn default_retry_interval_ms() -> u64 {
    RABBITMQ_RETRY_INTERVAL_MS
}
