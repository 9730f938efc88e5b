//! Amazon SQS adapter (pull model)
//!
//! The queue URL is resolved once, on first use, and cached for the lifetime
//! of the adapter. Messages are deleted from SQS before they are returned to
//! the caller (commit-on-read). A failed delete is logged and the message is
//! still returned, so SQS may redeliver it after the visibility timeout.

use crate::messaging::config::{
    SqsConfig, SQS_DELAY_SECONDS, SQS_MAX_NUMBER_OF_MESSAGES_RANGE,
    SQS_MESSAGE_RETENTION_PERIOD_SECONDS, SQS_VISIBILITY_TIMEOUT_SECONDS,
    SQS_WAIT_TIME_SECONDS_RANGE,
};
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::provider::ProviderIdentity;
use crate::messaging::traits::QueueAdapter;
use async_trait::async_trait;
use aws_sdk_sqs::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// A message as returned by a receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub body: String,
    pub receipt_handle: Option<String>,
}

/// Attributes applied when the queue has to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAttributes {
    pub delay_seconds: String,
    pub message_retention_period: String,
    pub visibility_timeout: String,
}

impl Default for QueueAttributes {
    fn default() -> Self {
        Self {
            delay_seconds: SQS_DELAY_SECONDS.to_string(),
            message_retention_period: SQS_MESSAGE_RETENTION_PERIOD_SECONDS.to_string(),
            visibility_timeout: SQS_VISIBILITY_TIMEOUT_SECONDS.to_string(),
        }
    }
}

/// The subset of the SQS API the adapter relies on
///
/// `get_queue_url` must report a missing queue as
/// [`MessagingError::QueueNotFound`] so the adapter knows to create it.
#[async_trait]
pub trait SqsApi: Send + Sync {
    async fn get_queue_url(&self, queue_name: &str) -> MessagingResult<String>;

    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: &QueueAttributes,
    ) -> MessagingResult<String>;

    async fn send_message(&self, queue_url: &str, body: &str) -> MessagingResult<()>;

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_time_secs: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> MessagingResult<()>;
}

/// [`SqsApi`] backed by the official AWS SDK
pub struct AwsSqsApi {
    client: Client,
}

impl AwsSqsApi {
    /// Build a client from explicit credentials; no network I/O happens here
    pub fn new(region: &str, access_key_id: &str, secret_access_key: &str, endpoint: Option<&str>) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "queue-gateway",
        );

        let mut builder = aws_sdk_sqs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl SqsApi for AwsSqsApi {
    async fn get_queue_url(&self, queue_name: &str) -> MessagingResult<String> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_queue_does_not_exist())
                    .unwrap_or(false);
                if missing {
                    MessagingError::QueueNotFound(queue_name.to_string())
                } else {
                    MessagingError::ConnectionFailed(DisplayErrorContext(&e).to_string())
                }
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| MessagingError::Internal("GetQueueUrl returned no URL".to_string()))
    }

    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: &QueueAttributes,
    ) -> MessagingResult<String> {
        let output = self
            .client
            .create_queue()
            .queue_name(queue_name)
            .attributes(QueueAttributeName::DelaySeconds, &attributes.delay_seconds)
            .attributes(
                QueueAttributeName::MessageRetentionPeriod,
                &attributes.message_retention_period,
            )
            .attributes(QueueAttributeName::VisibilityTimeout, &attributes.visibility_timeout)
            .send()
            .await
            .map_err(|e| MessagingError::QueueCreationFailed {
                queue: queue_name.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| MessagingError::Internal("CreateQueue returned no URL".to_string()))
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> MessagingResult<()> {
        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| MessagingError::PublishFailed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_time_secs: i32,
    ) -> MessagingResult<Vec<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_secs)
            .send()
            .await
            .map_err(|e| MessagingError::ReceiveFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .messages()
            .iter()
            .map(|m| ReceivedMessage {
                body: m.body().unwrap_or_default().to_string(),
                receipt_handle: m.receipt_handle().map(str::to_string),
            })
            .collect())
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> MessagingResult<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| MessagingError::DeleteFailed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

/// Outcome of the one-time queue resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueResolution {
    /// Queue URL to address every call to
    Ready(String),
    /// Lookup or creation failed; the adapter stays inert until restart
    Abandoned,
}

/// SQS adapter
pub struct SqsAdapter {
    api: Arc<dyn SqsApi>,
    queue_name: String,
    max_messages: i32,
    wait_time_secs: i32,
    queue: OnceCell<QueueResolution>,
}

impl SqsAdapter {
    /// Create an adapter talking to AWS
    ///
    /// Fails when region, credentials or queue name are missing, or when the
    /// receive limits fall outside what SQS accepts.
    pub fn new(config: &SqsConfig) -> MessagingResult<Self> {
        let (region, access_key_id, secret_access_key) = match (
            non_empty(&config.region),
            non_empty(&config.access_key_id),
            non_empty(&config.secret_access_key),
        ) {
            (Some(r), Some(k), Some(s)) => (r, k, s),
            _ => {
                return Err(MessagingError::Configuration(
                    "Missing AWS configuration: region, access key id and secret access key are required"
                        .to_string(),
                ))
            }
        };
        let queue_name = non_empty(&config.queue_name).ok_or_else(|| {
            MessagingError::Configuration("SQS queue name is not defined".to_string())
        })?;
        check_receive_limits(config)?;

        let api = AwsSqsApi::new(region, access_key_id, secret_access_key, config.endpoint.as_deref());

        info!(
            region = %region,
            queue = %queue_name,
            endpoint = ?config.endpoint,
            "SQS adapter configured"
        );

        Ok(Self::with_api(Arc::new(api), queue_name, config))
    }

    /// Create an adapter over any [`SqsApi`] implementation
    pub fn with_api(api: Arc<dyn SqsApi>, queue_name: impl Into<String>, config: &SqsConfig) -> Self {
        Self {
            api,
            queue_name: queue_name.into(),
            max_messages: config.max_messages,
            wait_time_secs: config.wait_time_secs,
            queue: OnceCell::new(),
        }
    }

    /// Configured queue name
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Resolution outcome, `None` while nothing has triggered it yet
    pub fn resolution(&self) -> Option<&QueueResolution> {
        self.queue.get()
    }

    /// Resolve the queue URL, at most once per adapter
    ///
    /// Concurrent first callers wait on the same resolution.
    pub async fn resolve_queue(&self) -> Option<&str> {
        let resolution = self
            .queue
            .get_or_init(|| async { self.lookup_or_create().await })
            .await;

        match resolution {
            QueueResolution::Ready(url) => Some(url.as_str()),
            QueueResolution::Abandoned => None,
        }
    }

    async fn lookup_or_create(&self) -> QueueResolution {
        match self.api.get_queue_url(&self.queue_name).await {
            Ok(url) => {
                info!(queue_url = %url, "Using existing SQS queue");
                QueueResolution::Ready(url)
            }
            Err(MessagingError::QueueNotFound(_)) => {
                info!(queue = %self.queue_name, "Queue does not exist. Attempting to create queue");
                match self
                    .api
                    .create_queue(&self.queue_name, &QueueAttributes::default())
                    .await
                {
                    Ok(url) => {
                        info!(queue_url = %url, "Created SQS queue");
                        QueueResolution::Ready(url)
                    }
                    Err(e) => {
                        error!(error = %e, "Error creating queue");
                        QueueResolution::Abandoned
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Error initializing queue");
                QueueResolution::Abandoned
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_receive_limits(config: &SqsConfig) -> MessagingResult<()> {
    if !SQS_MAX_NUMBER_OF_MESSAGES_RANGE.contains(&config.max_messages) {
        return Err(MessagingError::Configuration(format!(
            "SQS max_messages must be within {:?}, got {}",
            SQS_MAX_NUMBER_OF_MESSAGES_RANGE, config.max_messages
        )));
    }
    if !SQS_WAIT_TIME_SECONDS_RANGE.contains(&config.wait_time_secs) {
        return Err(MessagingError::Configuration(format!(
            "SQS wait_time_secs must be within {:?}, got {}",
            SQS_WAIT_TIME_SECONDS_RANGE, config.wait_time_secs
        )));
    }
    Ok(())
}

#[async_trait]
impl QueueAdapter for SqsAdapter {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::Sqs
    }

    async fn publish(&self, message: &str) -> MessagingResult<()> {
        let Some(queue_url) = self.resolve_queue().await else {
            error!(queue = %self.queue_name, "Error publishing message: SQS queue is not initialized");
            return Ok(());
        };

        match self.api.send_message(queue_url, message).await {
            Ok(()) => {
                info!(message = %message, "Message sent to SQS");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error publishing message");
                Err(e)
            }
        }
    }

    async fn subscribe(&self) -> MessagingResult<Vec<String>> {
        let Some(queue_url) = self.resolve_queue().await else {
            error!(queue = %self.queue_name, "Error subscribing to messages: SQS queue is not initialized");
            return Ok(Vec::new());
        };

        let received = match self
            .api
            .receive_messages(queue_url, self.max_messages, self.wait_time_secs)
            .await
        {
            Ok(received) => received,
            Err(e) => {
                error!(error = %e, "Error subscribing to messages");
                return Ok(Vec::new());
            }
        };

        if received.is_empty() {
            debug!("No messages received");
            return Ok(Vec::new());
        }

        let mut messages = Vec::with_capacity(received.len());
        for message in received {
            info!(body = %message.body, "Received SQS message");

            match message.receipt_handle.as_deref() {
                Some(receipt_handle) => match self.api.delete_message(queue_url, receipt_handle).await {
                    Ok(()) => debug!("Message deleted from SQS"),
                    Err(e) => error!(error = %e, "Error deleting message"),
                },
                None => warn!("SQS message has no receipt handle; it cannot be deleted"),
            }

            messages.push(message.body);
        }

        Ok(messages)
    }
}
