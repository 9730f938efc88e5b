//! RabbitMQ adapter (push model)
//!
//! A supervisor task owns the broker connection for the adapter's whole
//! lifetime:
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected
//!      ▲               │              │
//!      └── retry ◄─────┘ (failure)    │ (stream ended)
//!                      ▲              │
//!                      └──────────────┘
//! ```
//!
//! Connection attempts are retried forever at a fixed interval. Once
//! connected, the queue is declared durable and a consumer task appends every
//! delivery to a bounded local buffer, acknowledging it immediately
//! (ack-on-buffer). A message evicted from a full buffer before anyone drains
//! it is gone for good.

use crate::messaging::buffer::MessageBuffer;
use crate::messaging::config::RabbitMqConfig;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::provider::ProviderIdentity;
use crate::messaging::traits::QueueAdapter;
use crate::metrics::{BUFFER_EVICTIONS_TOTAL, CONNECTION_ATTEMPTS_TOTAL, CONNECTION_UP};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

/// Acknowledges one delivery to the broker
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(&self) -> MessagingResult<()>;
}

/// A delivery pushed by the broker
pub struct InboundMessage {
    pub body: Vec<u8>,
    acker: Box<dyn Acknowledge>,
}

impl InboundMessage {
    pub fn new(body: Vec<u8>, acker: impl Acknowledge + 'static) -> Self {
        Self {
            body,
            acker: Box::new(acker),
        }
    }

    pub async fn ack(&self) -> MessagingResult<()> {
        self.acker.ack().await
    }
}

/// Deliveries for one consumer; the stream ends when the connection is lost
pub type InboundStream = BoxStream<'static, MessagingResult<InboundMessage>>;

/// Opens broker sessions (connection plus channel)
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self, url: &str) -> MessagingResult<Arc<dyn BrokerSession>>;
}

/// Operations available on an open session
#[async_trait]
pub trait BrokerSession: Send + Sync {
    async fn declare_durable_queue(&self, queue: &str) -> MessagingResult<()>;

    /// Returns whether the broker accepted the message
    async fn publish_persistent(&self, queue: &str, payload: &[u8]) -> MessagingResult<bool>;

    /// Start consuming with manual acknowledgement
    async fn consume(&self, queue: &str) -> MessagingResult<InboundStream>;

    /// Close the channel, then the connection
    async fn close(&self) -> MessagingResult<()>;
}

/// [`BrokerConnector`] backed by `lapin`
pub struct LapinConnector {
    connection_name: String,
}

impl LapinConnector {
    pub fn new(connection_name: impl Into<String>) -> Self {
        Self {
            connection_name: connection_name.into(),
        }
    }
}

#[async_trait]
impl BrokerConnector for LapinConnector {
    async fn connect(&self, url: &str) -> MessagingResult<Arc<dyn BrokerSession>> {
        let connection = Connection::connect(
            url,
            ConnectionProperties::default().with_connection_name(self.connection_name.clone().into()),
        )
        .await
        .map_err(|e| MessagingError::ConnectionFailed(format!("RabbitMQ connection failed: {}", e)))?;

        let channel = connection.create_channel().await.map_err(|e| {
            MessagingError::ConnectionFailed(format!("RabbitMQ channel creation failed: {}", e))
        })?;

        Ok(Arc::new(LapinSession {
            connection,
            channel,
            consumer_tag: format!("{}-consumer", self.connection_name),
        }))
    }
}

struct LapinSession {
    connection: Connection,
    channel: Channel,
    consumer_tag: String,
}

struct LapinAcker(Acker);

#[async_trait]
impl Acknowledge for LapinAcker {
    async fn ack(&self) -> MessagingResult<()> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
            .map_err(|e| MessagingError::Internal(format!("ack failed: {}", e)))
    }
}

#[async_trait]
impl BrokerSession for LapinSession {
    async fn declare_durable_queue(&self, queue: &str) -> MessagingResult<()> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::QueueCreationFailed {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn publish_persistent(&self, queue: &str, payload: &[u8]) -> MessagingResult<bool> {
        let confirm = self
            .channel
            .basic_publish(
                "",    // Default exchange
                queue, // Routing key = queue name
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2), // Persistent
            )
            .await
            .map_err(|e| MessagingError::PublishFailed(format!("Publish failed: {}", e)))?;

        let confirmation = confirm.await.map_err(|e| {
            MessagingError::PublishFailed(format!("Publish confirmation failed: {}", e))
        })?;

        Ok(!confirmation.is_nack())
    }

    async fn consume(&self, queue: &str) -> MessagingResult<InboundStream> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::ConnectionFailed(format!("basic_consume failed: {}", e)))?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|d| InboundMessage::new(d.data, LapinAcker(d.acker)))
                    .map_err(|e| MessagingError::ConnectionFailed(format!("consumer error: {}", e)))
            })
            .boxed())
    }

    async fn close(&self) -> MessagingResult<()> {
        self.channel
            .close(200, "Bye")
            .await
            .map_err(|e| MessagingError::Internal(format!("channel close failed: {}", e)))?;
        info!("RabbitMQ channel closed");

        self.connection
            .close(200, "Bye")
            .await
            .map_err(|e| MessagingError::Internal(format!("connection close failed: {}", e)))?;
        info!("RabbitMQ connection closed");
        Ok(())
    }
}

/// Broker connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// State shared between the adapter and its background tasks
struct Shared {
    config: RabbitMqConfig,
    connector: Arc<dyn BrokerConnector>,
    state: RwLock<ConnectionState>,
    session: RwLock<Option<Arc<dyn BrokerSession>>>,
    buffer: Mutex<MessageBuffer>,
    consumer: Mutex<Option<AbortHandle>>,
    stopping: AtomicBool,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        let up = if state == ConnectionState::Connected { 1.0 } else { 0.0 };
        CONNECTION_UP
            .with_label_values(&[ProviderIdentity::RabbitMq.as_str()])
            .set(up);
    }

    fn new(config: RabbitMqConfig, connector: Arc<dyn BrokerConnector>) -> Self {
        Self {
            buffer: Mutex::new(MessageBuffer::new(config.buffer_capacity)),
            config,
            connector,
            state: RwLock::new(ConnectionState::Disconnected),
            session: RwLock::new(None),
            consumer: Mutex::new(None),
            stopping: AtomicBool::new(false),
        }
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    async fn supervise(self: Arc<Self>) {
        let retry_interval = self.config.retry_interval();

        loop {
            self.set_state(ConnectionState::Connecting);

            match self.establish().await {
                Ok((session, stream)) => {
                    // Checked under the consumer slot lock so shutdown either
                    // sees the handle or the supervisor sees the flag
                    let consumer = {
                        let mut slot = self.consumer.lock();
                        if self.is_stopping() {
                            None
                        } else {
                            *self.session.write() = Some(session.clone());
                            self.set_state(ConnectionState::Connected);
                            let handle = tokio::spawn(self.clone().consume(stream));
                            *slot = Some(handle.abort_handle());
                            Some(handle)
                        }
                    };

                    let Some(consumer) = consumer else {
                        close_session(session.as_ref()).await;
                        self.set_state(ConnectionState::Disconnected);
                        return;
                    };

                    info!(
                        url = %self.config.url_redacted(),
                        queue = %self.config.queue,
                        "Connected to RabbitMQ"
                    );

                    if let Err(e) = consumer.await {
                        if e.is_panic() {
                            error!(error = %e, "RabbitMQ consumer task panicked");
                        }
                    }

                    self.consumer.lock().take();
                    let lost = self.session.write().take();
                    if let Some(lost) = lost {
                        close_session(lost.as_ref()).await;
                    }

                    if self.is_stopping() {
                        return;
                    }
                    warn!("RabbitMQ connection lost; reconnecting");
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    error!(
                        error = %e,
                        retry_in_ms = retry_interval.as_millis() as u64,
                        "Error connecting to RabbitMQ"
                    );
                    tokio::time::sleep(retry_interval).await;
                    if self.is_stopping() {
                        return;
                    }
                }
            }
        }
    }

    async fn establish(&self) -> MessagingResult<(Arc<dyn BrokerSession>, InboundStream)> {
        let provider = ProviderIdentity::RabbitMq.as_str();

        let session = match self.connector.connect(&self.config.url).await {
            Ok(session) => session,
            Err(e) => {
                CONNECTION_ATTEMPTS_TOTAL.with_label_values(&[provider, "failure"]).inc();
                return Err(e);
            }
        };
        CONNECTION_ATTEMPTS_TOTAL.with_label_values(&[provider, "success"]).inc();

        let started = async {
            session.declare_durable_queue(&self.config.queue).await?;
            session.consume(&self.config.queue).await
        }
        .await;

        match started {
            Ok(stream) => Ok((session, stream)),
            Err(e) => {
                close_session(session.as_ref()).await;
                Err(e)
            }
        }
    }

    async fn consume(self: Arc<Self>, mut stream: InboundStream) {
        while let Some(delivery) = stream.next().await {
            match delivery {
                Ok(message) => self.accept(message).await,
                Err(e) => {
                    error!(error = %e, "Error consuming RabbitMQ messages");
                    break;
                }
            }
        }
    }

    async fn accept(&self, message: InboundMessage) {
        let body = String::from_utf8_lossy(&message.body).into_owned();
        info!(body = %body, "Received RabbitMQ message");

        let evicted = self.buffer.lock().push(body);
        if evicted.is_some() {
            BUFFER_EVICTIONS_TOTAL
                .with_label_values(&[ProviderIdentity::RabbitMq.as_str()])
                .inc();
            warn!(
                capacity = self.config.buffer_capacity,
                "Message storage limit exceeded; oldest message removed"
            );
        }

        if let Err(e) = message.ack().await {
            error!(error = %e, "Error acknowledging RabbitMQ message");
        }
    }
}

/// Close a session that is no longer in use; failures only matter for logs
async fn close_session(session: &dyn BrokerSession) {
    if let Err(e) = session.close().await {
        debug!(error = %e, "Error closing stale RabbitMQ session");
    }
}

/// RabbitMQ adapter
pub struct RabbitMqAdapter {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl RabbitMqAdapter {
    /// Create an adapter using `lapin` and start connecting in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: RabbitMqConfig) -> Self {
        let connector = LapinConnector::new(config.connection_name.clone());
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create an adapter over any [`BrokerConnector`]
    pub fn with_connector(config: RabbitMqConfig, connector: Arc<dyn BrokerConnector>) -> Self {
        let shared = Arc::new(Shared::new(config, connector));

        let supervisor = tokio::spawn(shared.clone().supervise());

        Self {
            shared,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Number of messages waiting to be drained
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    fn stop_tasks(&self) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        if let Some(supervisor) = self.supervisor.lock().take() {
            supervisor.abort();
        }
        if let Some(consumer) = self.shared.consumer.lock().take() {
            consumer.abort();
        }
    }
}

impl Drop for RabbitMqAdapter {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

#[async_trait]
impl QueueAdapter for RabbitMqAdapter {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::RabbitMq
    }

    async fn publish(&self, message: &str) -> MessagingResult<()> {
        let session = match self.shared.state() {
            ConnectionState::Connected => self.shared.session.read().clone(),
            _ => None,
        };
        let Some(session) = session else {
            error!("Channel is not established. Cannot publish message.");
            return Ok(());
        };

        match session
            .publish_persistent(&self.shared.config.queue, message.as_bytes())
            .await
        {
            Ok(true) => {
                info!(message = %message, "Message sent to RabbitMQ");
                Ok(())
            }
            Ok(false) => {
                warn!(message = %message, "Message could not be sent to RabbitMQ");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error publishing message");
                Err(e)
            }
        }
    }

    async fn subscribe(&self) -> MessagingResult<Vec<String>> {
        Ok(self.shared.buffer.lock().drain())
    }

    async fn shutdown(&self) -> MessagingResult<()> {
        self.stop_tasks();

        let session = self.shared.session.write().take();
        self.shared.set_state(ConnectionState::Disconnected);

        if let Some(session) = session {
            if let Err(e) = session.close().await {
                error!(error = %e, "Error during RabbitMQ cleanup");
            }
        }

        Ok(())
    }
}
