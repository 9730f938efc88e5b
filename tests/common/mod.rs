//! Common test utilities
//!
//! In-memory queue adapters for driving the gateway and the HTTP API without
//! a broker, plus helpers for checking Prometheus output.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use queue_gateway::messaging::{
    MessagingError, MessagingResult, ProviderIdentity, QueueAdapter, QueueGateway,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Adapter that stores published messages and hands them back on subscribe
pub struct InMemoryAdapter {
    provider: ProviderIdentity,
    queue: Mutex<VecDeque<String>>,
    published: Mutex<Vec<String>>,
    shutdowns: AtomicUsize,
}

impl InMemoryAdapter {
    pub fn new(provider: ProviderIdentity) -> Arc<Self> {
        Arc::new(Self {
            provider,
            queue: Mutex::new(VecDeque::new()),
            published: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
        })
    }

    pub fn with_messages(provider: ProviderIdentity, messages: &[&str]) -> Arc<Self> {
        let adapter = Self::new(provider);
        adapter
            .queue
            .lock()
            .extend(messages.iter().map(|m| m.to_string()));
        adapter
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueAdapter for InMemoryAdapter {
    fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    async fn publish(&self, message: &str) -> MessagingResult<()> {
        self.published.lock().push(message.to_string());
        self.queue.lock().push_back(message.to_string());
        Ok(())
    }

    async fn subscribe(&self) -> MessagingResult<Vec<String>> {
        Ok(self.queue.lock().drain(..).collect())
    }

    async fn shutdown(&self) -> MessagingResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// How a [`FaultyAdapter`] misbehaves
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Error,
    Panic,
}

/// Adapter whose every operation fails
pub struct FaultyAdapter {
    provider: ProviderIdentity,
    fault: Fault,
    calls: AtomicUsize,
}

impl FaultyAdapter {
    pub fn new(provider: ProviderIdentity, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            provider,
            fault,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &str) -> MessagingResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::Error => Err(MessagingError::Internal(format!("{} rejected", operation))),
            Fault::Panic => panic!("{} exploded", operation),
        }
    }
}

#[async_trait]
impl QueueAdapter for FaultyAdapter {
    fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    async fn publish(&self, _message: &str) -> MessagingResult<()> {
        self.fail("publish")
    }

    async fn subscribe(&self) -> MessagingResult<Vec<String>> {
        self.fail("subscribe")
    }

    async fn shutdown(&self) -> MessagingResult<()> {
        self.fail("shutdown")
    }
}

/// Gateway over the given adapters, in order
pub fn gateway_of(adapters: Vec<Arc<dyn QueueAdapter>>) -> QueueGateway {
    QueueGateway::new(adapters)
}

/// Check if a metric exists in Prometheus output
pub fn metric_exists(output: &str, metric_name: &str) -> bool {
    output.lines().any(|line| {
        line.starts_with(&format!("# HELP {}", metric_name))
            || line.starts_with(&format!("# TYPE {}", metric_name))
            || line.starts_with(metric_name)
    })
}

/// Extract metric value from a Prometheus output line
/// Example: `metric_name{label1="value1"} 42.5` -> Some(42.5)
pub fn extract_metric_value(line: &str) -> Option<f64> {
    line.split_whitespace().last()?.parse::<f64>().ok()
}
