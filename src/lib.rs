//! Queue Gateway
//!
//! A unification layer over message-queue backends. Applications publish and
//! subscribe through one contract ([`messaging::QueueAdapter`]) while the
//! [`messaging::QueueGateway`] fans operations out to Amazon SQS and RabbitMQ
//! and isolates their failures from each other.

pub mod api;
pub mod config;
pub mod error;
pub mod messaging;
pub mod metrics;

pub use error::{AppError, Result};
