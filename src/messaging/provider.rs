//! Provider identities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend kind carried by every adapter
///
/// Requests select adapters by comparing these values, never by inspecting
/// the adapter's concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderIdentity {
    /// Amazon SQS (pull model)
    #[serde(rename = "SQS", alias = "SQSService", alias = "sqs")]
    Sqs,
    /// RabbitMQ over AMQP 0.9.1 (push model)
    #[serde(rename = "RABBITMQ", alias = "RabbitMQService", alias = "rabbitmq")]
    RabbitMq,
}

impl ProviderIdentity {
    /// Every identity, in the order the factory builds adapters
    pub const ALL: [ProviderIdentity; 2] = [ProviderIdentity::Sqs, ProviderIdentity::RabbitMq];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderIdentity::Sqs => "SQS",
            ProviderIdentity::RabbitMq => "RABBITMQ",
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a provider name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown queue provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderIdentity {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SQS" | "SQSSERVICE" => Ok(ProviderIdentity::Sqs),
            "RABBITMQ" | "RABBITMQSERVICE" => Ok(ProviderIdentity::RabbitMq),
            _ => Err(UnknownProvider(s.trim().to_string())),
        }
    }
}

/// Parse a comma-separated provider list such as `SQS,RABBITMQ`
pub fn parse_provider_list(raw: &str) -> Result<Vec<ProviderIdentity>, UnknownProvider> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ProviderIdentity::from_str)
        .collect()
}
