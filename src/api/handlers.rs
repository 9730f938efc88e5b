use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::messaging::{parse_provider_list, ProviderIdentity};
use crate::metrics::gather_metrics;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Landing page
pub async fn welcome() -> &'static str {
    "Welcome to the Queue Gateway API!"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        providers: state.gateway.providers(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<ProviderIdentity>,
}

/// Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Publish a message to the selected queues (all when none are named)
pub async fn publish_message(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<MessageResponse>> {
    request.validate()?;

    state.gateway.publish(&request.message, &request.queues).await;

    Ok(Json(MessageResponse {
        message: "Message published to specified queues".to_string(),
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PublishRequest {
    #[validate(length(min = 1))]
    pub message: String,
    #[serde(default)]
    pub queues: Vec<ProviderIdentity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Drain the selected queues
///
/// Queues may be named in the query string (`?queues=SQS,RABBITMQ`), in a
/// JSON body (`{"queues": [...]}`), or both; the union is used.
pub async fn subscribe_messages(
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
    body: Bytes,
) -> Result<Json<SubscribeResponse>> {
    let mut queues = match query.queues.as_deref() {
        Some(raw) => parse_provider_list(raw).map_err(|e| AppError::Validation(e.to_string()))?,
        None => Vec::new(),
    };

    if !body.iter().all(u8::is_ascii_whitespace) {
        let request: SubscribeRequest = serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;
        for queue in request.queues {
            if !queues.contains(&queue) {
                queues.push(queue);
            }
        }
    }

    let data = state.gateway.subscribe(&queues).await;

    Ok(Json(SubscribeResponse {
        message: "Subscribed and received messages from specified queues".to_string(),
        data,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeQuery {
    pub queues: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub queues: Vec<ProviderIdentity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub message: String,
    pub data: Vec<String>,
}
