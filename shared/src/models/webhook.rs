//! Webhook inbox event model
//!
//! The external event id is the deduplication key and is unique at the
//! storage layer. Rows are immutable once `Processed`.

use serde::{Deserialize, Serialize};

/// Inbox processing status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStatus {
    #[default]
    Pending,
    Processed,
    Failed,
}

/// Durable record of one inbound gateway event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Internal id
    pub id: String,
    /// Gateway-issued event id — the dedup key
    pub external_event_id: String,
    /// Gateway event type, e.g. "payment.succeeded"
    pub event_type: String,
    /// Gateway name, e.g. "stripe"
    pub source: String,
    /// Opaque gateway document; schema owned by the gateway
    pub payload: serde_json::Value,
    pub status: WebhookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub received_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
}
