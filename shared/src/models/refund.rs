//! Refund model

use serde::{Deserialize, Serialize};

/// What a refund is issued against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundTarget {
    Booking(String),
    Order(String),
}

/// Refund status
///
/// `Failed` is retryable: callers bump `retry_count` and begin processing
/// again. `Succeeded` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    #[default]
    Pending,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
}

/// Refund row
///
/// Always references exactly one payment; `amount` never exceeds that
/// payment's amount (enforced by the workflow before the row is created).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: String,
    pub target: RefundTarget,
    /// Source payment being refunded
    pub payment_id: String,
    pub requested_by: i64,
    pub amount: f64,
    pub reason: String,
    pub status: RefundStatus,
    pub retry_count: u32,
    /// Gateway-side refund id, set on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub created_at: i64,
    /// Set when processing begins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
    /// Set on terminal success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl Refund {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RefundStatus::Succeeded | RefundStatus::Cancelled)
    }
}
