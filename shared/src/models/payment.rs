//! Payment model
//!
//! One payable entity may accumulate multiple payment rows over its lifetime
//! (a failed attempt is terminal for that row; retry opens a new intent), but
//! at most one row per target may be `Paid` at a time.

use serde::{Deserialize, Serialize};

/// What a payment finances
///
/// Tagged union instead of a stringly-typed (`payment_for`, id) pair so only
/// valid kind/id combinations can be constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayTarget {
    Booking(String),
    Order(String),
    Reservation(String),
    Subscription(String),
}

impl PayTarget {
    /// Stable storage key, e.g. `booking:b-123`
    pub fn key(&self) -> String {
        match self {
            PayTarget::Booking(id) => format!("booking:{id}"),
            PayTarget::Order(id) => format!("order:{id}"),
            PayTarget::Reservation(id) => format!("reservation:{id}"),
            PayTarget::Subscription(id) => format!("subscription:{id}"),
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Payment row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: String,
    /// Tourist or owner account the charge is made against
    pub payer_id: i64,
    pub target: PayTarget,
    pub amount: f64,
    /// ISO 4217 code, e.g. "EUR"
    pub currency: String,
    /// Payment method, e.g. "CARD", "CASH"
    pub method: String,
    pub status: PaymentStatus,
    /// Gateway correlation id issued at intent creation
    pub intent_id: String,
    /// Gateway-side payment id, set on confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Payment {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}
