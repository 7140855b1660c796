//! Gateway webhook inbox
//!
//! - **inbox**: durable dedup gate keyed by the gateway's event id
//! - **sweeper**: background retry loop for pending/failed events
//!
//! Inbound events are recorded BEFORE any side effect is applied; dispatch
//! failures mark the row Failed and the sweep retries it. This is the
//! system's only retry mechanism for gateway-driven state changes, and it is
//! what turns the gateway's at-least-once delivery into exactly-once
//! application effects.

pub mod inbox;
pub mod sweeper;

pub use inbox::{IngestOutcome, InboxError, WebhookInbox};
pub use sweeper::InboxSweeper;

use serde_json::Value;

/// Caller-facing ingestion result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// Durably recorded; processing state lives on the stored row
    Accepted,
    /// Same external id already processed; acked without side effects
    Duplicate,
}

/// Outcome of one inbox sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    /// Events picked up for (re)dispatch
    pub retried: usize,
    /// Dispatches that succeeded this sweep
    pub processed: usize,
    /// Dispatches that failed again
    pub failed: usize,
}

/// A parsed gateway notice
///
/// The payload document itself is gateway-owned and opaque; only these
/// fields are interpreted, everything else rides along in the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayNotice {
    PaymentSucceeded {
        intent_id: String,
        gateway_payment_id: Option<String>,
    },
    PaymentFailed {
        intent_id: String,
        reason: Option<String>,
    },
    RefundSucceeded {
        refund_id: String,
        gateway_refund_id: Option<String>,
    },
    RefundFailed {
        refund_id: String,
        error: Option<String>,
    },
}

/// Parse a gateway event into a notice
pub fn parse_notice(event_type: &str, payload: &Value) -> Result<GatewayNotice, InboxError> {
    let field = |name: &str| -> Result<String, InboxError> {
        payload
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                InboxError::MalformedPayload(format!("missing or non-string field '{name}'"))
            })
    };
    let optional = |name: &str| -> Option<String> {
        payload
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    match event_type {
        "payment.succeeded" => Ok(GatewayNotice::PaymentSucceeded {
            intent_id: field("intent_id")?,
            gateway_payment_id: optional("gateway_payment_id"),
        }),
        "payment.failed" => Ok(GatewayNotice::PaymentFailed {
            intent_id: field("intent_id")?,
            reason: optional("reason"),
        }),
        "refund.succeeded" => Ok(GatewayNotice::RefundSucceeded {
            refund_id: field("refund_id")?,
            gateway_refund_id: optional("gateway_refund_id"),
        }),
        "refund.failed" => Ok(GatewayNotice::RefundFailed {
            refund_id: field("refund_id")?,
            error: optional("error"),
        }),
        other => Err(InboxError::UnknownEventType(other.to_string())),
    }
}
