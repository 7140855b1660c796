//! Notification requests
//!
//! The core only *requests* notifications; delivery (push/email/SMS) belongs
//! to an external dispatcher. Requests are fire-and-forget on a broadcast
//! channel and are never awaited, so a slow or absent dispatcher cannot hold
//! up a state transition.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Channel capacity; old requests are dropped for lagging receivers
const NOTIFY_CHANNEL_CAPACITY: usize = 4096;

/// What happened, from the recipient's point of view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
    CheckInRecorded,
    CheckOutRecorded,
    PaymentReceived,
    PaymentFailed,
    RefundSettled,
    RefundFailed,
}

/// A request for the external dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    /// Recipient account id (tourist or owner)
    pub recipient_id: i64,
    /// Related resource, e.g. a booking or refund id
    pub resource_id: String,
    /// Short human-readable context line
    pub message: String,
    pub created_at: i64,
}

/// Fire-and-forget notification publisher
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<NotificationRequest>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to notification requests
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationRequest> {
        self.tx.subscribe()
    }

    /// Publish a request; absent receivers are not an error
    pub fn request(
        &self,
        kind: NotificationKind,
        recipient_id: i64,
        resource_id: impl Into<String>,
        message: impl Into<String>,
    ) {
        let request = NotificationRequest {
            kind,
            recipient_id,
            resource_id: resource_id.into(),
            message: message.into(),
            created_at: shared::util::now_millis(),
        };
        if self.tx.send(request).is_err() {
            tracing::debug!("No notification subscribers; request dropped");
        }
    }
}
