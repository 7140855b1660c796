//! Webhook inbox - deduplication gate
//!
//! On receipt: look up by external event id and insert-if-absent in ONE
//! write transaction (redb's single writer makes the lookup+insert atomic
//! under concurrent deliveries). Already-processed ids are acked as
//! Duplicate without reprocessing; Failed rows are handed back for another
//! attempt. Only after the durable insert does the engine dispatch the
//! payload.

use thiserror::Error;

use crate::storage::{CoreStorage, StorageError};
use shared::models::{WebhookEvent, WebhookStatus};

/// Inbox errors
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Unknown gateway event type: {0}")]
    UnknownEventType(String),

    #[error("Malformed gateway payload: {0}")]
    MalformedPayload(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of recording an inbound event
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Recorded (or re-opened after failure); dispatch follows
    Accepted(Box<WebhookEvent>),
    /// Same external id already processed; ack without side effects
    Duplicate,
}

/// Webhook inbox
#[derive(Clone)]
pub struct WebhookInbox {
    storage: CoreStorage,
}

impl WebhookInbox {
    pub fn new(storage: CoreStorage) -> Self {
        Self { storage }
    }

    /// Durably record an inbound event before any side effect
    pub fn record(
        &self,
        external_event_id: &str,
        event_type: &str,
        source: &str,
        payload: serde_json::Value,
    ) -> Result<IngestOutcome, InboxError> {
        let event = WebhookEvent {
            id: uuid::Uuid::new_v4().to_string(),
            external_event_id: external_event_id.to_string(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            payload,
            status: WebhookStatus::Pending,
            error_message: None,
            received_at: shared::util::now_millis(),
            processed_at: None,
        };

        let txn = self.storage.begin_write()?;
        let existing = self.storage.insert_webhook_if_absent(&txn, &event)?;
        txn.commit().map_err(StorageError::from)?;

        match existing {
            None => {
                tracing::debug!(
                    external_event_id = external_event_id,
                    event_type = event_type,
                    "Webhook event recorded"
                );
                Ok(IngestOutcome::Accepted(Box::new(event)))
            }
            Some(stored) if stored.status == WebhookStatus::Processed => {
                tracing::info!(
                    external_event_id = external_event_id,
                    "Duplicate webhook delivery discarded"
                );
                Ok(IngestOutcome::Duplicate)
            }
            // Pending or Failed: the original row is handed back for another
            // dispatch attempt (the redelivered payload is NOT re-recorded)
            Some(stored) => Ok(IngestOutcome::Accepted(Box::new(stored))),
        }
    }

    /// Mark an event processed; the row is immutable afterwards
    pub fn mark_processed(&self, event: &WebhookEvent) -> Result<(), InboxError> {
        let mut updated = event.clone();
        updated.status = WebhookStatus::Processed;
        updated.error_message = None;
        updated.processed_at = Some(shared::util::now_millis());

        let txn = self.storage.begin_write()?;
        self.storage.store_webhook(&txn, &updated)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    /// Mark an event failed with the dispatch error text
    pub fn mark_failed(&self, event: &WebhookEvent, error: &str) -> Result<(), InboxError> {
        let mut updated = event.clone();
        updated.status = WebhookStatus::Failed;
        updated.error_message = Some(error.to_string());

        let txn = self.storage.begin_write()?;
        self.storage.store_webhook(&txn, &updated)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::warn!(
            external_event_id = %event.external_event_id,
            error = error,
            "Webhook dispatch failed"
        );
        Ok(())
    }

    /// Events awaiting (re)dispatch, oldest first
    pub fn unprocessed(&self) -> Result<Vec<WebhookEvent>, InboxError> {
        Ok(self.storage.get_unprocessed_webhooks()?)
    }

    /// Look up an event by external id
    pub fn get(&self, external_event_id: &str) -> Result<Option<WebhookEvent>, InboxError> {
        Ok(self.storage.get_webhook(external_event_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> WebhookInbox {
        WebhookInbox::new(CoreStorage::open_in_memory().unwrap())
    }

    #[test]
    fn test_first_delivery_accepted() {
        let inbox = setup();
        let outcome = inbox
            .record("evt_1", "payment.succeeded", "stripe", json!({"intent_id": "pi_1"}))
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Accepted(_)));

        let stored = inbox.get("evt_1").unwrap().unwrap();
        assert_eq!(stored.status, WebhookStatus::Pending);
    }

    #[test]
    fn test_processed_event_deduplicated() {
        let inbox = setup();
        let outcome = inbox
            .record("evt_1", "payment.succeeded", "stripe", json!({"intent_id": "pi_1"}))
            .unwrap();
        let IngestOutcome::Accepted(event) = outcome else {
            panic!("expected Accepted");
        };
        inbox.mark_processed(&event).unwrap();

        let second = inbox
            .record("evt_1", "payment.succeeded", "stripe", json!({"intent_id": "pi_1"}))
            .unwrap();
        assert!(matches!(second, IngestOutcome::Duplicate));
    }

    #[test]
    fn test_failed_event_allows_reprocessing() {
        let inbox = setup();
        let IngestOutcome::Accepted(event) = inbox
            .record("evt_1", "payment.succeeded", "stripe", json!({"intent_id": "pi_1"}))
            .unwrap()
        else {
            panic!("expected Accepted");
        };
        inbox.mark_failed(&event, "ledger unavailable").unwrap();

        let second = inbox
            .record("evt_1", "payment.succeeded", "stripe", json!({"intent_id": "pi_1"}))
            .unwrap();
        let IngestOutcome::Accepted(redelivered) = second else {
            panic!("expected Accepted for failed event");
        };
        // The original row comes back, error text and all
        assert_eq!(redelivered.status, WebhookStatus::Failed);
        assert_eq!(
            redelivered.error_message.as_deref(),
            Some("ledger unavailable")
        );
    }

    #[test]
    fn test_unprocessed_lists_pending_and_failed() {
        let inbox = setup();
        let IngestOutcome::Accepted(first) = inbox
            .record("evt_1", "payment.succeeded", "stripe", json!({"intent_id": "pi_1"}))
            .unwrap()
        else {
            panic!()
        };
        inbox
            .record("evt_2", "payment.failed", "stripe", json!({"intent_id": "pi_2"}))
            .unwrap();
        let IngestOutcome::Accepted(third) = inbox
            .record("evt_3", "refund.succeeded", "stripe", json!({"refund_id": "r-1"}))
            .unwrap()
        else {
            panic!()
        };

        inbox.mark_processed(&first).unwrap();
        inbox.mark_failed(&third, "boom").unwrap();

        let pending = inbox.unprocessed().unwrap();
        let ids: Vec<&str> = pending.iter().map(|e| e.external_event_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"evt_2"));
        assert!(ids.contains(&"evt_3"));
    }
}
