//! Inbox sweeper
//!
//! Periodic retry loop for pending/failed webhook events: catch-up sweep at
//! startup, then one sweep per configured interval until the shutdown token
//! fires.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::Engine;

/// Background inbox sweeper
pub struct InboxSweeper {
    engine: Arc<Engine>,
    shutdown: CancellationToken,
    interval: Duration,
}

impl InboxSweeper {
    pub fn new(engine: Arc<Engine>, shutdown: CancellationToken, interval: Duration) -> Self {
        Self {
            engine,
            shutdown,
            interval,
        }
    }

    /// Main loop: startup catch-up, then periodic sweeps
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Inbox sweeper started");

        // Catch up events left over from before the restart
        self.sweep_once();

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; the catch-up already covered it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep_once(),
            }
        }

        tracing::info!("Inbox sweeper stopped");
    }

    fn sweep_once(&self) {
        if let Err(e) = self.engine.sweep_inbox() {
            tracing::error!(error = %e, "Inbox sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::CoreStorage;
    use serde_json::json;

    #[tokio::test]
    async fn test_sweeper_retries_failed_event_once_dispatchable() {
        let engine = Arc::new(Engine::with_storage(
            Config::default(),
            CoreStorage::open_in_memory().unwrap(),
        ));

        // Event referencing a not-yet-existing intent: dispatch fails
        engine
            .ingest_webhook(
                "evt_1",
                "payment.succeeded",
                "stripe",
                json!({"intent_id": "pi_missing"}),
            )
            .unwrap();

        let report = engine.sweep_inbox().unwrap();
        assert_eq!(report.retried, 1);
        assert_eq!(report.failed, 1);

        let shutdown = CancellationToken::new();
        let sweeper = InboxSweeper::new(
            engine.clone(),
            shutdown.clone(),
            Duration::from_millis(10),
        );
        let handle = tokio::spawn(sweeper.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // Still failed (the intent never appeared), but the sweeper kept
        // retrying without crashing
        let stored = engine
            .storage()
            .get_webhook("evt_1")
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, shared::models::WebhookStatus::Failed);
    }
}
