//! Engine facade
//!
//! Wires config, storage and the owning modules together and exposes the
//! core's operation surface:
//!
//! | Operation | Entry point |
//! |-----------|-------------|
//! | ResolvePrice | [`Engine::resolve_price`] |
//! | CheckAvailability | [`Engine::check_availability`] |
//! | CreateBooking / TransitionBooking | [`Engine::execute_booking_command`] |
//! | OpenPaymentIntent | [`Engine::open_payment_intent`] |
//! | ConfirmPayment | [`Engine::confirm_payment`] |
//! | MarkPaymentFailed | [`Engine::mark_payment_failed`] |
//! | RequestRefund .. CancelRefund | [`Engine::request_refund`] et al. |
//! | IngestWebhook | [`Engine::ingest_webhook`] |
//! | Inbox sweep | [`Engine::sweep_inbox`] |
//!
//! The engine is also where cross-module transactions are composed: a
//! confirmed booking payment reserves the booking in the same write
//! transaction, and cancelling a paid booking creates the refund request in
//! the same write transaction (under the AutoRequest policy). Each owning
//! module remains the only writer of its rows; the engine only sequences
//! them.

use chrono::NaiveDate;

use crate::audit::AuditService;
use crate::availability::{self, AvailabilityReport};
use crate::bookings::{BookingsManager, ManagerError};
use crate::config::{CancellationRefundPolicy, Config};
use crate::inventory::RoomInventory;
use crate::notify::{NotificationKind, Notifier};
use crate::payments::{LedgerError, PaymentLedger};
use crate::pricing::{resolve_with_rules, PriceBreakdown, PricingError};
use crate::refunds::{RefundError, RefundWorkflow};
use crate::storage::{CoreStorage, StorageError};
use crate::webhook::{
    parse_notice, GatewayNotice, InboxError, IngestOutcome, IngestStatus, SweepReport,
    WebhookInbox,
};
use shared::booking::{
    BookingCommand, BookingCommandPayload, BookingEvent, BookingEventType, BookingSnapshot,
    CommandResponse, EventPayload, StayDates,
};
use shared::models::{PayTarget, Payment, Refund, RefundTarget, WebhookEvent};

/// Database file name under the configured data dir
const DB_FILE: &str = "booking-core.redb";

/// The booking core engine
pub struct Engine {
    config: Config,
    storage: CoreStorage,
    audit: AuditService,
    notifier: Notifier,
    bookings: BookingsManager,
    ledger: PaymentLedger,
    refunds: RefundWorkflow,
    inventory: RoomInventory,
    inbox: WebhookInbox,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.config.data_dir)
            .field("epoch", &self.bookings.epoch())
            .finish()
    }
}

impl Engine {
    /// Open (or create) the engine at the configured data dir
    pub fn open(config: Config) -> Result<Self, StorageError> {
        if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
            tracing::warn!(dir = %config.data_dir, error = %e, "Could not create data dir");
        }
        let path = std::path::Path::new(&config.data_dir).join(DB_FILE);
        let storage = CoreStorage::open(path)?;
        Ok(Self::with_storage(config, storage))
    }

    /// Build the engine over existing storage (tests, ephemeral tooling)
    pub fn with_storage(config: Config, storage: CoreStorage) -> Self {
        let audit = AuditService::new(storage.clone());
        let notifier = Notifier::new();
        let bookings = BookingsManager::new(
            storage.clone(),
            audit.clone(),
            notifier.clone(),
            config.timezone,
            config.min_stay,
        );
        let ledger = PaymentLedger::new(storage.clone(), audit.clone(), config.currency.clone());
        let refunds = RefundWorkflow::new(storage.clone(), audit.clone(), ledger.clone());
        let inventory = RoomInventory::new(storage.clone(), audit.clone(), config.timezone);
        let inbox = WebhookInbox::new(storage.clone());

        Self {
            config,
            storage,
            audit,
            notifier,
            bookings,
            ledger,
            refunds,
            inventory,
            inbox,
        }
    }

    // ========== Pricing & Availability ==========

    /// Resolve the price for a stay against committed rules and base rate
    pub fn resolve_price(
        &self,
        room_id: i64,
        dates: StayDates,
    ) -> Result<PriceBreakdown, PricingError> {
        let room = self
            .storage
            .get_room(room_id)?
            .ok_or(PricingError::RoomNotFound(room_id))?;
        let rules = self.storage.get_season_rules(room_id)?;
        resolve_with_rules(&room, &rules, &dates)
    }

    /// Check whether a range is bookable, with conflict counts
    pub fn check_availability(
        &self,
        room_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AvailabilityReport, StorageError> {
        availability::check(&self.storage, room_id, start, end)
    }

    // ========== Booking Lifecycle ==========

    /// Execute a booking command (create or transition)
    ///
    /// Cancelling a booking that holds a paid payment also creates the
    /// refund request in the same transaction when the configured policy is
    /// AutoRequest.
    pub fn execute_booking_command(&self, cmd: BookingCommand) -> CommandResponse {
        match self.process_booking_command(&cmd) {
            Ok(Some(events)) => {
                self.bookings.broadcast_events(&events);
                let booking_id = events.iter().find_map(|e| {
                    (e.event_type == BookingEventType::BookingCreated)
                        .then(|| e.booking_id.clone())
                });
                CommandResponse::success(cmd.command_id, booking_id)
            }
            Ok(None) => CommandResponse::duplicate(cmd.command_id),
            Err(err) => CommandResponse::error(cmd.command_id, err.into()),
        }
    }

    /// Returns `Ok(None)` for duplicate commands
    fn process_booking_command(
        &self,
        cmd: &BookingCommand,
    ) -> Result<Option<Vec<BookingEvent>>, ManagerError> {
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok(None);
        }

        let txn = self.storage.begin_write()?;
        let outcome = self.bookings.execute_in_txn(&txn, cmd)?;
        if outcome.duplicate {
            return Ok(None);
        }

        // Cancellation with a paid payment: create the refund request in the
        // SAME transaction so the two can never diverge
        if self.config.cancel_refund == CancellationRefundPolicy::AutoRequest {
            for event in &outcome.events {
                let EventPayload::BookingCancelled {
                    refund_required: true,
                    paid_payment_id: Some(payment_id),
                    reason,
                } = &event.payload
                else {
                    continue;
                };
                let payment = self
                    .storage
                    .get_payment_txn(&txn, payment_id)?
                    .ok_or_else(|| {
                        ManagerError::Internal(format!(
                            "Paid payment {} missing for cancelled booking {}",
                            payment_id, event.booking_id
                        ))
                    })?;
                let refund = self
                    .refunds
                    .create_request(
                        &txn,
                        RefundTarget::Booking(event.booking_id.clone()),
                        payment_id,
                        cmd.actor_id,
                        payment.amount,
                        reason.as_deref().unwrap_or("booking cancelled"),
                    )
                    .map_err(|e| ManagerError::Internal(e.to_string()))?;
                tracing::info!(
                    booking_id = %event.booking_id,
                    refund_id = %refund.refund_id,
                    "Refund request created with cancellation"
                );
            }
        }

        txn.commit().map_err(StorageError::from)?;
        Ok(Some(outcome.events))
    }

    /// Get a booking snapshot
    pub fn booking(&self, booking_id: &str) -> Result<Option<BookingSnapshot>, StorageError> {
        self.storage.get_snapshot(booking_id)
    }

    // ========== Payment Ledger ==========

    /// Open a payment intent for a target
    pub fn open_payment_intent(
        &self,
        payer_id: i64,
        target: PayTarget,
        amount: f64,
        method: &str,
    ) -> Result<Payment, LedgerError> {
        let txn = self.storage.begin_write()?;
        let payment = self.ledger.open_intent(&txn, payer_id, target, amount, method)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(payment)
    }

    /// Confirm a payment by gateway correlation id
    ///
    /// For booking targets the Pending → Reserved transition is applied in
    /// the same transaction. A booking that can no longer be reserved (e.g.
    /// cancelled meanwhile) does not fail the confirmation: the payment
    /// stays paid and the refund path handles it.
    pub fn confirm_payment(
        &self,
        intent_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Payment, LedgerError> {
        let txn = self.storage.begin_write()?;
        let (payment, newly_paid) = self.ledger.confirm_paid(&txn, intent_id, gateway_payment_id)?;

        let mut booking_events = Vec::new();
        if let PayTarget::Booking(booking_id) = &payment.target {
            let cmd = BookingCommand {
                command_id: format!("confirm-{}-{}", intent_id, payment.payment_id),
                actor_id: 0,
                actor_name: "payment-ledger".to_string(),
                timestamp: shared::util::now_millis(),
                payload: BookingCommandPayload::MarkReserved {
                    booking_id: booking_id.clone(),
                    payment_id: payment.payment_id.clone(),
                },
            };
            match self.bookings.execute_in_txn(&txn, &cmd) {
                Ok(outcome) => booking_events = outcome.events,
                Err(ManagerError::Storage(e)) => return Err(LedgerError::Storage(e)),
                Err(e) => {
                    tracing::warn!(
                        booking_id = %booking_id,
                        payment_id = %payment.payment_id,
                        error = %e,
                        "Payment confirmed but booking transition rejected"
                    );
                }
            }
        }

        txn.commit().map_err(StorageError::from)?;
        self.bookings.broadcast_events(&booking_events);
        if newly_paid {
            self.notifier.request(
                NotificationKind::PaymentReceived,
                payment.payer_id,
                payment.payment_id.clone(),
                format!("Payment of {:.2} {} received", payment.amount, payment.currency),
            );
        }
        Ok(payment)
    }

    /// Record a gateway failure for a pending payment
    pub fn mark_payment_failed(
        &self,
        intent_id: &str,
        reason: &str,
    ) -> Result<Payment, LedgerError> {
        let txn = self.storage.begin_write()?;
        let payment = self.ledger.mark_failed(&txn, intent_id, reason)?;
        txn.commit().map_err(StorageError::from)?;

        self.notifier.request(
            NotificationKind::PaymentFailed,
            payment.payer_id,
            payment.payment_id.clone(),
            format!("Payment failed: {reason}"),
        );
        Ok(payment)
    }

    /// Get a payment row
    pub fn payment(&self, payment_id: &str) -> Result<Option<Payment>, LedgerError> {
        self.ledger.get_payment(payment_id)
    }

    // ========== Refund Workflow ==========

    /// Create a refund request against a paid payment
    pub fn request_refund(
        &self,
        target: RefundTarget,
        payment_id: &str,
        requested_by: i64,
        amount: f64,
        reason: &str,
    ) -> Result<Refund, RefundError> {
        let txn = self.storage.begin_write()?;
        let refund =
            self.refunds
                .create_request(&txn, target, payment_id, requested_by, amount, reason)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(refund)
    }

    /// Move a refund to Processing
    pub fn begin_refund(&self, refund_id: &str) -> Result<Refund, RefundError> {
        let txn = self.storage.begin_write()?;
        let refund = self.refunds.begin_processing(&txn, refund_id)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(refund)
    }

    /// Settle a refund as succeeded (drives Paid → Refunded on the payment)
    pub fn complete_refund_success(
        &self,
        refund_id: &str,
        gateway_refund_id: Option<&str>,
    ) -> Result<Refund, RefundError> {
        let txn = self.storage.begin_write()?;
        let (refund, newly) = self
            .refunds
            .complete_success(&txn, refund_id, gateway_refund_id)?;
        txn.commit().map_err(StorageError::from)?;

        if newly
            && let Ok(Some(payment)) = self.ledger.get_payment(&refund.payment_id)
        {
            self.notifier.request(
                NotificationKind::RefundSettled,
                payment.payer_id,
                refund.refund_id.clone(),
                format!("Refund of {:.2} settled", refund.amount),
            );
        }
        Ok(refund)
    }

    /// Record a refund failure (retryable)
    pub fn complete_refund_failure(
        &self,
        refund_id: &str,
        error: &str,
    ) -> Result<Refund, RefundError> {
        let txn = self.storage.begin_write()?;
        let (refund, newly) = self.refunds.complete_failure(&txn, refund_id, error)?;
        txn.commit().map_err(StorageError::from)?;

        if newly
            && let Ok(Some(payment)) = self.ledger.get_payment(&refund.payment_id)
        {
            self.notifier.request(
                NotificationKind::RefundFailed,
                payment.payer_id,
                refund.refund_id.clone(),
                format!("Refund attempt failed: {error}"),
            );
        }
        Ok(refund)
    }

    /// Cancel a pending refund
    pub fn cancel_refund(&self, refund_id: &str, admin_notes: &str) -> Result<Refund, RefundError> {
        let txn = self.storage.begin_write()?;
        let refund = self.refunds.cancel(&txn, refund_id, admin_notes)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(refund)
    }

    /// Bump a failed refund's retry counter
    pub fn increment_refund_retry(&self, refund_id: &str) -> Result<Refund, RefundError> {
        let txn = self.storage.begin_write()?;
        let refund = self.refunds.increment_retry(&txn, refund_id)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(refund)
    }

    /// Get a refund row
    pub fn refund(&self, refund_id: &str) -> Result<Option<Refund>, RefundError> {
        self.refunds.get_refund(refund_id)
    }

    // ========== Webhook Inbox ==========

    /// Ingest an inbound gateway event
    ///
    /// The event is durably recorded (dedup on external id) before dispatch;
    /// a dispatch failure marks it Failed for the sweep to retry and still
    /// returns Accepted — the delivery itself is acknowledged.
    pub fn ingest_webhook(
        &self,
        external_event_id: &str,
        event_type: &str,
        source: &str,
        payload: serde_json::Value,
    ) -> Result<IngestStatus, InboxError> {
        let outcome = self
            .inbox
            .record(external_event_id, event_type, source, payload)?;
        let event = match outcome {
            IngestOutcome::Duplicate => return Ok(IngestStatus::Duplicate),
            IngestOutcome::Accepted(event) => event,
        };

        match self.dispatch(&event) {
            Ok(()) => self.inbox.mark_processed(&event)?,
            Err(e) => self.inbox.mark_failed(&event, &e.to_string())?,
        }
        Ok(IngestStatus::Accepted)
    }

    /// Retry all pending/failed inbox events
    ///
    /// The system's sole retry mechanism for gateway-driven state changes;
    /// run periodically by [`InboxSweeper`](crate::webhook::InboxSweeper).
    pub fn sweep_inbox(&self) -> Result<SweepReport, InboxError> {
        let events = self.inbox.unprocessed()?;
        let mut report = SweepReport {
            retried: events.len(),
            ..Default::default()
        };

        for event in &events {
            match self.dispatch(event) {
                Ok(()) => {
                    self.inbox.mark_processed(event)?;
                    report.processed += 1;
                }
                Err(e) => {
                    self.inbox.mark_failed(event, &e.to_string())?;
                    report.failed += 1;
                }
            }
        }

        if report.retried > 0 {
            tracing::info!(
                retried = report.retried,
                processed = report.processed,
                failed = report.failed,
                "Inbox sweep finished"
            );
        }
        Ok(report)
    }

    /// Apply one recorded gateway event to the ledger/refund workflow
    fn dispatch(&self, event: &WebhookEvent) -> Result<(), InboxError> {
        let notice = parse_notice(&event.event_type, &event.payload)?;
        match notice {
            GatewayNotice::PaymentSucceeded {
                intent_id,
                gateway_payment_id,
            } => self
                .confirm_payment(&intent_id, gateway_payment_id.as_deref())
                .map(|_| ())
                .map_err(|e| InboxError::Dispatch(e.to_string())),
            GatewayNotice::PaymentFailed { intent_id, reason } => self
                .mark_payment_failed(&intent_id, reason.as_deref().unwrap_or("gateway failure"))
                .map(|_| ())
                .map_err(|e| InboxError::Dispatch(e.to_string())),
            GatewayNotice::RefundSucceeded {
                refund_id,
                gateway_refund_id,
            } => self
                .complete_refund_success(&refund_id, gateway_refund_id.as_deref())
                .map(|_| ())
                .map_err(|e| InboxError::Dispatch(e.to_string())),
            GatewayNotice::RefundFailed { refund_id, error } => self
                .complete_refund_failure(&refund_id, error.as_deref().unwrap_or("gateway failure"))
                .map(|_| ())
                .map_err(|e| InboxError::Dispatch(e.to_string())),
        }
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &CoreStorage {
        &self.storage
    }

    pub fn bookings(&self) -> &BookingsManager {
        &self.bookings
    }

    pub fn inventory(&self) -> &RoomInventory {
        &self.inventory
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
