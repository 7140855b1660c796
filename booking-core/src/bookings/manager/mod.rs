//! BookingsManager - command processing and event generation
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Convert command to action and execute
//!     ├─ 5. Apply events to snapshots via EventApplier
//!     ├─ 6. Persist events, snapshots, indices
//!     ├─ 7. Append audit entries
//!     ├─ 8. Mark command processed
//!     ├─ 9. Commit transaction
//!     ├─ 10. Broadcast event(s) + notification requests
//!     └─ 11. Return response
//! ```
//!
//! `execute_in_txn` exposes steps 3-8 to the engine so payment-driven
//! transitions (Pending → Reserved on ConfirmPaid) and refund creation on
//! cancellation land in the same transaction as the triggering ledger write.

mod error;
pub use error::*;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::broadcast;

use super::actions::{
    BookingAction, CancelBookingAction, CheckInAction, CheckOutAction, CreateBookingAction,
    MarkReservedAction, UpdateStayDatesAction,
};
use super::appliers::EventAction;
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use crate::audit::{AuditAction, AuditService};
use crate::config::MinStayEnforcement;
use crate::notify::{NotificationKind, Notifier};
use crate::storage::{CoreStorage, StorageError};
use redb::WriteTransaction;
use shared::booking::{
    BookingCommand, BookingCommandPayload, BookingEvent, BookingEventType, BookingSnapshot,
    BookingStatus, CommandResponse,
};
use shared::models::PayTarget;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// Result of running a command inside an existing transaction
pub struct InTxnOutcome {
    /// Command was already processed; nothing was written
    pub duplicate: bool,
    /// Booking created by this command, if any
    pub booking_id: Option<String>,
    pub events: Vec<BookingEvent>,
}

/// BookingsManager for command processing
///
/// The `epoch` is a unique identifier generated on each startup. Clients use
/// it to detect server restarts and trigger full resync.
pub struct BookingsManager {
    storage: CoreStorage,
    audit: AuditService,
    notifier: Notifier,
    event_tx: broadcast::Sender<BookingEvent>,
    epoch: String,
    tz: Tz,
    min_stay: MinStayEnforcement,
}

impl std::fmt::Debug for BookingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingsManager")
            .field("storage", &"<CoreStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl BookingsManager {
    pub fn new(
        storage: CoreStorage,
        audit: AuditService,
        notifier: Notifier,
        tz: Tz,
        min_stay: MinStayEnforcement,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "BookingsManager started with new epoch");
        Self {
            storage,
            audit,
            notifier,
            event_tx,
            epoch,
            tz,
            min_stay,
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &CoreStorage {
        &self.storage
    }

    /// Get a booking snapshot
    pub fn get_booking(&self, booking_id: &str) -> ManagerResult<Option<BookingSnapshot>> {
        Ok(self.storage.get_snapshot(booking_id)?)
    }

    /// Get the event stream for a booking
    pub fn get_events(&self, booking_id: &str) -> ManagerResult<Vec<BookingEvent>> {
        Ok(self.storage.get_events_for_booking(booking_id)?)
    }

    /// Execute a command and return the response
    ///
    /// Runs the booking state machine alone. Callers that need the
    /// cancellation-with-refund composition go through
    /// `Engine::execute_booking_command`, which wraps this manager's
    /// transaction together with the refund workflow.
    pub fn execute_command(&self, cmd: BookingCommand) -> CommandResponse {
        match self.process_command(cmd.clone()) {
            Ok((response, events)) => {
                self.broadcast_events(&events);
                response
            }
            Err(err) => CommandResponse::error(cmd.command_id, err.into()),
        }
    }

    /// Process a command in its own transaction
    fn process_command(
        &self,
        cmd: BookingCommand,
    ) -> ManagerResult<(CommandResponse, Vec<BookingEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. Begin write transaction and run
        let txn = self.storage.begin_write()?;
        let outcome = self.execute_in_txn(&txn, &cmd)?;
        if outcome.duplicate {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 3. Commit
        txn.commit().map_err(StorageError::from)?;

        let booking_id = outcome
            .booking_id
            .clone()
            .or_else(|| outcome.events.first().map(|e| e.booking_id.clone()));
        tracing::info!(
            command_id = %cmd.command_id,
            booking_id = ?booking_id,
            event_count = outcome.events.len(),
            "Command processed successfully"
        );
        Ok((
            CommandResponse::success(cmd.command_id, outcome.booking_id),
            outcome.events,
        ))
    }

    /// Run a command inside the caller's transaction
    ///
    /// Persists events, snapshots, indices and audit entries, and marks the
    /// command processed, but neither commits nor broadcasts: that is the
    /// caller's responsibility (see [`broadcast_events`](Self::broadcast_events)).
    pub fn execute_in_txn(
        &self,
        txn: &WriteTransaction,
        cmd: &BookingCommand,
    ) -> ManagerResult<InTxnOutcome> {
        // Double-check idempotency within the transaction
        if self.storage.is_command_processed_txn(txn, &cmd.command_id)? {
            return Ok(InTxnOutcome {
                duplicate: true,
                booking_id: None,
                events: vec![],
            });
        }

        let current_sequence = self.storage.get_current_sequence()?;
        let mut ctx = CommandContext::new(txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            actor_id: cmd.actor_id,
            actor_name: cmd.actor_name.clone(),
            timestamp: cmd.timestamp,
        };

        // Convert to action, injecting config and pre-fetched state
        let action = self.build_action(txn, &cmd.payload)?;
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        // Apply events to snapshots, recording status changes for audit
        let mut status_changes: Vec<(String, Option<BookingStatus>, BookingStatus)> = Vec::new();
        for event in &events {
            let (mut snapshot, old_status) = match ctx.load_snapshot(&event.booking_id) {
                Ok(snapshot) => {
                    let old = snapshot.status;
                    (snapshot, Some(old))
                }
                Err(_) => (BookingSnapshot::new(event.booking_id.clone()), None),
            };

            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
            status_changes.push((event.booking_id.clone(), old_status, snapshot.status));
            ctx.save_snapshot(snapshot);
        }

        // Persist events
        for event in &events {
            self.storage.store_event(txn, event)?;
        }

        // Persist snapshots and maintain indices
        let mut created_booking_id = None;
        for snapshot in ctx.modified_snapshots() {
            self.storage.store_snapshot(txn, snapshot)?;

            match snapshot.status {
                BookingStatus::Pending | BookingStatus::Reserved | BookingStatus::CheckedIn => {
                    self.storage.mark_booking_active(txn, &snapshot.booking_id)?;
                    self.storage
                        .index_room_booking(txn, snapshot.room_id, &snapshot.booking_id)?;
                }
                BookingStatus::CheckedOut => {
                    // Past stays keep their room-index entry: the interval
                    // still blocks its historical range
                    self.storage.mark_booking_inactive(txn, &snapshot.booking_id)?;
                }
                BookingStatus::Cancelled => {
                    self.storage.mark_booking_inactive(txn, &snapshot.booking_id)?;
                    self.storage
                        .unindex_room_booking(txn, snapshot.room_id, &snapshot.booking_id)?;
                }
            }
        }
        if let Some(event) = events.first()
            && event.event_type == BookingEventType::BookingCreated
        {
            created_booking_id = Some(event.booking_id.clone());
        }

        // Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(txn, max_sequence)?;
        }

        // Audit every transition
        for (event, (booking_id, old_status, new_status)) in events.iter().zip(&status_changes) {
            self.audit.append(
                txn,
                audit_action_for(event.event_type),
                "booking",
                booking_id,
                Some(event.actor_id),
                Some(event.actor_name.as_str()),
                serde_json::json!({
                    "old_status": old_status,
                    "new_status": new_status,
                    "event_id": event.event_id,
                }),
            )?;
        }

        // Mark command processed
        self.storage.mark_command_processed(txn, &cmd.command_id)?;

        Ok(InTxnOutcome {
            duplicate: false,
            booking_id: created_booking_id,
            events,
        })
    }

    /// Broadcast committed events and emit notification requests
    pub fn broadcast_events(&self, events: &[BookingEvent]) {
        for event in events {
            if self.event_tx.send(event.clone()).is_err() {
                tracing::warn!("Event broadcast failed: no active receivers");
            }
            self.notify_for_event(event);
        }
    }

    fn notify_for_event(&self, event: &BookingEvent) {
        let kind = match event.event_type {
            BookingEventType::BookingReserved => NotificationKind::BookingConfirmed,
            BookingEventType::BookingCancelled => NotificationKind::BookingCancelled,
            BookingEventType::GuestCheckedIn => NotificationKind::CheckInRecorded,
            BookingEventType::GuestCheckedOut => NotificationKind::CheckOutRecorded,
            BookingEventType::BookingCreated | BookingEventType::StayDatesUpdated => return,
        };
        let Ok(Some(snapshot)) = self.storage.get_snapshot(&event.booking_id) else {
            return;
        };
        self.notifier.request(
            kind,
            snapshot.tourist_id,
            event.booking_id.clone(),
            format!("Booking {} is now {:?}", event.booking_id, snapshot.status),
        );
    }

    fn build_action(
        &self,
        txn: &WriteTransaction,
        payload: &BookingCommandPayload,
    ) -> ManagerResult<BookingAction> {
        let action = match payload {
            BookingCommandPayload::CreateBooking {
                room_id,
                tourist_id,
                business_id,
                dates,
                party,
                source,
            } => BookingAction::CreateBooking(CreateBookingAction {
                room_id: *room_id,
                tourist_id: *tourist_id,
                business_id: *business_id,
                dates: *dates,
                party: party.clone(),
                source: *source,
                min_stay_mode: self.min_stay,
            }),
            BookingCommandPayload::MarkReserved {
                booking_id,
                payment_id,
            } => {
                let payment = self
                    .storage
                    .get_payment_txn(txn, payment_id)?
                    .ok_or_else(|| {
                        ManagerError::Internal(format!(
                            "Payment {} not found for reservation",
                            payment_id
                        ))
                    })?;
                BookingAction::MarkReserved(MarkReservedAction {
                    booking_id: booking_id.clone(),
                    payment_id: payment_id.clone(),
                    amount_paid: payment.amount,
                })
            }
            BookingCommandPayload::UpdateStayDates { booking_id, dates } => {
                BookingAction::UpdateStayDates(UpdateStayDatesAction {
                    booking_id: booking_id.clone(),
                    dates: *dates,
                    min_stay_mode: self.min_stay,
                })
            }
            BookingCommandPayload::CheckIn { booking_id } => {
                let today = Utc::now().with_timezone(&self.tz).date_naive();
                BookingAction::CheckIn(CheckInAction {
                    booking_id: booking_id.clone(),
                    today,
                })
            }
            BookingCommandPayload::CheckOut {
                booking_id,
                write_off_balance,
            } => BookingAction::CheckOut(CheckOutAction {
                booking_id: booking_id.clone(),
                write_off_balance: *write_off_balance,
            }),
            BookingCommandPayload::CancelBooking { booking_id, reason } => {
                let paid_payment_id = self
                    .storage
                    .get_paid_payment_for_target_txn(txn, &PayTarget::Booking(booking_id.clone()).key())?;
                BookingAction::CancelBooking(CancelBookingAction {
                    booking_id: booking_id.clone(),
                    reason: reason.clone(),
                    paid_payment_id,
                })
            }
        };
        Ok(action)
    }
}

fn audit_action_for(event_type: BookingEventType) -> AuditAction {
    match event_type {
        BookingEventType::BookingCreated => AuditAction::BookingCreated,
        BookingEventType::BookingReserved => AuditAction::BookingReserved,
        BookingEventType::StayDatesUpdated => AuditAction::BookingDatesChanged,
        BookingEventType::GuestCheckedIn => AuditAction::BookingCheckedIn,
        BookingEventType::GuestCheckedOut => AuditAction::BookingCheckedOut,
        BookingEventType::BookingCancelled => AuditAction::BookingCancelled,
    }
}
