//! CancelBooking command handler
//!
//! Tourist or staff action, permitted from Pending and Reserved only. When a
//! paid payment exists the manager injects it so the cancellation event
//! records that a refund is owed; under the AutoRequest policy the refund
//! request row is written in the same transaction (by the engine), keeping
//! cancellation-with-payment and refund initiation atomic.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload};

/// CancelBooking action
#[derive(Debug, Clone)]
pub struct CancelBookingAction {
    pub booking_id: String,
    pub reason: Option<String>,
    /// Paid payment currently held against this booking, injected by the
    /// manager from the paid-target index
    pub paid_payment_id: Option<String>,
}

#[async_trait]
impl CommandHandler for CancelBookingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        let snapshot = ctx.load_snapshot(&self.booking_id)?;

        // Checked-in and checked-out stays can no longer be cancelled
        if !matches!(
            snapshot.status,
            BookingStatus::Pending | BookingStatus::Reserved
        ) {
            return Err(BookingError::InvalidTransition {
                from: snapshot.status,
                action: "cancel_booking",
            });
        }

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            self.booking_id.clone(),
            metadata.actor_id,
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::BookingCancelled,
            EventPayload::BookingCancelled {
                reason: self.reason.clone(),
                refund_required: self.paid_payment_id.is_some(),
                paid_payment_id: self.paid_payment_id.clone(),
            },
        );

        Ok(vec![event])
    }
}
