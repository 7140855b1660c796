//! CreateBooking command handler
//!
//! Creates a booking in Pending after the availability and pricing gates
//! pass. Runs inside the manager's write transaction, so the availability
//! check and the insert are one logical unit.

use async_trait::async_trait;

use crate::availability;
use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use crate::config::MinStayEnforcement;
use crate::pricing::{min_stay_violation, resolve_with_rules, PricingError};
use shared::booking::{
    BookingEvent, BookingEventType, BookingSource, EventPayload, PartyInfo, StayDates,
};

/// CreateBooking action
#[derive(Debug, Clone)]
pub struct CreateBookingAction {
    pub room_id: i64,
    pub tourist_id: i64,
    pub business_id: i64,
    pub dates: StayDates,
    pub party: PartyInfo,
    pub source: BookingSource,
    /// Enforcement mode injected from config by the manager
    pub min_stay_mode: MinStayEnforcement,
}

#[async_trait]
impl CommandHandler for CreateBookingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Validate the date range
        self.dates
            .validate()
            .map_err(|e| BookingError::InvalidDateRange(e.to_string()))?;

        // 2. Validate party composition
        if self.party.adults < 1 {
            return Err(BookingError::InvalidParty(
                "at least one adult is required".to_string(),
            ));
        }
        if self.party.children < 0 {
            return Err(BookingError::InvalidParty(
                "children count cannot be negative".to_string(),
            ));
        }

        // 3. Load the room and check capacity
        let room = ctx
            .storage()
            .get_room_txn(ctx.txn(), self.room_id)
            .map_err(|e| BookingError::Storage(e.to_string()))?
            .ok_or(BookingError::RoomNotFound(self.room_id))?;
        if self.party.size() > room.capacity {
            return Err(BookingError::PartyExceedsCapacity {
                size: self.party.size(),
                capacity: room.capacity,
            });
        }

        // 4. Availability: both overlap checks must come back clean
        let report = availability::check_txn(
            ctx.storage(),
            ctx.txn(),
            self.room_id,
            self.dates.check_in,
            self.dates.check_out,
        )
        .map_err(|e| BookingError::Storage(e.to_string()))?;
        if !report.available {
            return Err(BookingError::RoomUnavailable {
                blocked: report.blocked_conflicts,
                bookings: report.booking_conflicts,
            });
        }

        // 5. Price resolution
        let rules = ctx
            .storage()
            .get_season_rules_txn(ctx.txn(), self.room_id)
            .map_err(|e| BookingError::Storage(e.to_string()))?;
        let breakdown = resolve_with_rules(&room, &rules, &self.dates).map_err(|e| match e {
            PricingError::NoApplicablePrice { room_id, .. } => {
                BookingError::NoApplicablePrice(room_id)
            }
            PricingError::RoomNotFound(id) => BookingError::RoomNotFound(id),
            PricingError::Storage(e) => BookingError::Storage(e.to_string()),
        })?;

        // 6. Minimum-stay constraints from covering rules
        if let Some(v) = min_stay_violation(&breakdown, &rules, self.min_stay_mode) {
            return Err(BookingError::MinStayNotMet {
                rule: v.rule_name,
                required: v.required_nights,
                actual: v.actual_nights,
            });
        }

        // 7. Emit BookingCreated; the full total is due until a payment lands
        let booking_id = uuid::Uuid::new_v4().to_string();
        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            booking_id,
            metadata.actor_id,
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::BookingCreated,
            EventPayload::BookingCreated {
                room_id: self.room_id,
                tourist_id: self.tourist_id,
                business_id: self.business_id,
                dates: self.dates,
                party: self.party.clone(),
                source: self.source,
                total_price: breakdown.total,
                segments: breakdown.segments,
                balance_due: breakdown.total,
            },
        );

        Ok(vec![event])
    }
}
