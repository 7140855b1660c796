//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles one
//! specific command type.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::BookingEvent;

mod cancel_booking;
mod check_in;
mod check_out;
mod create_booking;
mod mark_reserved;
mod update_stay_dates;

pub use cancel_booking::CancelBookingAction;
pub use check_in::CheckInAction;
pub use check_out::CheckOutAction;
pub use create_booking::CreateBookingAction;
pub use mark_reserved::MarkReservedAction;
pub use update_stay_dates::UpdateStayDatesAction;

/// BookingAction enum - dispatches to concrete action implementations
pub enum BookingAction {
    CreateBooking(CreateBookingAction),
    MarkReserved(MarkReservedAction),
    UpdateStayDates(UpdateStayDatesAction),
    CheckIn(CheckInAction),
    CheckOut(CheckOutAction),
    CancelBooking(CancelBookingAction),
}

#[async_trait]
impl CommandHandler for BookingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        match self {
            BookingAction::CreateBooking(action) => action.execute(ctx, metadata).await,
            BookingAction::MarkReserved(action) => action.execute(ctx, metadata).await,
            BookingAction::UpdateStayDates(action) => action.execute(ctx, metadata).await,
            BookingAction::CheckIn(action) => action.execute(ctx, metadata).await,
            BookingAction::CheckOut(action) => action.execute(ctx, metadata).await,
            BookingAction::CancelBooking(action) => action.execute(ctx, metadata).await,
        }
    }
}
