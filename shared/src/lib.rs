//! Shared types for the booking platform core
//!
//! Domain row models, booking command/event/snapshot types and id/time
//! utilities used by the `booking-core` engine and its callers.

pub mod booking;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use booking::{
    BookingCommand, BookingCommandPayload, BookingEvent, BookingEventType, BookingSnapshot,
    BookingStatus, CommandError, CommandErrorCode, CommandResponse, EventPayload,
};
pub use models::{
    BlockedDateRange, Payment, PaymentStatus, PayTarget, Refund, RefundStatus, RefundTarget,
    Room, RoomStatus, SeasonalPricingRule, WebhookEvent, WebhookStatus,
};
