//! Booking state machine
//!
//! Event-sourced booking lifecycle:
//!
//! - **actions**: command handlers (validate → emit events)
//! - **appliers**: event folding into snapshots
//! - **manager**: BookingsManager for command processing, persistence and
//!   broadcast
//! - **reducer**: reference replay implementation
//!
//! # Data Flow
//!
//! 1. A caller submits a BookingCommand
//! 2. BookingsManager validates and processes the command
//! 3. BookingEvents are generated with global sequence numbers
//! 4. Events + snapshots are persisted to redb (transactional)
//! 5. Events are broadcast to subscribers; notification requests go out

pub mod actions;
pub mod appliers;
pub mod manager;
pub mod reducer;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use manager::{BookingsManager, InTxnOutcome, ManagerError, ManagerResult};
pub use reducer::replay_booking;
pub use traits::{BookingError, CommandContext, CommandHandler, CommandMetadata, EventApplier};

// Re-export shared types for convenience
pub use shared::booking::{
    BookingCommand, BookingCommandPayload, BookingEvent, BookingEventType, BookingSnapshot,
    BookingStatus, CommandError, CommandErrorCode, CommandResponse,
};
