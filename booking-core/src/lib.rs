//! Booking Availability & Payment Lifecycle Core
//!
//! The stateful heart of the platform: decides whether a room can be booked,
//! resolves seasonal pricing, and drives bookings, payments and refunds
//! through their state machines with exactly-once webhook ingestion.
//!
//! # Module structure
//!
//! ```text
//! booking-core/src/
//! ├── config.rs       # Environment-driven configuration
//! ├── storage.rs      # redb persistence layer (single database, one writer)
//! ├── money.rs        # Decimal-backed monetary arithmetic
//! ├── pricing/        # Seasonal price resolution
//! ├── availability.rs # Blocked-range and booking overlap checks
//! ├── bookings/       # Booking state machine (actions/appliers/manager)
//! ├── payments/       # Payment ledger
//! ├── refunds/        # Refund workflow
//! ├── webhook/        # Gateway inbox: dedup, dispatch, sweep
//! ├── audit/          # Hash-chained audit log
//! ├── inventory.rs    # Rooms, blocked ranges, seasonal rules
//! ├── notify.rs       # Fire-and-forget notification requests
//! └── engine.rs       # Facade wiring the modules together
//! ```
//!
//! # Command Flow
//!
//! ```text
//! CreateBooking → AvailabilityGuard → PricingResolver → BookingCreated (Pending)
//!       ↓ open_payment_intent
//! gateway webhook → WebhookInbox (dedup) → PaymentLedger.confirm_paid
//!       ↓ same transaction
//! BookingReserved → broadcast + notification request
//! ```

pub mod audit;
pub mod availability;
pub mod bookings;
pub mod config;
pub mod engine;
pub mod inventory;
pub mod money;
pub mod notify;
pub mod payments;
pub mod pricing;
pub mod refunds;
pub mod storage;
pub mod webhook;

// Re-export public surface
pub use availability::AvailabilityReport;
pub use bookings::BookingsManager;
pub use config::{CancellationRefundPolicy, Config, MinStayEnforcement};
pub use engine::Engine;
pub use inventory::RoomInventory;
pub use payments::{LedgerError, PaymentLedger};
pub use pricing::{PriceBreakdown, PricingError};
pub use refunds::{RefundError, RefundWorkflow};
pub use storage::{CoreStorage, StorageError};
pub use webhook::{InboxSweeper, IngestStatus, SweepReport, WebhookInbox};
