//! Domain row models
//!
//! Plain serde structs for the durable rows the core owns. Status enums use
//! SCREAMING_SNAKE_CASE on the wire. Mutation of these rows is reserved to
//! the owning modules in `booking-core`; everything else reads.

pub mod blocked_range;
pub mod payment;
pub mod refund;
pub mod room;
pub mod season_rule;
pub mod webhook;

pub use blocked_range::{BlockReason, BlockedDateRange};
pub use payment::{PayTarget, Payment, PaymentStatus};
pub use refund::{Refund, RefundStatus, RefundTarget};
pub use room::{Room, RoomCreate, RoomStatus};
pub use season_rule::{SeasonalPricingRule, SeasonRuleCreate};
pub use webhook::{WebhookEvent, WebhookStatus};
