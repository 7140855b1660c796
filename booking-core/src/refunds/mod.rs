//! Refund workflow
//!
//! Owns the refund row state machine; the only module that completes refunds
//! and the only path to `PaymentLedger::mark_refunded`.

pub mod workflow;

pub use workflow::{RefundError, RefundWorkflow};
