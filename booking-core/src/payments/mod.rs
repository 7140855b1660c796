//! Payment ledger
//!
//! Owns the payment row state machine and the at-most-one-paid-per-target
//! invariant. The only module allowed to write payment rows.

pub mod ledger;

pub use ledger::{LedgerError, PaymentLedger};
