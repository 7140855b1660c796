//! Hash-chained audit log
//!
//! Every state transition, payment/refund status change and inventory
//! mutation appends an immutable entry. Entries carry a SHA-256 hash chain
//! (`prev_hash`/`curr_hash`) so tampering and gaps are detectable.

pub mod service;
pub mod types;

pub use service::AuditService;
pub use types::{AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry};
