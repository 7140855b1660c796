//! Refund workflow
//!
//! State machine: Pending → Processing → Succeeded | Failed, with Failed
//! retryable (IncrementRetry + re-begin) and Cancel permitted from Pending
//! only — a Processing refund may already be in flight at the gateway.
//!
//! Completion is idempotent: gateway confirmations can arrive through the
//! webhook inbox after an operator already settled the refund, so repeating
//! the same terminal outcome is a no-op.

use redb::WriteTransaction;
use thiserror::Error;

use crate::audit::{AuditAction, AuditService};
use crate::money::{self, to_decimal};
use crate::payments::{LedgerError, PaymentLedger};
use crate::storage::{CoreStorage, StorageError};
use shared::models::{PaymentStatus, Refund, RefundStatus, RefundTarget};

/// Refund errors
#[derive(Debug, Error)]
pub enum RefundError {
    #[error("Refund not found: {0}")]
    RefundNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Refund of {requested:.2} exceeds payment amount {available:.2}")]
    AmountExceedsPayment { requested: f64, available: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Payment {payment_id} is {status:?}, not refundable")]
    PaymentNotPaid {
        payment_id: String,
        status: PaymentStatus,
    },

    #[error("Refund {refund_id} in status {status:?} does not accept '{operation}'")]
    InvalidStatus {
        refund_id: String,
        status: RefundStatus,
        operation: &'static str,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type RefundResult<T> = Result<T, RefundError>;

/// Refund workflow
#[derive(Clone)]
pub struct RefundWorkflow {
    storage: CoreStorage,
    audit: AuditService,
    ledger: PaymentLedger,
}

impl RefundWorkflow {
    pub fn new(storage: CoreStorage, audit: AuditService, ledger: PaymentLedger) -> Self {
        Self {
            storage,
            audit,
            ledger,
        }
    }

    /// Create a refund request against a paid payment
    ///
    /// The amount is validated against the source payment before anything is
    /// persisted; an oversized request never creates a row.
    pub fn create_request(
        &self,
        txn: &WriteTransaction,
        target: RefundTarget,
        payment_id: &str,
        requested_by: i64,
        amount: f64,
        reason: &str,
    ) -> RefundResult<Refund> {
        money::validate_amount(amount, "refund amount").map_err(RefundError::InvalidAmount)?;

        let payment = self
            .storage
            .get_payment_txn(txn, payment_id)?
            .ok_or_else(|| RefundError::PaymentNotFound(payment_id.to_string()))?;

        if payment.status != PaymentStatus::Paid {
            return Err(RefundError::PaymentNotPaid {
                payment_id: payment.payment_id,
                status: payment.status,
            });
        }

        if to_decimal(amount) > to_decimal(payment.amount) {
            return Err(RefundError::AmountExceedsPayment {
                requested: amount,
                available: payment.amount,
            });
        }

        let now = shared::util::now_millis();
        let refund = Refund {
            refund_id: uuid::Uuid::new_v4().to_string(),
            target,
            payment_id: payment.payment_id.clone(),
            requested_by,
            amount: money::round_money(amount),
            reason: reason.to_string(),
            status: RefundStatus::Pending,
            retry_count: 0,
            gateway_refund_id: None,
            error_message: None,
            admin_notes: None,
            created_at: now,
            processed_at: None,
            completed_at: None,
        };

        self.storage.store_refund(txn, &refund)?;
        self.audit.append(
            txn,
            AuditAction::RefundRequested,
            "refund",
            &refund.refund_id,
            Some(requested_by),
            None,
            serde_json::json!({
                "payment_id": refund.payment_id,
                "amount": refund.amount,
                "reason": refund.reason,
            }),
        )?;

        tracing::info!(
            refund_id = %refund.refund_id,
            payment_id = %refund.payment_id,
            amount = refund.amount,
            "Refund requested"
        );
        Ok(refund)
    }

    /// Begin processing a pending (or failed, after a retry bump) refund
    pub fn begin_processing(
        &self,
        txn: &WriteTransaction,
        refund_id: &str,
    ) -> RefundResult<Refund> {
        let mut refund = self.load(txn, refund_id)?;

        match refund.status {
            RefundStatus::Pending | RefundStatus::Failed => {}
            RefundStatus::Processing => return Ok(refund),
            status => {
                return Err(RefundError::InvalidStatus {
                    refund_id: refund.refund_id,
                    status,
                    operation: "begin_processing",
                });
            }
        }

        refund.status = RefundStatus::Processing;
        refund.processed_at = Some(shared::util::now_millis());
        self.storage.store_refund(txn, &refund)?;

        self.audit.append(
            txn,
            AuditAction::RefundProcessing,
            "refund",
            &refund.refund_id,
            None,
            None,
            serde_json::json!({"retry_count": refund.retry_count}),
        )?;
        Ok(refund)
    }

    /// Settle a refund as succeeded
    ///
    /// Idempotent: a refund already Succeeded is returned unchanged
    /// (`newly == false`). Drives the ledger's Paid → Refunded flip in the
    /// same transaction.
    pub fn complete_success(
        &self,
        txn: &WriteTransaction,
        refund_id: &str,
        gateway_refund_id: Option<&str>,
    ) -> RefundResult<(Refund, bool)> {
        let mut refund = self.load(txn, refund_id)?;

        match refund.status {
            RefundStatus::Pending | RefundStatus::Processing | RefundStatus::Failed => {}
            RefundStatus::Succeeded => return Ok((refund, false)),
            RefundStatus::Cancelled => {
                return Err(RefundError::InvalidStatus {
                    refund_id: refund.refund_id,
                    status: RefundStatus::Cancelled,
                    operation: "complete_success",
                });
            }
        }

        refund.status = RefundStatus::Succeeded;
        refund.gateway_refund_id = gateway_refund_id.map(|s| s.to_string());
        refund.error_message = None;
        refund.completed_at = Some(shared::util::now_millis());
        self.storage.store_refund(txn, &refund)?;

        self.ledger.mark_refunded(txn, &refund.payment_id)?;

        self.audit.append(
            txn,
            AuditAction::RefundSucceeded,
            "refund",
            &refund.refund_id,
            None,
            None,
            serde_json::json!({
                "payment_id": refund.payment_id,
                "gateway_refund_id": refund.gateway_refund_id,
            }),
        )?;

        tracing::info!(refund_id = %refund.refund_id, "Refund succeeded");
        Ok((refund, true))
    }

    /// Record a gateway failure; retryable via [`increment_retry`](Self::increment_retry)
    pub fn complete_failure(
        &self,
        txn: &WriteTransaction,
        refund_id: &str,
        error: &str,
    ) -> RefundResult<(Refund, bool)> {
        let mut refund = self.load(txn, refund_id)?;

        match refund.status {
            RefundStatus::Pending | RefundStatus::Processing => {}
            RefundStatus::Failed => return Ok((refund, false)),
            status => {
                // Conflicting outcome after a terminal state: loud error
                return Err(RefundError::InvalidStatus {
                    refund_id: refund.refund_id,
                    status,
                    operation: "complete_failure",
                });
            }
        }

        refund.status = RefundStatus::Failed;
        refund.error_message = Some(error.to_string());
        self.storage.store_refund(txn, &refund)?;

        self.audit.append(
            txn,
            AuditAction::RefundFailed,
            "refund",
            &refund.refund_id,
            None,
            None,
            serde_json::json!({"error": error, "retry_count": refund.retry_count}),
        )?;

        tracing::warn!(refund_id = %refund.refund_id, error = error, "Refund failed");
        Ok((refund, true))
    }

    /// Bump the retry counter ahead of a re-attempt
    pub fn increment_retry(&self, txn: &WriteTransaction, refund_id: &str) -> RefundResult<Refund> {
        let mut refund = self.load(txn, refund_id)?;

        if refund.status != RefundStatus::Failed {
            return Err(RefundError::InvalidStatus {
                refund_id: refund.refund_id,
                status: refund.status,
                operation: "increment_retry",
            });
        }

        refund.retry_count += 1;
        self.storage.store_refund(txn, &refund)?;
        Ok(refund)
    }

    /// Cancel a refund request
    ///
    /// Only from Pending: once Processing, the gateway may already be acting
    /// on it.
    pub fn cancel(
        &self,
        txn: &WriteTransaction,
        refund_id: &str,
        admin_notes: &str,
    ) -> RefundResult<Refund> {
        let mut refund = self.load(txn, refund_id)?;

        if refund.status != RefundStatus::Pending {
            return Err(RefundError::InvalidStatus {
                refund_id: refund.refund_id,
                status: refund.status,
                operation: "cancel",
            });
        }

        refund.status = RefundStatus::Cancelled;
        refund.admin_notes = Some(admin_notes.to_string());
        self.storage.store_refund(txn, &refund)?;

        self.audit.append(
            txn,
            AuditAction::RefundCancelled,
            "refund",
            &refund.refund_id,
            None,
            None,
            serde_json::json!({"admin_notes": admin_notes}),
        )?;
        Ok(refund)
    }

    /// Get a refund row (committed state)
    pub fn get_refund(&self, refund_id: &str) -> RefundResult<Option<Refund>> {
        Ok(self.storage.get_refund(refund_id)?)
    }

    fn load(&self, txn: &WriteTransaction, refund_id: &str) -> RefundResult<Refund> {
        self.storage
            .get_refund_txn(txn, refund_id)?
            .ok_or_else(|| RefundError::RefundNotFound(refund_id.to_string()))
    }
}
