//! Payment ledger
//!
//! State machine per payment row: Pending → Paid | Failed, Paid → Refunded.
//! A failed row is terminal; retrying means opening a new intent. All
//! operations run inside the caller's write transaction so the engine can
//! compose them with booking transitions and refund writes atomically.
//!
//! The `paid_targets` table is the at-most-one-paid guard: confirming a
//! payment claims the target's slot in the same transaction, so duplicate
//! webhook deliveries racing a manual confirmation cannot double-pay a
//! booking.

use redb::WriteTransaction;
use thiserror::Error;

use crate::audit::{AuditAction, AuditService};
use crate::money;
use crate::storage::{CoreStorage, StorageError};
use shared::models::{PayTarget, Payment, PaymentStatus};

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Unknown payment intent: {0}")]
    IntentNotFound(String),

    /// Caller error: the target already holds a paid payment
    #[error("Target {target} already paid by payment {payment_id}")]
    TargetAlreadyPaid { target: String, payment_id: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Payment {payment_id} in status {status:?} does not accept '{operation}'")]
    InvalidStatus {
        payment_id: String,
        status: PaymentStatus,
        operation: &'static str,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Payment ledger
#[derive(Clone)]
pub struct PaymentLedger {
    storage: CoreStorage,
    audit: AuditService,
    currency: String,
}

impl PaymentLedger {
    pub fn new(storage: CoreStorage, audit: AuditService, currency: String) -> Self {
        Self {
            storage,
            audit,
            currency,
        }
    }

    /// Open a payment intent for a target
    ///
    /// Creates a `Pending` row with fresh gateway correlation fields. A
    /// target that already holds a paid payment is a caller error.
    pub fn open_intent(
        &self,
        txn: &WriteTransaction,
        payer_id: i64,
        target: PayTarget,
        amount: f64,
        method: &str,
    ) -> LedgerResult<Payment> {
        money::validate_amount(amount, "payment amount").map_err(LedgerError::InvalidAmount)?;

        let target_key = target.key();
        if let Some(holder) = self
            .storage
            .get_paid_payment_for_target_txn(txn, &target_key)?
        {
            return Err(LedgerError::TargetAlreadyPaid {
                target: target_key,
                payment_id: holder,
            });
        }

        let now = shared::util::now_millis();
        let payment = Payment {
            payment_id: uuid::Uuid::new_v4().to_string(),
            payer_id,
            target,
            amount: money::round_money(amount),
            currency: self.currency.clone(),
            method: method.to_string(),
            status: PaymentStatus::Pending,
            intent_id: format!("pi_{}", uuid::Uuid::new_v4().simple()),
            gateway_payment_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.storage.store_payment(txn, &payment)?;
        self.storage
            .index_payment_intent(txn, &payment.intent_id, &payment.payment_id)?;
        self.audit.append(
            txn,
            AuditAction::PaymentIntentOpened,
            "payment",
            &payment.payment_id,
            Some(payer_id),
            None,
            serde_json::json!({
                "target": payment.target.key(),
                "amount": payment.amount,
                "intent_id": payment.intent_id,
            }),
        )?;

        tracing::info!(
            payment_id = %payment.payment_id,
            intent_id = %payment.intent_id,
            amount = payment.amount,
            "Payment intent opened"
        );
        Ok(payment)
    }

    /// Confirm a payment by its gateway correlation id
    ///
    /// Returns `(payment, newly_paid)`. Confirming an already-paid payment
    /// is a no-op (`newly_paid == false`) so webhook redeliveries are safe.
    pub fn confirm_paid(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> LedgerResult<(Payment, bool)> {
        let mut payment = self.payment_by_intent(txn, intent_id)?;

        match payment.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => return Ok((payment, false)),
            status => {
                return Err(LedgerError::InvalidStatus {
                    payment_id: payment.payment_id,
                    status,
                    operation: "confirm_paid",
                });
            }
        }

        // At-most-one-paid guard, atomic with the status flip
        let target_key = payment.target.key();
        if let Some(holder) =
            self.storage
                .try_claim_paid_target(txn, &target_key, &payment.payment_id)?
        {
            return Err(LedgerError::TargetAlreadyPaid {
                target: target_key,
                payment_id: holder,
            });
        }

        payment.status = PaymentStatus::Paid;
        payment.gateway_payment_id = gateway_payment_id.map(|s| s.to_string());
        payment.updated_at = shared::util::now_millis();
        self.storage.store_payment(txn, &payment)?;

        self.audit.append(
            txn,
            AuditAction::PaymentConfirmed,
            "payment",
            &payment.payment_id,
            None,
            None,
            serde_json::json!({
                "target": payment.target.key(),
                "amount": payment.amount,
                "gateway_payment_id": payment.gateway_payment_id,
            }),
        )?;

        tracing::info!(
            payment_id = %payment.payment_id,
            target = %payment.target.key(),
            "Payment confirmed"
        );
        Ok((payment, true))
    }

    /// Record a gateway failure for a pending payment
    ///
    /// Terminal for this row; the caller opens a new intent to retry.
    pub fn mark_failed(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
        reason: &str,
    ) -> LedgerResult<Payment> {
        let mut payment = self.payment_by_intent(txn, intent_id)?;

        match payment.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Failed => return Ok(payment),
            status => {
                return Err(LedgerError::InvalidStatus {
                    payment_id: payment.payment_id,
                    status,
                    operation: "mark_failed",
                });
            }
        }

        payment.status = PaymentStatus::Failed;
        payment.failure_reason = Some(reason.to_string());
        payment.updated_at = shared::util::now_millis();
        self.storage.store_payment(txn, &payment)?;

        self.audit.append(
            txn,
            AuditAction::PaymentFailed,
            "payment",
            &payment.payment_id,
            None,
            None,
            serde_json::json!({"reason": reason}),
        )?;

        tracing::warn!(
            payment_id = %payment.payment_id,
            reason = reason,
            "Payment marked failed"
        );
        Ok(payment)
    }

    /// Move a paid payment to Refunded and release its target slot
    ///
    /// Reachable only through refund workflow completion; the visibility is
    /// the module-boundary enforcement.
    pub(crate) fn mark_refunded(
        &self,
        txn: &WriteTransaction,
        payment_id: &str,
    ) -> LedgerResult<Payment> {
        let mut payment = self
            .storage
            .get_payment_txn(txn, payment_id)?
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;

        match payment.status {
            PaymentStatus::Paid => {}
            PaymentStatus::Refunded => return Ok(payment),
            status => {
                return Err(LedgerError::InvalidStatus {
                    payment_id: payment.payment_id,
                    status,
                    operation: "mark_refunded",
                });
            }
        }

        payment.status = PaymentStatus::Refunded;
        payment.updated_at = shared::util::now_millis();
        self.storage.store_payment(txn, &payment)?;
        self.storage.release_paid_target(txn, &payment.target.key())?;

        self.audit.append(
            txn,
            AuditAction::PaymentRefunded,
            "payment",
            &payment.payment_id,
            None,
            None,
            serde_json::json!({"target": payment.target.key(), "amount": payment.amount}),
        )?;

        tracing::info!(payment_id = %payment.payment_id, "Payment refunded");
        Ok(payment)
    }

    /// Get a payment row (committed state)
    pub fn get_payment(&self, payment_id: &str) -> LedgerResult<Option<Payment>> {
        Ok(self.storage.get_payment(payment_id)?)
    }

    fn payment_by_intent(
        &self,
        txn: &WriteTransaction,
        intent_id: &str,
    ) -> LedgerResult<Payment> {
        let payment_id = self
            .storage
            .get_payment_id_by_intent_txn(txn, intent_id)?
            .ok_or_else(|| LedgerError::IntentNotFound(intent_id.to_string()))?;
        self.storage
            .get_payment_txn(txn, &payment_id)?
            .ok_or(LedgerError::PaymentNotFound(payment_id))
    }
}
