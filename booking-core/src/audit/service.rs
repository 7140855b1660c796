//! Audit service
//!
//! Appends hash-chained entries inside the caller's write transaction, so an
//! audit record commits atomically with the state change it describes. The
//! chain tip is always read from storage within the transaction: an aborted
//! transaction leaves no dangling tip.

use sha2::{Digest, Sha256};

use crate::storage::{CoreStorage, StorageResult};

use super::types::{AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry};

/// Page size used when walking the chain during verification
const VERIFY_BATCH: usize = 256;

/// Audit service
#[derive(Clone)]
pub struct AuditService {
    storage: CoreStorage,
}

impl AuditService {
    pub fn new(storage: CoreStorage) -> Self {
        Self { storage }
    }

    /// Append one entry within the caller's transaction
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &self,
        txn: &redb::WriteTransaction,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        actor_id: Option<i64>,
        actor_name: Option<&str>,
        details: serde_json::Value,
    ) -> StorageResult<AuditEntry> {
        let prev_hash = self
            .storage
            .last_audit_entry_txn(txn)?
            .map(|e| e.curr_hash)
            .unwrap_or_default();

        let id = self.storage.next_audit_id(txn)?;
        let timestamp = shared::util::now_millis();

        let mut entry = AuditEntry {
            id,
            timestamp,
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            actor_id,
            actor_name: actor_name.map(|s| s.to_string()),
            details,
            prev_hash,
            curr_hash: String::new(),
        };
        entry.curr_hash = compute_hash(&entry);

        self.storage.append_audit(txn, &entry)?;
        tracing::debug!(
            audit_id = entry.id,
            action = %entry.action,
            resource = %entry.resource_id,
            "Audit entry appended"
        );
        Ok(entry)
    }

    /// Walk the full chain and report breaks
    pub fn verify_chain(&self) -> StorageResult<AuditChainVerification> {
        let mut breaks = Vec::new();
        let mut total = 0u64;
        let mut expected_prev = String::new();
        let mut from_id = 0u64;

        loop {
            let batch = self.storage.get_audit_entries(from_id, VERIFY_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for entry in &batch {
                total += 1;
                if entry.prev_hash != expected_prev {
                    breaks.push(AuditChainBreak {
                        entry_id: entry.id,
                        expected_prev_hash: expected_prev.clone(),
                        actual_prev_hash: entry.prev_hash.clone(),
                    });
                }
                let recomputed = compute_hash(entry);
                if recomputed != entry.curr_hash {
                    breaks.push(AuditChainBreak {
                        entry_id: entry.id,
                        expected_prev_hash: recomputed,
                        actual_prev_hash: entry.curr_hash.clone(),
                    });
                }
                expected_prev = entry.curr_hash.clone();
            }
            from_id = batch.last().map(|e| e.id + 1).unwrap_or(u64::MAX);
        }

        Ok(AuditChainVerification {
            total_entries: total,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }

    /// Entries in id order starting at `from_id`
    pub fn entries(&self, from_id: u64, limit: usize) -> StorageResult<Vec<AuditEntry>> {
        self.storage.get_audit_entries(from_id, limit)
    }
}

/// SHA-256 over the canonical field serialization, excluding curr_hash
fn compute_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.prev_hash.as_bytes());
    hasher.update(entry.id.to_be_bytes());
    hasher.update(entry.timestamp.to_be_bytes());
    hasher.update(entry.action.to_string().as_bytes());
    hasher.update(entry.resource_type.as_bytes());
    hasher.update(entry.resource_id.as_bytes());
    if let Some(actor_id) = entry.actor_id {
        hasher.update(actor_id.to_be_bytes());
    }
    if let Some(name) = &entry.actor_name {
        hasher.update(name.as_bytes());
    }
    hasher.update(entry.details.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
