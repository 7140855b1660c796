//! Room inventory
//!
//! The owning writer for Room, BlockedDateRange and SeasonalPricingRule
//! rows. A room's `status` is advisory display state: setting it never
//! affects what the availability guard decides — blocks and bookings are
//! authoritative.
//!
//! Expired blocked ranges (end date before today in the business timezone)
//! are removed by `purge_expired_blocks`, invoked by a host scheduler.

use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;

use crate::audit::{AuditAction, AuditService};
use crate::money;
use crate::storage::{CoreStorage, StorageError};
use shared::models::{
    BlockReason, BlockedDateRange, Room, RoomCreate, RoomStatus, SeasonRuleCreate,
    SeasonalPricingRule,
};

/// Inventory errors
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    #[error("Pricing rule not found: {0} for room {1}")]
    RuleNotFound(i64, i64),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Room inventory service
#[derive(Clone)]
pub struct RoomInventory {
    storage: CoreStorage,
    audit: AuditService,
    tz: Tz,
}

impl RoomInventory {
    pub fn new(storage: CoreStorage, audit: AuditService, tz: Tz) -> Self {
        Self { storage, audit, tz }
    }

    // ========== Rooms ==========

    /// Create a room
    pub fn create_room(&self, create: RoomCreate, created_by: i64) -> InventoryResult<Room> {
        if create.base_nightly_rate < 0.0 || !create.base_nightly_rate.is_finite() {
            return Err(InventoryError::InvalidAmount(format!(
                "base nightly rate must be non-negative and finite, got {}",
                create.base_nightly_rate
            )));
        }

        let now = shared::util::now_millis();
        let room = Room {
            id: shared::util::snowflake_id(),
            business_id: create.business_id,
            name: create.name,
            base_nightly_rate: money::round_money(create.base_nightly_rate),
            base_hourly_rate: create.base_hourly_rate,
            capacity: create.capacity,
            status: RoomStatus::Available,
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        self.storage.store_room(&txn, &room)?;
        self.audit.append(
            &txn,
            AuditAction::RoomUpserted,
            "room",
            &room.id.to_string(),
            Some(created_by),
            None,
            serde_json::json!({"name": room.name, "base_nightly_rate": room.base_nightly_rate}),
        )?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(room_id = room.id, name = %room.name, "Room created");
        Ok(room)
    }

    /// Set the advisory room status
    pub fn set_room_status(
        &self,
        room_id: i64,
        status: RoomStatus,
        actor_id: i64,
    ) -> InventoryResult<Room> {
        let txn = self.storage.begin_write()?;
        let mut room = self
            .storage
            .get_room_txn(&txn, room_id)?
            .ok_or(InventoryError::RoomNotFound(room_id))?;

        let old = room.status;
        room.status = status;
        room.updated_at = shared::util::now_millis();
        self.storage.store_room(&txn, &room)?;
        self.audit.append(
            &txn,
            AuditAction::RoomStatusChanged,
            "room",
            &room_id.to_string(),
            Some(actor_id),
            None,
            serde_json::json!({"old": old, "new": status}),
        )?;
        txn.commit().map_err(StorageError::from)?;
        Ok(room)
    }

    /// Get a room
    pub fn get_room(&self, room_id: i64) -> InventoryResult<Option<Room>> {
        Ok(self.storage.get_room(room_id)?)
    }

    // ========== Blocked Ranges ==========

    /// Create an administrative hold on a room
    #[allow(clippy::too_many_arguments)]
    pub fn add_blocked_range(
        &self,
        room_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: BlockReason,
        note: Option<String>,
        created_by: i64,
    ) -> InventoryResult<BlockedDateRange> {
        if end_date < start_date {
            return Err(InventoryError::InvalidRange(format!(
                "end date {end_date} before start date {start_date}"
            )));
        }

        let txn = self.storage.begin_write()?;
        if self.storage.get_room_txn(&txn, room_id)?.is_none() {
            return Err(InventoryError::RoomNotFound(room_id));
        }

        let block = BlockedDateRange {
            id: shared::util::snowflake_id(),
            room_id,
            start_date,
            end_date,
            reason,
            note,
            created_by,
            created_at: shared::util::now_millis(),
        };
        self.storage.store_blocked_range(&txn, &block)?;
        self.audit.append(
            &txn,
            AuditAction::RoomBlocked,
            "room",
            &room_id.to_string(),
            Some(created_by),
            None,
            serde_json::json!({
                "block_id": block.id,
                "start": block.start_date,
                "end": block.end_date,
                "reason": block.reason,
            }),
        )?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            room_id = room_id,
            block_id = block.id,
            "Blocked range created"
        );
        Ok(block)
    }

    /// Remove an administrative hold; returns whether it existed
    pub fn remove_blocked_range(
        &self,
        room_id: i64,
        block_id: i64,
        actor_id: i64,
    ) -> InventoryResult<bool> {
        let txn = self.storage.begin_write()?;
        let removed = self.storage.remove_blocked_range(&txn, room_id, block_id)?;
        if removed {
            self.audit.append(
                &txn,
                AuditAction::RoomUnblocked,
                "room",
                &room_id.to_string(),
                Some(actor_id),
                None,
                serde_json::json!({"block_id": block_id}),
            )?;
        }
        txn.commit().map_err(StorageError::from)?;
        Ok(removed)
    }

    /// Blocked ranges for a room
    pub fn blocked_ranges(&self, room_id: i64) -> InventoryResult<Vec<BlockedDateRange>> {
        Ok(self.storage.get_blocked_ranges(room_id)?)
    }

    /// Remove every block that ended before today (business timezone)
    ///
    /// Returns the number of purged rows.
    pub fn purge_expired_blocks(&self) -> InventoryResult<usize> {
        let today = chrono::Utc::now().with_timezone(&self.tz).date_naive();
        let expired: Vec<BlockedDateRange> = self
            .storage
            .get_all_blocked_ranges()?
            .into_iter()
            .filter(|b| b.is_expired(today))
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let txn = self.storage.begin_write()?;
        for block in &expired {
            self.storage
                .remove_blocked_range(&txn, block.room_id, block.id)?;
        }
        self.audit.append(
            &txn,
            AuditAction::BlockedRangesPurged,
            "room",
            "*",
            None,
            None,
            serde_json::json!({"purged": expired.len(), "cutoff": today}),
        )?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(purged = expired.len(), "Expired blocked ranges purged");
        Ok(expired.len())
    }

    // ========== Seasonal Rules ==========

    /// Create a seasonal pricing rule
    pub fn create_season_rule(
        &self,
        create: SeasonRuleCreate,
    ) -> InventoryResult<SeasonalPricingRule> {
        if create.end_date < create.start_date {
            return Err(InventoryError::InvalidRange(format!(
                "end date {} before start date {}",
                create.end_date, create.start_date
            )));
        }
        money::validate_amount(create.nightly_price, "nightly price")
            .map_err(InventoryError::InvalidAmount)?;

        let txn = self.storage.begin_write()?;
        if self.storage.get_room_txn(&txn, create.room_id)?.is_none() {
            return Err(InventoryError::RoomNotFound(create.room_id));
        }

        let rule = SeasonalPricingRule {
            id: shared::util::snowflake_id(),
            room_id: create.room_id,
            name: create.name,
            start_date: create.start_date,
            end_date: create.end_date,
            nightly_price: money::round_money(create.nightly_price),
            hourly_price: create.hourly_price,
            min_stay_nights: create.min_stay_nights,
            is_active: true,
            created_by: create.created_by,
            created_at: shared::util::now_millis(),
        };
        self.storage.store_season_rule(&txn, &rule)?;
        self.audit.append(
            &txn,
            AuditAction::SeasonRuleCreated,
            "season_rule",
            &rule.id.to_string(),
            rule.created_by,
            None,
            serde_json::json!({
                "room_id": rule.room_id,
                "start": rule.start_date,
                "end": rule.end_date,
                "nightly_price": rule.nightly_price,
            }),
        )?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(rule_id = rule.id, room_id = rule.room_id, "Season rule created");
        Ok(rule)
    }

    /// Soft-deactivate a rule; the row stays for past price calculations
    pub fn deactivate_season_rule(
        &self,
        room_id: i64,
        rule_id: i64,
        actor_id: i64,
    ) -> InventoryResult<SeasonalPricingRule> {
        let txn = self.storage.begin_write()?;
        let rules = self.storage.get_season_rules_txn(&txn, room_id)?;
        let mut rule = rules
            .into_iter()
            .find(|r| r.id == rule_id)
            .ok_or(InventoryError::RuleNotFound(rule_id, room_id))?;

        if rule.is_active {
            rule.is_active = false;
            self.storage.store_season_rule(&txn, &rule)?;
            self.audit.append(
                &txn,
                AuditAction::SeasonRuleDeactivated,
                "season_rule",
                &rule_id.to_string(),
                Some(actor_id),
                None,
                serde_json::json!({"room_id": room_id}),
            )?;
        }
        txn.commit().map_err(StorageError::from)?;
        Ok(rule)
    }

    /// Seasonal rules for a room (active and inactive)
    pub fn season_rules(&self, room_id: i64) -> InventoryResult<Vec<SeasonalPricingRule>> {
        Ok(self.storage.get_season_rules(room_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> RoomInventory {
        let storage = CoreStorage::open_in_memory().unwrap();
        let audit = AuditService::new(storage.clone());
        RoomInventory::new(storage, audit, chrono_tz::Europe::Madrid)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_room(inventory: &RoomInventory) -> Room {
        inventory
            .create_room(
                RoomCreate {
                    business_id: 10,
                    name: "Sea View".to_string(),
                    base_nightly_rate: 1000.0,
                    base_hourly_rate: None,
                    capacity: 4,
                },
                42,
            )
            .unwrap()
    }

    #[test]
    fn test_create_room_and_set_status() {
        let inventory = setup();
        let room = create_room(&inventory);
        assert_eq!(room.status, RoomStatus::Available);

        let updated = inventory
            .set_room_status(room.id, RoomStatus::Maintenance, 42)
            .unwrap();
        assert_eq!(updated.status, RoomStatus::Maintenance);
    }

    #[test]
    fn test_advisory_status_does_not_block_range() {
        // Maintenance status alone creates no blocked range
        let inventory = setup();
        let room = create_room(&inventory);
        inventory
            .set_room_status(room.id, RoomStatus::Maintenance, 42)
            .unwrap();
        assert!(inventory.blocked_ranges(room.id).unwrap().is_empty());
    }

    #[test]
    fn test_add_and_remove_blocked_range() {
        let inventory = setup();
        let room = create_room(&inventory);

        let block = inventory
            .add_blocked_range(
                room.id,
                date(2025, 12, 24),
                date(2025, 12, 26),
                BlockReason::Maintenance,
                None,
                42,
            )
            .unwrap();
        assert_eq!(inventory.blocked_ranges(room.id).unwrap().len(), 1);

        assert!(inventory.remove_blocked_range(room.id, block.id, 42).unwrap());
        assert!(inventory.blocked_ranges(room.id).unwrap().is_empty());
        assert!(!inventory.remove_blocked_range(room.id, block.id, 42).unwrap());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let inventory = setup();
        let room = create_room(&inventory);
        let result = inventory.add_blocked_range(
            room.id,
            date(2025, 12, 26),
            date(2025, 12, 24),
            BlockReason::OwnerHold,
            None,
            42,
        );
        assert!(matches!(result, Err(InventoryError::InvalidRange(_))));
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let inventory = setup();
        let room = create_room(&inventory);

        inventory
            .add_blocked_range(
                room.id,
                date(2020, 1, 1),
                date(2020, 1, 5),
                BlockReason::Maintenance,
                None,
                42,
            )
            .unwrap();
        inventory
            .add_blocked_range(
                room.id,
                date(2099, 1, 1),
                date(2099, 1, 5),
                BlockReason::Maintenance,
                None,
                42,
            )
            .unwrap();

        let purged = inventory.purge_expired_blocks().unwrap();
        assert_eq!(purged, 1);
        assert_eq!(inventory.blocked_ranges(room.id).unwrap().len(), 1);
    }

    #[test]
    fn test_deactivate_rule_is_soft() {
        let inventory = setup();
        let room = create_room(&inventory);
        let rule = inventory
            .create_season_rule(SeasonRuleCreate {
                room_id: room.id,
                name: "Peak".to_string(),
                start_date: date(2025, 12, 20),
                end_date: date(2025, 12, 31),
                nightly_price: 1500.0,
                hourly_price: None,
                min_stay_nights: None,
                created_by: Some(42),
            })
            .unwrap();
        assert!(rule.is_active);

        inventory
            .deactivate_season_rule(room.id, rule.id, 42)
            .unwrap();

        // Row is still there, flagged inactive
        let rules = inventory.season_rules(room.id).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].is_active);
    }

    #[test]
    fn test_rule_for_unknown_room_rejected() {
        let inventory = setup();
        let result = inventory.create_season_rule(SeasonRuleCreate {
            room_id: 999,
            name: "Peak".to_string(),
            start_date: date(2025, 12, 20),
            end_date: date(2025, 12, 31),
            nightly_price: 1500.0,
            hourly_price: None,
            min_stay_nights: None,
            created_by: None,
        });
        assert!(matches!(result, Err(InventoryError::RoomNotFound(999))));
    }
}
