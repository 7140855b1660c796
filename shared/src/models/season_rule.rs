//! Seasonal pricing rule model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Seasonal pricing rule
///
/// Rules may overlap in time for the same room; for any given night the rule
/// with the latest `created_at` wins (most-recently-defined override).
/// Rules are soft-deactivated via `is_active`, never hard-deleted while a
/// price calculation may still reference them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPricingRule {
    pub id: i64,
    pub room_id: i64,
    pub name: String,
    /// First covered day (inclusive)
    pub start_date: NaiveDate,
    /// Last covered day (inclusive)
    pub end_date: NaiveDate,
    /// Price per night while the rule covers the night
    pub nightly_price: f64,
    /// Price per hour (hourly stays)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_price: Option<f64>,
    /// Minimum stay length in nights, advisory to the booking lifecycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stay_nights: Option<i32>,
    pub is_active: bool,
    pub created_by: Option<i64>,
    /// Creation timestamp (Unix millis) — precedence key for overlaps
    pub created_at: i64,
}

impl SeasonalPricingRule {
    /// Whether the rule covers the given night (inclusive interval)
    pub fn covers(&self, night: NaiveDate) -> bool {
        self.start_date <= night && night <= self.end_date
    }
}

/// Create seasonal rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonRuleCreate {
    pub room_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nightly_price: f64,
    pub hourly_price: Option<f64>,
    pub min_stay_nights: Option<i32>,
    pub created_by: Option<i64>,
}
