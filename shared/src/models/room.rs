//! Room Model

use serde::{Deserialize, Serialize};

/// Room display status
///
/// Advisory only: reflects intent for listings and dashboards. Availability
/// decisions are made from bookings and blocked ranges, never from this field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
    Reserved,
}

/// Room entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    /// Owning business
    pub business_id: i64,
    pub name: String,
    /// Base rate per night, used when no seasonal rule covers a night
    pub base_nightly_rate: f64,
    /// Base rate per hour (hourly stays)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_hourly_rate: Option<f64>,
    /// Maximum party size
    pub capacity: i32,
    pub status: RoomStatus,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Last update timestamp (Unix millis)
    pub updated_at: i64,
}

impl Room {
    /// Whether the room has any configured rate at all
    pub fn has_base_rate(&self) -> bool {
        self.base_nightly_rate > 0.0
    }
}

/// Create room payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreate {
    pub business_id: i64,
    pub name: String,
    pub base_nightly_rate: f64,
    pub base_hourly_rate: Option<f64>,
    pub capacity: i32,
}
