use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longitude-first, matching the `[longitude, latitude]` convention of
/// geospatial stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    Active,
    Inactive,
    OnBreak,
    Offline,
}

impl std::fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiderStatus::Active => "active",
            RiderStatus::Inactive => "inactive",
            RiderStatus::OnBreak => "on_break",
            RiderStatus::Offline => "offline",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDay {
    pub date: DateTime<Utc>,
    pub slots: Vec<AvailabilitySlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    pub id: Uuid,
    pub user: Uuid,
    pub phone: String,
    pub status: RiderStatus,
    pub location: GeoPoint,
    /// Set semantics: an order id appears at most once.
    pub current_orders: Vec<Uuid>,
    pub deliveries_completed: u64,
    pub capacity: u32,
    pub availability: Vec<AvailabilityDay>,
    pub created_at: DateTime<Utc>,
}

/// Partial update payload for a rider profile. The permission gate narrows
/// this to `status` and `location` for rider-role callers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderPatch {
    pub phone: Option<String>,
    pub status: Option<RiderStatus>,
    pub location: Option<GeoPoint>,
    pub capacity: Option<u32>,
    pub availability: Option<Vec<AvailabilityDay>>,
}
