//! Driver profile model, 1:1 with a driver-role user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::ComfortLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub make: String,
    pub model: String,
    pub color: String,
    pub plate: String,
}

/// Driver profile record. Only the driver themself mutates it
/// (online/offline toggles and location pings).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub user_id: String,
    pub is_online: bool,
    pub coords: Option<[f64; 2]>,
    #[serde(default)]
    pub comfort_level: Option<ComfortLevel>,
    #[serde(default)]
    pub driver_license_number: Option<String>,
    #[serde(default)]
    pub car: Option<Car>,
    pub updated_at: DateTime<Utc>,
}
