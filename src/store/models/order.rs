//! Order model and its status/comfort enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Service class used to match drivers to orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComfortLevel {
    Economy,
    Comfort,
    Business,
}

impl ComfortLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComfortLevel::Economy => "economy",
            ComfortLevel::Comfort => "comfort",
            ComfortLevel::Business => "business",
        }
    }
}

impl FromStr for ComfortLevel {
    type Err = ();

    /// Case-insensitive parse, so matching against stored values is exact.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economy" => Ok(ComfortLevel::Economy),
            "comfort" => Ok(ComfortLevel::Comfort),
            "business" => Ok(ComfortLevel::Business),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ComfortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    SearchingDriver,
    Accepted,
    Arrived,
    InProgress,
    Finished,
    CanceledByCustomer,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::SearchingDriver => "searching_driver",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Arrived => "arrived",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Finished => "finished",
            OrderStatus::CanceledByCustomer => "canceled_by_customer",
        }
    }

    /// Terminal for everyone: no transition is defined out of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Finished | OrderStatus::CanceledByCustomer)
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "searching_driver" => Ok(OrderStatus::SearchingDriver),
            "accepted" => Ok(OrderStatus::Accepted),
            "arrived" => Ok(OrderStatus::Arrived),
            "in_progress" => Ok(OrderStatus::InProgress),
            "finished" => Ok(OrderStatus::Finished),
            "canceled_by_customer" => Ok(OrderStatus::CanceledByCustomer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ride order. `driver_id` is the accepting driver's user id and is set
/// exactly once, at acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    pub from_coords: [f64; 2],
    pub to_coords: [f64; 2],
    pub comfort_type: ComfortLevel,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub price_by_n: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
}
