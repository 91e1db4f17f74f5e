//! Driver application model: the pending → approved/rejected workflow
//! that provisions a driver account on approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::driver::Car;
use super::order::ComfortLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// A prospective driver's application. Terminal once reviewed; the car,
/// license and comfort fields are copied onto the record at approval for
/// audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverApplication {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub reviewed_by_manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car: Option<Car>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comfort_level: Option<ComfortLevel>,
}

/// Application shape returned to managers: everything but the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub driver_id: Option<String>,
    pub reviewed_by_manager_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car: Option<Car>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comfort_level: Option<ComfortLevel>,
}

impl From<&DriverApplication> for ApplicationView {
    fn from(app: &DriverApplication) -> Self {
        Self {
            id: app.id.clone(),
            email: app.email.clone(),
            name: app.name.clone(),
            phone: app.phone.clone(),
            status: app.status,
            created_at: app.created_at,
            reviewed_at: app.reviewed_at,
            driver_id: app.driver_id.clone(),
            reviewed_by_manager_id: app.reviewed_by_manager_id.clone(),
            manager_comment: app.manager_comment.clone(),
            driver_license_number: app.driver_license_number.clone(),
            car: app.car.clone(),
            comfort_level: app.comfort_level,
        }
    }
}
