//! Visibility filter: who may see whose profile, and in what shape.
//!
//! User records are never exposed raw (they carry password hashes). The
//! two public-profile views below are gated on an order linking the
//! requester to the subject:
//!
//! - customer -> driver: any linking order not canceled by the customer,
//!   so the profile stays visible through the ride and its history;
//! - driver -> customer: only a linking order still in flight. Once the
//!   ride finishes the driver loses access to the customer's contacts.

use serde::Serialize;

use crate::store::{Car, ComfortLevel, Database, OrderStatus, Role};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum VisibilityError {
    #[error("access denied")]
    Forbidden,
    #[error("profile not found")]
    NotFound,
}

/// Driver profile as a customer may see it.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPublicProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub comfort_level: Option<ComfortLevel>,
    pub car: Option<Car>,
}

/// Customer profile as a driver may see it.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPublicProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
}

/// Driver public profile for `customer_id`, gated on a linking order with
/// status other than `canceled_by_customer`. `driver_user_id` is the
/// driver's user id.
pub fn driver_public_profile(
    db: &Database,
    customer_id: &str,
    driver_user_id: &str,
) -> Result<DriverPublicProfile, VisibilityError> {
    let linked = db.orders.iter().any(|o| {
        o.customer_id == customer_id
            && o.driver_id.as_deref() == Some(driver_user_id)
            && o.status != OrderStatus::CanceledByCustomer
    });
    if !linked {
        return Err(VisibilityError::Forbidden);
    }

    let user = db
        .users
        .iter()
        .find(|u| u.id == driver_user_id && u.role == Role::Driver)
        .ok_or(VisibilityError::NotFound)?;
    let profile = db.drivers.iter().find(|d| d.user_id == driver_user_id);

    Ok(DriverPublicProfile {
        id: user.id.clone(),
        name: user.name.clone(),
        phone: user.phone.clone(),
        comfort_level: profile.and_then(|d| d.comfort_level),
        car: profile.and_then(|d| d.car.clone()),
    })
}

/// Customer public profile for the driver with user id `driver_user_id`,
/// gated on a linking order that is not yet terminal.
pub fn customer_public_profile(
    db: &Database,
    driver_user_id: &str,
    customer_id: &str,
) -> Result<CustomerPublicProfile, VisibilityError> {
    let linked = db.orders.iter().any(|o| {
        o.driver_id.as_deref() == Some(driver_user_id)
            && o.customer_id == customer_id
            && !o.status.is_terminal()
    });
    if !linked {
        return Err(VisibilityError::Forbidden);
    }

    let user = db
        .users
        .iter()
        .find(|u| u.id == customer_id)
        .ok_or(VisibilityError::NotFound)?;

    Ok(CustomerPublicProfile {
        id: user.id.clone(),
        name: user.name.clone(),
        phone: user.phone.clone(),
    })
}
