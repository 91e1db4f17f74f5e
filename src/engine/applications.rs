//! Driver application engine.
//!
//! Applications start `pending` and end `approved` or `rejected`, never to
//! be reopened. Approval is the only path that creates a driver account:
//! it provisions a driver-role user (reusing the application's password
//! hash) together with an offline driver profile, atomically within one
//! store write.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::store::{
    ApplicationStatus, Car, ComfortLevel, Database, Driver, DriverApplication, Role, User,
};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationError {
    #[error("application not found")]
    NotFound,
    #[error("application already reviewed")]
    AlreadyReviewed,
    #[error("a driver with this email already exists")]
    DriverEmailTaken,
    #[error("a pending application for this email already exists")]
    PendingApplicationExists,
    #[error("rejection comment must be at least 3 characters")]
    CommentTooShort,
}

/// Inputs for a prospective driver's submission. The password is hashed
/// before it reaches the engine.
#[derive(Debug)]
pub struct NewApplication {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
}

/// Vehicle and licensing details a manager supplies at approval.
#[derive(Debug)]
pub struct ApprovalDetails {
    pub driver_license_number: String,
    pub car: Car,
    pub comfort_level: ComfortLevel,
}

/// Submit a driver application. At most one pending application may exist
/// per email, and emails already owned by a driver account are refused.
pub fn submit_application(
    db: &mut Database,
    new: NewApplication,
) -> Result<DriverApplication, ApplicationError> {
    let email_taken_by_driver = db
        .users
        .iter()
        .any(|u| u.email == new.email && u.role == Role::Driver);
    if email_taken_by_driver {
        return Err(ApplicationError::DriverEmailTaken);
    }

    let has_pending = db
        .driver_applications
        .iter()
        .any(|a| a.email == new.email && a.status == ApplicationStatus::Pending);
    if has_pending {
        return Err(ApplicationError::PendingApplicationExists);
    }

    let application = DriverApplication {
        id: Uuid::new_v4().to_string(),
        email: new.email,
        name: new.name,
        phone: new.phone,
        password_hash: new.password_hash,
        status: ApplicationStatus::Pending,
        created_at: Utc::now(),
        reviewed_at: None,
        driver_id: None,
        reviewed_by_manager_id: None,
        manager_comment: None,
        driver_license_number: None,
        car: None,
        comfort_level: None,
    };
    info!(application_id = %application.id, "Driver application submitted");
    db.driver_applications.push(application.clone());
    Ok(application)
}

/// Approve a pending application: create the driver user and profile, and
/// stamp the application with the review outcome. Returns the new driver's
/// user id.
pub fn approve_application(
    db: &mut Database,
    application_id: &str,
    manager_id: &str,
    details: ApprovalDetails,
) -> Result<String, ApplicationError> {
    let idx = db
        .driver_applications
        .iter()
        .position(|a| a.id == application_id)
        .ok_or(ApplicationError::NotFound)?;

    if db.driver_applications[idx].status != ApplicationStatus::Pending {
        return Err(ApplicationError::AlreadyReviewed);
    }

    // A driver account may have appeared since submission (duplicate
    // application approved first).
    let email = db.driver_applications[idx].email.clone();
    let email_taken_by_driver = db
        .users
        .iter()
        .any(|u| u.email == email && u.role == Role::Driver);
    if email_taken_by_driver {
        return Err(ApplicationError::DriverEmailTaken);
    }

    let driver_user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: db.driver_applications[idx].name.clone(),
        role: Role::Driver,
        phone: db.driver_applications[idx].phone.clone(),
        password_hash: db.driver_applications[idx].password_hash.clone(),
    };
    let driver_user_id = driver_user.id.clone();

    db.drivers.push(Driver {
        id: Uuid::new_v4().to_string(),
        user_id: driver_user_id.clone(),
        is_online: false,
        coords: None,
        comfort_level: Some(details.comfort_level),
        driver_license_number: Some(details.driver_license_number.clone()),
        car: Some(details.car.clone()),
        updated_at: Utc::now(),
    });
    db.users.push(driver_user);

    let app = &mut db.driver_applications[idx];
    app.status = ApplicationStatus::Approved;
    app.reviewed_at = Some(Utc::now());
    app.driver_id = Some(driver_user_id.clone());
    app.reviewed_by_manager_id = Some(manager_id.to_string());
    app.driver_license_number = Some(details.driver_license_number);
    app.car = Some(details.car);
    app.comfort_level = Some(details.comfort_level);

    info!(
        application_id = %application_id,
        driver_id = %driver_user_id,
        manager_id = %manager_id,
        "Driver application approved"
    );
    Ok(driver_user_id)
}

/// Reject a pending application with a mandatory comment (≥ 3 characters
/// after trimming).
pub fn reject_application(
    db: &mut Database,
    application_id: &str,
    manager_id: &str,
    comment: &str,
) -> Result<(), ApplicationError> {
    let comment = comment.trim();
    if comment.chars().count() < 3 {
        return Err(ApplicationError::CommentTooShort);
    }

    let app = db
        .driver_applications
        .iter_mut()
        .find(|a| a.id == application_id)
        .ok_or(ApplicationError::NotFound)?;

    if app.status != ApplicationStatus::Pending {
        return Err(ApplicationError::AlreadyReviewed);
    }

    app.status = ApplicationStatus::Rejected;
    app.reviewed_at = Some(Utc::now());
    app.reviewed_by_manager_id = Some(manager_id.to_string());
    app.manager_comment = Some(comment.to_string());

    info!(application_id = %application_id, manager_id = %manager_id, "Driver application rejected");
    Ok(())
}
