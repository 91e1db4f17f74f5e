//! Manager back-office: login/logout/me and the driver application
//! review workflow.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::api::auth::{
    auth_cookie, hash_password, issue_token, removal_cookie, verify_password, OkResponse,
    MANAGER_COOKIE,
};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::guard::CurrentManager;
use crate::engine::applications::{self, ApprovalDetails};
use crate::store::{ApplicationView, Car, ComfortLevel, Manager, ManagerResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ManagerLoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ManagerLoginResponse {
    pub manager: ManagerResponse,
}

/// POST /manager/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<ManagerLoginRequest>,
) -> Result<(CookieJar, Json<ManagerLoginResponse>), ApiError> {
    let mut v = ValidationErrorBuilder::new();
    v.require("login", &request.login);
    v.require("password", &request.password);
    v.finish()?;

    let manager: Option<Manager> = state
        .store
        .read(|db| db.managers.iter().find(|m| m.login == request.login).cloned());
    let manager = manager.ok_or_else(|| ApiError::unauthenticated("Invalid login or password"))?;

    // Seed files may carry a plaintext `password` instead of a hash.
    let verified = match (&manager.password_hash, &manager.password) {
        (Some(hash), _) => verify_password(&request.password, hash),
        (None, Some(plain)) => plain == &request.password,
        (None, None) => false,
    };
    if !verified {
        return Err(ApiError::unauthenticated("Invalid login or password"));
    }

    let token = issue_token(&state.config.auth.jwt_secret, &manager.id)?;
    let jar = jar.add(auth_cookie(
        MANAGER_COOKIE,
        token,
        state.config.auth.secure_cookies,
    ));

    tracing::info!(manager_id = %manager.id, "Manager logged in");
    Ok((
        jar,
        Json(ManagerLoginResponse {
            manager: ManagerResponse::from(&manager),
        }),
    ))
}

/// POST /manager/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OkResponse>) {
    let jar = jar.remove(removal_cookie(MANAGER_COOKIE));
    (jar, Json(OkResponse { ok: true }))
}

/// GET /manager/me
pub async fn me(manager: CurrentManager) -> Json<ManagerResponse> {
    Json(ManagerResponse::from(&manager.0))
}

#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
    pub status: Option<String>,
}

/// GET /manager/driver-applications
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    _manager: CurrentManager,
    Query(query): Query<ListApplicationsQuery>,
) -> Json<Vec<ApplicationView>> {
    let views = state.store.read(|db| {
        db.driver_applications
            .iter()
            .filter(|a| match query.status.as_deref() {
                Some(status) if !status.is_empty() => a.status.as_str() == status,
                _ => true,
            })
            .map(ApplicationView::from)
            .collect()
    });
    Json(views)
}

/// GET /manager/driver-applications/:id
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    _manager: CurrentManager,
    Path(id): Path<String>,
) -> Result<Json<ApplicationView>, ApiError> {
    state
        .store
        .read(|db| {
            db.driver_applications
                .iter()
                .find(|a| a.id == id)
                .map(ApplicationView::from)
        })
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Application not found"))
}

/// Review action carried by PATCH /manager/driver-applications/:id.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReviewAction {
    #[serde(rename_all = "camelCase")]
    Approve {
        driver_license_number: String,
        car_make: String,
        car_model: String,
        car_color: String,
        car_plate: String,
        comfort_level: String,
    },
    Reject {
        comment: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
}

/// PATCH /manager/driver-applications/:id
pub async fn review_application(
    State(state): State<Arc<AppState>>,
    manager: CurrentManager,
    Path(id): Path<String>,
    Json(action): Json<ReviewAction>,
) -> Result<Json<ReviewOutcome>, ApiError> {
    match action {
        ReviewAction::Approve {
            driver_license_number,
            car_make,
            car_model,
            car_color,
            car_plate,
            comfort_level,
        } => {
            let mut v = ValidationErrorBuilder::new();
            v.require("driverLicenseNumber", &driver_license_number);
            v.require("carMake", &car_make);
            v.require("carModel", &car_model);
            v.require("carColor", &car_color);
            v.require("carPlate", &car_plate);
            v.require("comfortLevel", &comfort_level);
            v.finish()?;

            let comfort_level = ComfortLevel::from_str(&comfort_level)
                .map_err(|_| ApiError::validation_field("comfortLevel", "Unknown comfort level"))?;

            let driver_id = state
                .store
                .write(|db| {
                    applications::approve_application(
                        db,
                        &id,
                        &manager.0.id,
                        ApprovalDetails {
                            driver_license_number: driver_license_number.clone(),
                            car: Car {
                                make: car_make.clone(),
                                model: car_model.clone(),
                                color: car_color.clone(),
                                plate: car_plate.clone(),
                            },
                            comfort_level,
                        },
                    )
                })?
                .map_err(ApiError::from)?;

            Ok(Json(ReviewOutcome {
                ok: true,
                driver_id: Some(driver_id),
            }))
        }
        ReviewAction::Reject { comment } => {
            state
                .store
                .write(|db| applications::reject_application(db, &id, &manager.0.id, &comment))?
                .map_err(ApiError::from)?;

            Ok(Json(ReviewOutcome {
                ok: true,
                driver_id: None,
            }))
        }
    }
}

/// Seed a manager account when the collection is empty, so a fresh
/// install has a working back-office login.
pub fn seed_default_manager(state: &AppState) -> anyhow::Result<()> {
    let has_managers = state.store.read(|db| !db.managers.is_empty());
    if has_managers {
        return Ok(());
    }

    let login = state.config.auth.manager_login.clone();
    let password = state.config.auth.manager_password.clone();
    let password_hash =
        hash_password(&password).map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    state.store.write(|db| {
        db.managers.push(Manager {
            id: uuid::Uuid::new_v4().to_string(),
            login: login.clone(),
            name: "Manager".to_string(),
            password_hash: Some(password_hash.clone()),
            password: None,
        });
        Ok::<_, anyhow::Error>(())
    })??;

    tracing::info!(login = %login, password = %password, "Seeded default manager account");
    Ok(())
}
