//! Driver-facing endpoints: presence and location, the own profile and
//! reviews views, and the order pickup/advance flow.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::guard::CurrentUser;
use crate::engine::orders::{self, HistoryItem};
use crate::engine::reviews::{self, DriverReviews};
use crate::engine::visibility::{self, CustomerPublicProfile};
use crate::store::{Driver, Order, OrderStatus};
use crate::AppState;

fn driver_profile_mut<'a>(db: &'a mut crate::store::Database, user_id: &str) -> Option<&'a mut Driver> {
    db.drivers.iter_mut().find(|d| d.user_id == user_id)
}

/// POST /drivers/me/online
pub async fn go_online(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Driver>, ApiError> {
    set_presence(&state, &user.0.id, true).map(Json)
}

/// POST /drivers/me/offline
pub async fn go_offline(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Driver>, ApiError> {
    set_presence(&state, &user.0.id, false).map(Json)
}

fn set_presence(state: &AppState, user_id: &str, online: bool) -> Result<Driver, ApiError> {
    let driver = state
        .store
        .write(|db| {
            let driver =
                driver_profile_mut(db, user_id).ok_or_else(|| ApiError::not_found("Driver profile not found"))?;
            driver.is_online = online;
            if !online {
                driver.coords = None;
            }
            driver.updated_at = Utc::now();
            Ok::<_, ApiError>(driver.clone())
        })??;
    tracing::info!(user_id = %user_id, online, "Driver presence changed");
    Ok(driver)
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lon: f64,
}

/// POST /drivers/me/location
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<LocationRequest>,
) -> Result<Json<Driver>, ApiError> {
    if !request.lat.is_finite() || !request.lon.is_finite() {
        return Err(ApiError::validation_field("coords", "Invalid coordinates"));
    }
    if !(-90.0..=90.0).contains(&request.lat) || !(-180.0..=180.0).contains(&request.lon) {
        return Err(ApiError::validation_field("coords", "Invalid coordinates"));
    }

    let driver = state
        .store
        .write(|db| {
            let driver = driver_profile_mut(db, &user.0.id)
                .ok_or_else(|| ApiError::not_found("Driver profile not found"))?;
            driver.coords = Some([request.lat, request.lon]);
            driver.updated_at = Utc::now();
            Ok::<_, ApiError>(driver.clone())
        })??;
    Ok(Json(driver))
}

/// GET /drivers/me/profile
pub async fn my_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Driver>, ApiError> {
    state
        .store
        .read(|db| db.drivers.iter().find(|d| d.user_id == user.0.id).cloned())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Driver profile not found"))
}

/// GET /drivers/me/reviews
pub async fn my_reviews(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Json<DriverReviews> {
    Json(state.store.read(|db| reviews::driver_reviews(db, &user.0.id)))
}

/// GET /drivers/customers/:id/public
pub async fn customer_public_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<CustomerPublicProfile>, ApiError> {
    let profile = state
        .store
        .read(|db| visibility::customer_public_profile(db, &user.0.id, &id))?;
    Ok(Json(profile))
}

/// GET /drivers/orders/available
pub async fn available_orders(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Json<Vec<Order>> {
    Json(state.store.read(|db| orders::available_orders(db, &user.0.id)))
}

/// GET /drivers/orders/current
pub async fn current_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Json<Option<Order>> {
    Json(state.store.read(|db| orders::driver_current_order(db, &user.0.id)))
}

/// GET /drivers/orders/history
pub async fn order_history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Json<Vec<HistoryItem>> {
    Json(state.store.read(|db| orders::driver_history(db, &user.0.id)))
}

/// POST /drivers/orders/:id/accept
pub async fn accept_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .store
        .write(|db| orders::accept_order(db, &id, &user.0.id))?
        .map_err(ApiError::from)?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// POST /drivers/orders/:id/status
pub async fn set_order_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let next = OrderStatus::from_str(&request.status)
        .map_err(|_| ApiError::validation_field("status", "Unknown status"))?;

    let order = state
        .store
        .write(|db| orders::set_order_status(db, &id, &user.0.id, next))?
        .map_err(ApiError::from)?;
    Ok(Json(order))
}
