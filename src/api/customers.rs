//! Customer-facing endpoints: current order, history, cancellation and
//! the gated driver public profile.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::guard::CurrentUser;
use crate::engine::orders::{self, HistoryItem};
use crate::engine::visibility::{self, DriverPublicProfile};
use crate::store::Order;
use crate::AppState;

/// GET /customers/orders/current
pub async fn current_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Json<Option<Order>> {
    Json(state.store.read(|db| orders::customer_current_order(db, &user.0.id)))
}

/// GET /customers/orders/history
pub async fn order_history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Json<Vec<HistoryItem>> {
    Json(state.store.read(|db| orders::customer_history(db, &user.0.id)))
}

/// POST /customers/orders/:id/cancel
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .store
        .write(|db| orders::cancel_order(db, &id, &user.0.id))?
        .map_err(ApiError::from)?;
    Ok(Json(order))
}

/// GET /customers/drivers/:id/public
pub async fn driver_public_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DriverPublicProfile>, ApiError> {
    let profile = state
        .store
        .read(|db| visibility::driver_public_profile(db, &user.0.id, &id))?;
    Ok(Json(profile))
}
