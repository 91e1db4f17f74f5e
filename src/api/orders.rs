//! Order creation. The customer id comes from the authenticated
//! principal; the price is computed client-side by a tiered distance
//! formula and trusted as given.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::guard::CurrentUser;
use crate::engine::orders::{self, NewOrder};
use crate::store::{ComfortLevel, Order};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    pub from_coords: [f64; 2],
    pub to_coords: [f64; 2],
    pub comfort_type: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub price_by_n: f64,
}

/// POST /orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let mut v = ValidationErrorBuilder::new();
    if request.from_coords.iter().chain(&request.to_coords).any(|c| !c.is_finite()) {
        v.add("coords", "Coordinates must be finite numbers");
    }
    if !request.distance_meters.is_finite() || request.distance_meters < 0.0 {
        v.add("distanceMeters", "Distance must be non-negative");
    }
    if !request.duration_seconds.is_finite() || request.duration_seconds < 0.0 {
        v.add("durationSeconds", "Duration must be non-negative");
    }
    if !request.price_by_n.is_finite() || request.price_by_n < 0.0 {
        v.add("priceByN", "Price must be non-negative");
    }
    v.finish()?;

    let comfort_type = ComfortLevel::from_str(&request.comfort_type)
        .map_err(|_| ApiError::validation_field("comfortType", "Unknown comfort type"))?;

    let order = state.store.write(|db| {
        Ok::<_, ApiError>(orders::create_order(
            db,
            &user.0.id,
            NewOrder {
                from_address: request.from_address.clone(),
                to_address: request.to_address.clone(),
                from_coords: request.from_coords,
                to_coords: request.to_coords,
                comfort_type,
                distance_meters: request.distance_meters,
                duration_seconds: request.duration_seconds,
                price_by_n: request.price_by_n,
            },
        ))
    })??;

    Ok(Json(order))
}
