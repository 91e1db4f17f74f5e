//! Review creation by customers.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::guard::CurrentUser;
use crate::engine::reviews;
use crate::store::Review;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub order_id: String,
    pub rating: u8,
    #[serde(default)]
    pub text: Option<String>,
}

/// POST /reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    let review = state
        .store
        .write(|db| {
            reviews::create_review(db, &user.0.id, &request.order_id, request.rating, request.text.clone())
        })?
        .map_err(ApiError::from)?;
    Ok(Json(review))
}
