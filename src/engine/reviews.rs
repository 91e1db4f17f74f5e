//! Review engine: creation rules and the driver-facing rating summary.
//!
//! Review creation is validated server-side: the order must exist, belong
//! to the reviewer, be finished, and not already carry a review from them.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::store::{Database, OrderStatus, Review};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("order not found")]
    OrderNotFound,
    #[error("order belongs to another customer")]
    NotYourOrder,
    #[error("order is not finished yet")]
    OrderNotFinished,
    #[error("order already reviewed")]
    AlreadyReviewed,
    #[error("rating must be between 1 and 5")]
    InvalidRating,
}

/// A review joined with the reviewing customer's display name, for the
/// driver-facing listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithCustomer {
    #[serde(flatten)]
    pub review: Review,
    pub customer_name: Option<String>,
}

/// Aggregate returned by `GET /drivers/me/reviews`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverReviews {
    pub average_rating: f64,
    pub total_reviews: usize,
    pub reviews: Vec<ReviewWithCustomer>,
}

/// Create a review for a finished order, at most once per (order, customer).
pub fn create_review(
    db: &mut Database,
    customer_id: &str,
    order_id: &str,
    rating: u8,
    text: Option<String>,
) -> Result<Review, ReviewError> {
    if !(1..=5).contains(&rating) {
        return Err(ReviewError::InvalidRating);
    }

    let order = db
        .orders
        .iter()
        .find(|o| o.id == order_id)
        .ok_or(ReviewError::OrderNotFound)?;

    if order.customer_id != customer_id {
        return Err(ReviewError::NotYourOrder);
    }
    if order.status != OrderStatus::Finished {
        return Err(ReviewError::OrderNotFinished);
    }

    let already_reviewed = db
        .reviews
        .iter()
        .any(|r| r.order_id == order_id && r.customer_id == customer_id);
    if already_reviewed {
        return Err(ReviewError::AlreadyReviewed);
    }

    let review = Review {
        id: Uuid::new_v4().to_string(),
        order_id: order_id.to_string(),
        driver_id: order.driver_id.clone().unwrap_or_default(),
        customer_id: customer_id.to_string(),
        rating,
        text: text.filter(|t| !t.trim().is_empty()),
        created_at: Utc::now(),
    };
    info!(review_id = %review.id, order_id = %order_id, rating, "Review created");
    db.reviews.push(review.clone());
    Ok(review)
}

/// All reviews for a driver, newest first, with each reviewer's display
/// name joined in and an average over the ratings.
pub fn driver_reviews(db: &Database, driver_user_id: &str) -> DriverReviews {
    let mut reviews: Vec<&Review> = db
        .reviews
        .iter()
        .filter(|r| r.driver_id == driver_user_id)
        .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total_reviews = reviews.len();
    let average_rating = if total_reviews == 0 {
        0.0
    } else {
        reviews.iter().map(|r| r.rating as f64).sum::<f64>() / total_reviews as f64
    };

    let reviews = reviews
        .into_iter()
        .map(|r| ReviewWithCustomer {
            review: r.clone(),
            customer_name: db
                .users
                .iter()
                .find(|u| u.id == r.customer_id)
                .map(|u| u.name.clone()),
        })
        .collect();

    DriverReviews {
        average_rating,
        total_reviews,
        reviews,
    }
}
