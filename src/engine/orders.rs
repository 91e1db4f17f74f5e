//! Order lifecycle engine.
//!
//! Orders move through a fixed graph:
//!
//! ```text
//! searching_driver -> accepted -> arrived -> in_progress -> finished
//!        \-> canceled_by_customer
//! ```
//!
//! A driver may only advance along `accepted -> arrived -> in_progress ->
//! finished`; the customer may only cancel while still searching. The
//! accepting driver's user id is written exactly once and never reassigned.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::store::{ComfortLevel, Database, Order, OrderStatus, Review};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,
    #[error("order belongs to another principal")]
    NotYourOrder,
    #[error("order already accepted by another driver")]
    AlreadyAccepted,
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("cannot cancel order at this stage")]
    CannotCancel,
}

/// Inputs for order creation. Price is computed by the caller (a tiered
/// distance formula on the client) and trusted as given.
#[derive(Debug)]
pub struct NewOrder {
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_coords: [f64; 2],
    pub to_coords: [f64; 2],
    pub comfort_type: ComfortLevel,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub price_by_n: f64,
}

/// An order joined with the requester's own review of it, if any.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub order: Order,
    pub review: Option<Review>,
}

/// The driver-facing transition table. Directional and exhaustive: every
/// pair not listed here is a conflict.
pub fn can_driver_set_status(current: OrderStatus, next: OrderStatus) -> bool {
    matches!(
        (current, next),
        (OrderStatus::Accepted, OrderStatus::Arrived)
            | (OrderStatus::Arrived, OrderStatus::InProgress)
            | (OrderStatus::InProgress, OrderStatus::Finished)
    )
}

/// Create an order for `customer_id`. Always starts in `searching_driver`.
pub fn create_order(db: &mut Database, customer_id: &str, new: NewOrder) -> Order {
    let order = Order {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        driver_id: None,
        from_address: new.from_address,
        to_address: new.to_address,
        from_coords: new.from_coords,
        to_coords: new.to_coords,
        comfort_type: new.comfort_type,
        distance_meters: new.distance_meters,
        duration_seconds: new.duration_seconds,
        price_by_n: new.price_by_n,
        status: OrderStatus::SearchingDriver,
        created_at: Utc::now(),
        accepted_at: None,
        canceled_at: None,
    };
    info!(order_id = %order.id, comfort = %order.comfort_type, "Order created");
    db.orders.push(order.clone());
    order
}

/// Accept an order on behalf of the driver with user id `driver_id`.
///
/// Succeeds only while the order is still `searching_driver` with no driver
/// bound. The status check and the write happen under the same store lock,
/// so of two racing accepts exactly one wins and the other sees
/// [`OrderError::AlreadyAccepted`].
pub fn accept_order(db: &mut Database, order_id: &str, driver_id: &str) -> Result<Order, OrderError> {
    let order = db
        .orders
        .iter_mut()
        .find(|o| o.id == order_id)
        .ok_or(OrderError::NotFound)?;

    if order.status != OrderStatus::SearchingDriver || order.driver_id.is_some() {
        return Err(OrderError::AlreadyAccepted);
    }

    order.status = OrderStatus::Accepted;
    order.driver_id = Some(driver_id.to_string());
    order.accepted_at = Some(Utc::now());
    info!(order_id = %order.id, driver_id = %driver_id, "Order accepted");
    Ok(order.clone())
}

/// Advance an order along the driver transition table. The requesting
/// driver must be the one bound to the order.
pub fn set_order_status(
    db: &mut Database,
    order_id: &str,
    driver_id: &str,
    next: OrderStatus,
) -> Result<Order, OrderError> {
    let order = db
        .orders
        .iter_mut()
        .find(|o| o.id == order_id)
        .ok_or(OrderError::NotFound)?;

    if order.driver_id.as_deref() != Some(driver_id) {
        return Err(OrderError::NotYourOrder);
    }

    if !can_driver_set_status(order.status, next) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: next,
        });
    }

    order.status = next;
    info!(order_id = %order.id, status = %next, "Order status advanced");
    Ok(order.clone())
}

/// Cancel an order. Only the owning customer may cancel, and only while the
/// order is still searching for a driver.
pub fn cancel_order(db: &mut Database, order_id: &str, customer_id: &str) -> Result<Order, OrderError> {
    let order = db
        .orders
        .iter_mut()
        .find(|o| o.id == order_id)
        .ok_or(OrderError::NotFound)?;

    if order.customer_id != customer_id {
        return Err(OrderError::NotYourOrder);
    }

    if order.status != OrderStatus::SearchingDriver {
        return Err(OrderError::CannotCancel);
    }

    order.status = OrderStatus::CanceledByCustomer;
    order.canceled_at = Some(Utc::now());
    info!(order_id = %order.id, "Order canceled by customer");
    Ok(order.clone())
}

/// Orders a driver may pick up: still searching, unbound, and matching the
/// driver's own comfort level. A driver without a comfort level sees none.
pub fn available_orders(db: &Database, driver_user_id: &str) -> Vec<Order> {
    let Some(comfort) = db
        .drivers
        .iter()
        .find(|d| d.user_id == driver_user_id)
        .and_then(|d| d.comfort_level)
    else {
        return Vec::new();
    };

    db.orders
        .iter()
        .filter(|o| {
            o.status == OrderStatus::SearchingDriver
                && o.driver_id.is_none()
                && o.comfort_type == comfort
        })
        .cloned()
        .collect()
}

/// The driver's order still in flight, if any.
pub fn driver_current_order(db: &Database, driver_user_id: &str) -> Option<Order> {
    db.orders
        .iter()
        .find(|o| o.driver_id.as_deref() == Some(driver_user_id) && !o.status.is_terminal())
        .cloned()
}

/// The customer's order in flight, falling back to the latest finished
/// order they have not reviewed yet, so the UI can prompt for a review
/// exactly once across reloads.
pub fn customer_current_order(db: &Database, customer_id: &str) -> Option<Order> {
    let active = db
        .orders
        .iter()
        .filter(|o| o.customer_id == customer_id && !o.status.is_terminal())
        .max_by_key(|o| o.created_at);
    if let Some(order) = active {
        return Some(order.clone());
    }

    let last_finished = db
        .orders
        .iter()
        .filter(|o| o.customer_id == customer_id && o.status == OrderStatus::Finished)
        .max_by_key(|o| o.created_at)?;

    let already_reviewed = db
        .reviews
        .iter()
        .any(|r| r.order_id == last_finished.id && r.customer_id == customer_id);

    if already_reviewed {
        None
    } else {
        Some(last_finished.clone())
    }
}

/// Every order the customer ever placed, newest first, joined with their
/// review where one exists.
pub fn customer_history(db: &Database, customer_id: &str) -> Vec<HistoryItem> {
    let mut orders: Vec<&Order> = db
        .orders
        .iter()
        .filter(|o| o.customer_id == customer_id)
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    orders
        .into_iter()
        .map(|o| HistoryItem {
            order: o.clone(),
            review: db
                .reviews
                .iter()
                .find(|r| r.order_id == o.id && r.customer_id == customer_id)
                .cloned(),
        })
        .collect()
}

/// The driver's finished rides, newest first, joined with the review each
/// one received.
pub fn driver_history(db: &Database, driver_user_id: &str) -> Vec<HistoryItem> {
    let mut orders: Vec<&Order> = db
        .orders
        .iter()
        .filter(|o| {
            o.driver_id.as_deref() == Some(driver_user_id) && o.status == OrderStatus::Finished
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    orders
        .into_iter()
        .map(|o| HistoryItem {
            order: o.clone(),
            review: db
                .reviews
                .iter()
                .find(|r| r.order_id == o.id && r.driver_id == driver_user_id)
                .cloned(),
        })
        .collect()
}
