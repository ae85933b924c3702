//! Order lifecycle engine: the transition table, the side effects that fire
//! with a status write, and the rider bookkeeping those effects require.
//!
//! Transition rules: `delivered` and `cancelled` are terminal. `exception`
//! exits only through [`resolve_exception`]. Any other state may move to any
//! status, including `cancelled` and `exception`; forward progress is not
//! forced to be single-step because managers correct mis-entered statuses.

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{ExceptionKind, ExceptionRecord, Order, OrderStatus};
use crate::models::rider::{Rider, RiderStatus};

pub fn check_transition(current: OrderStatus, next: OrderStatus) -> Result<(), AppError> {
    if current == next {
        return Ok(());
    }
    if current.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "order is {current} and cannot change status"
        )));
    }
    if current == OrderStatus::Exception {
        return Err(AppError::InvalidState(
            "order is in exception status; resolve the exception first".to_string(),
        ));
    }
    Ok(())
}

/// Applies a status change with its timestamp side effects. Returns `true`
/// when the caller must credit the rider's delivery counter; the order and
/// rider live in separate map entries, so the counter write happens outside
/// this function.
pub fn apply_status(order: &mut Order, next: OrderStatus) -> Result<bool, AppError> {
    if order.status == next {
        return Ok(false);
    }
    check_transition(order.status, next)?;
    order.status = next;
    Ok(status_effects(order, next))
}

fn status_effects(order: &mut Order, next: OrderStatus) -> bool {
    match next {
        OrderStatus::PickedUp => {
            if order.pickup.completed_time.is_none() {
                order.pickup.completed_time = Some(Utc::now());
            }
            false
        }
        OrderStatus::Delivered => {
            order.delivery.actual_time = Some(Utc::now());
            true
        }
        _ => false,
    }
}

pub fn report_exception(
    order: &mut Order,
    kind: ExceptionKind,
    description: String,
) -> Result<(), AppError> {
    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "exception type and description are required".to_string(),
        ));
    }
    check_transition(order.status, OrderStatus::Exception)?;

    order.status = OrderStatus::Exception;
    order.exception = Some(ExceptionRecord {
        kind,
        description,
        reported_at: Utc::now(),
        resolved_at: None,
        resolution: None,
    });
    Ok(())
}

/// Moves an order out of `exception` into a caller-supplied status, recording
/// the resolution. Shares the delivery-credit contract of [`apply_status`].
pub fn resolve_exception(
    order: &mut Order,
    new_status: OrderStatus,
    resolution: String,
) -> Result<bool, AppError> {
    if order.status != OrderStatus::Exception {
        return Err(AppError::InvalidState(
            "order is not in exception status".to_string(),
        ));
    }
    if new_status == OrderStatus::Exception {
        return Err(AppError::Validation(
            "resolved status must not be exception".to_string(),
        ));
    }
    if resolution.trim().is_empty() {
        return Err(AppError::Validation(
            "resolution and status are required".to_string(),
        ));
    }

    order.status = new_status;
    if let Some(exception) = order.exception.as_mut() {
        exception.resolution = Some(resolution);
        exception.resolved_at = Some(Utc::now());
    }
    Ok(status_effects(order, new_status))
}

/// Order-side half of assignment. The rider must be `active`. Capacity is
/// deliberately not checked, matching the manual dispatch workflow this
/// models. The working-set add is [`add_current_order`], kept separate so the
/// caller can run it against the live rider entry.
pub fn assign(order: &mut Order, rider: &Rider) -> Result<(), AppError> {
    if rider.status != RiderStatus::Active {
        return Err(AppError::InvalidState("rider is not active".to_string()));
    }
    check_transition(order.status, OrderStatus::Assigned)?;

    order.rider = Some(rider.id);
    order.status = OrderStatus::Assigned;
    Ok(())
}

/// Idempotent add to the rider's working set.
pub fn add_current_order(rider: &mut Rider, order_id: Uuid) {
    if !rider.current_orders.contains(&order_id) {
        rider.current_orders.push(order_id);
    }
}

/// Drops an order from the rider's working set without a delivery credit.
/// Runs when an order is cancelled, deleted, or reassigned elsewhere.
pub fn release_order(rider: &mut Rider, order_id: Uuid) {
    rider.current_orders.retain(|id| *id != order_id);
}

/// Delivery credit: exactly one counter bump per delivered order, and the
/// order leaves the rider's working set.
pub fn credit_delivery(rider: &mut Rider, order_id: Uuid) {
    rider.deliveries_completed += 1;
    release_order(rider, order_id);
}
