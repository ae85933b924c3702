use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::{lifecycle, permissions, stats};
use crate::error::AppError;
use crate::models::order::{
    Customer, DeliveryLeg, ExceptionReport, Order, OrderItem, OrderPatch, OrderStatus, PickupLeg,
    Priority,
};
use crate::models::user::Role;
use crate::state::AppState;

use super::{paginate, Page};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/stats", get(order_stats))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/:id/assign", post(assign_order))
        .route("/:id/exception", post(report_exception))
        .route("/:id/resolve-exception", post(resolve_exception))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_number: Option<String>,
    pub customer: Customer,
    pub pickup: PickupLeg,
    pub delivery: DeliveryLeg,
    pub items: Vec<OrderItem>,
    pub total_weight: Option<f64>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    permissions::require_privileged(caller, "create orders")?;

    if payload.customer.name.trim().is_empty()
        || payload.customer.phone.trim().is_empty()
        || payload.customer.address.trim().is_empty()
    {
        return Err(AppError::Validation(
            "customer name, phone and address are required".to_string(),
        ));
    }
    if payload.items.is_empty() {
        return Err(AppError::Validation("items are required".to_string()));
    }
    if payload.items.iter().any(|item| item.quantity < 1) {
        return Err(AppError::Validation(
            "item quantity must be at least 1".to_string(),
        ));
    }

    let order_number = match payload.order_number {
        Some(number) if !number.trim().is_empty() => {
            if state.store.order_number_taken(&number) {
                return Err(AppError::Conflict(format!(
                    "order number {number} already exists"
                )));
            }
            number
        }
        _ => state.store.next_order_number(),
    };

    let order = Order {
        id: Uuid::new_v4(),
        order_number,
        customer: payload.customer,
        pickup: payload.pickup,
        delivery: payload.delivery,
        rider: None,
        status: OrderStatus::Pending,
        exception: None,
        items: payload.items,
        total_weight: payload.total_weight,
        priority: payload.priority.unwrap_or_default(),
        created_by: caller.id,
        notes: payload.notes,
        created_at: Utc::now(),
    };

    state.store.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();
    tracing::info!(order_id = %order.id, order_number = %order.order_number, "order created");

    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub rider: Option<Uuid>,
    pub priority: Option<Priority>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Page<Order>>, AppError> {
    // Riders only ever see their own assigned orders.
    let rider_filter = if caller.role == Role::Rider {
        Some(permissions::own_rider(&state.store, caller)?.id)
    } else {
        query.rider
    };

    let mut orders: Vec<Order> = state
        .store
        .orders
        .iter()
        .filter(|entry| {
            let order = entry.value();
            query.status.map_or(true, |status| order.status == status)
                && query
                    .priority
                    .map_or(true, |priority| order.priority == priority)
                && rider_filter.map_or(true, |rider| order.rider == Some(rider))
        })
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(paginate(
        orders,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(10),
    )))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .store
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    if caller.role == Role::Rider {
        let own = permissions::own_rider(&state.store, caller)?;
        if order.rider.is_some() && order.rider != Some(own.id) {
            return Err(AppError::Forbidden(
                "not authorized to view this order".to_string(),
            ));
        }
    }

    Ok(Json(order))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(mut patch): Json<OrderPatch>,
) -> Result<Json<Order>, AppError> {
    let own = if caller.role == Role::Rider {
        Some(permissions::own_rider(&state.store, caller)?)
    } else {
        None
    };

    let mut credit_rider: Option<Uuid> = None;
    let mut release_rider: Option<Uuid> = None;
    let updated = {
        let mut order = state
            .store
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

        if let Some(own) = &own {
            permissions::ensure_order_scope(own, &order, "update this order")?;
            permissions::scrub_order_patch(Role::Rider, &mut patch);
        }

        if let Some(next) = patch.status.take() {
            if next == OrderStatus::Exception {
                let report = patch.exception.take().ok_or_else(|| {
                    AppError::Validation(
                        "exception type and description are required".to_string(),
                    )
                })?;
                lifecycle::report_exception(&mut order, report.kind, report.description)?;
                state.metrics.exceptions_reported_total.inc();
            } else if lifecycle::apply_status(&mut order, next)? {
                credit_rider = order.rider;
            } else if next == OrderStatus::Cancelled {
                release_rider = order.rider;
            }
        }

        if let Some(customer) = patch.customer.take() {
            order.customer = customer;
        }
        if let Some(pickup) = patch.pickup.take() {
            order.pickup = pickup;
        }
        if let Some(delivery) = patch.delivery.take() {
            order.delivery = delivery;
        }
        if let Some(items) = patch.items.take() {
            order.items = items;
        }
        if let Some(total_weight) = patch.total_weight.take() {
            order.total_weight = Some(total_weight);
        }
        if let Some(priority) = patch.priority.take() {
            order.priority = priority;
        }
        if let Some(notes) = patch.notes.take() {
            order.notes = Some(notes);
        }

        order.clone()
    };

    if let Some(rider_id) = credit_rider {
        credit_delivery(&state, rider_id, id);
    }
    if let Some(rider_id) = release_rider {
        release_order(&state, rider_id, id);
    }

    Ok(Json(updated))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require_role(caller, permissions::ADMIN_AND_LOGISTICS, "delete orders")?;

    let (_, order) = state
        .store
        .orders
        .remove(&id)
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    if let Some(rider_id) = order.rider {
        release_order(&state, rider_id, id);
    }

    tracing::info!(order_id = %id, "order removed");
    Ok(Json(json!({ "message": "order removed" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOrderRequest {
    pub rider_id: Uuid,
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignOrderRequest>,
) -> Result<Json<Order>, AppError> {
    permissions::require_privileged(caller, "assign orders")?;

    let rider = state
        .store
        .riders
        .get(&payload.rider_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("rider not found".to_string()))?;

    let result = {
        let mut order = state
            .store
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;
        let previous = order.rider;
        lifecycle::assign(&mut order, &rider).map(|()| (order.clone(), previous))
    };

    let (updated, previous) = match result {
        Ok(pair) => pair,
        Err(err) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["error"])
                .inc();
            return Err(err);
        }
    };

    // The order guard is released before any rider entry is touched; the two
    // collections are never locked at the same time.
    if let Some(old) = previous {
        if old != payload.rider_id {
            release_order(&state, old, id);
        }
    }
    if let Some(mut entry) = state.store.riders.get_mut(&payload.rider_id) {
        lifecycle::add_current_order(&mut entry, id);
    }

    state
        .metrics
        .assignments_total
        .with_label_values(&["success"])
        .inc();
    tracing::info!(order_id = %id, rider_id = %payload.rider_id, "order assigned");

    Ok(Json(updated))
}

async fn report_exception(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExceptionReport>,
) -> Result<Json<Order>, AppError> {
    let own = if caller.role == Role::Rider {
        Some(permissions::own_rider(&state.store, caller)?)
    } else {
        None
    };

    let updated = {
        let mut order = state
            .store
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

        if let Some(own) = &own {
            permissions::ensure_order_scope(own, &order, "report exception for this order")?;
        }

        lifecycle::report_exception(&mut order, payload.kind, payload.description)?;
        order.clone()
    };

    state.metrics.exceptions_reported_total.inc();
    tracing::warn!(order_id = %id, "exception reported");

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct ResolveExceptionRequest {
    pub resolution: String,
    pub status: OrderStatus,
}

async fn resolve_exception(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveExceptionRequest>,
) -> Result<Json<Order>, AppError> {
    permissions::require_privileged(caller, "resolve exceptions")?;

    let mut credit_rider: Option<Uuid> = None;
    let mut release_rider: Option<Uuid> = None;
    let updated = {
        let mut order = state
            .store
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

        if lifecycle::resolve_exception(&mut order, payload.status, payload.resolution)? {
            credit_rider = order.rider;
        } else if payload.status == OrderStatus::Cancelled {
            release_rider = order.rider;
        }
        order.clone()
    };

    if let Some(rider_id) = credit_rider {
        credit_delivery(&state, rider_id, id);
    }
    if let Some(rider_id) = release_rider {
        release_order(&state, rider_id, id);
    }

    tracing::info!(order_id = %id, status = %payload.status, "exception resolved");
    Ok(Json(updated))
}

async fn order_stats(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
) -> Json<stats::OrderStats> {
    Json(stats::order_stats(&state.store))
}

/// Applies the delivery side effect to the rider after the order write has
/// completed. The store offers no cross-entity transaction; if the rider
/// vanished in between, the divergence is logged rather than rolled back.
fn credit_delivery(state: &AppState, rider_id: Uuid, order_id: Uuid) {
    match state.store.riders.get_mut(&rider_id) {
        Some(mut rider) => {
            lifecycle::credit_delivery(&mut rider, order_id);
            state.metrics.deliveries_completed_total.inc();
        }
        None => {
            tracing::warn!(
                order_id = %order_id,
                rider_id = %rider_id,
                "delivered order references a missing rider; delivery not credited"
            );
        }
    }
}

/// Cancellation, deletion, and reassignment all take the order out of the
/// previous rider's working set; a missing rider means the profile was
/// already removed.
fn release_order(state: &AppState, rider_id: Uuid, order_id: Uuid) {
    if let Some(mut rider) = state.store.riders.get_mut(&rider_id) {
        lifecycle::release_order(&mut rider, order_id);
    }
}
