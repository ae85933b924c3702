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
use crate::domain::{permissions, stats};
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::models::rider::{AvailabilityDay, GeoPoint, Rider, RiderPatch, RiderStatus};
use crate::models::user::Role;
use crate::state::AppState;

use super::{paginate, Page};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_rider).get(list_riders))
        .route("/stats", get(rider_stats))
        .route("/nearby", get(nearby_riders))
        .route("/:id", get(get_rider).put(update_rider).delete(delete_rider))
        .route("/:id/location", post(update_location))
        .route("/:id/orders", get(rider_orders))
        .route("/:id/status", post(update_status))
        .route("/:id/availability", post(update_availability))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRiderRequest {
    pub user_id: Uuid,
    pub phone: String,
    pub capacity: Option<u32>,
}

async fn create_rider(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Json(payload): Json<CreateRiderRequest>,
) -> Result<(StatusCode, Json<Rider>), AppError> {
    permissions::require_role(caller, permissions::ADMIN_AND_LOGISTICS, "create riders")?;

    if payload.phone.trim().is_empty() {
        return Err(AppError::Validation("phone number is required".to_string()));
    }
    let capacity = payload.capacity.unwrap_or(5);
    if capacity < 1 {
        return Err(AppError::Validation(
            "capacity must be a positive number".to_string(),
        ));
    }

    let user = state
        .store
        .users
        .get(&payload.user_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    if user.role != Role::Rider {
        return Err(AppError::Validation(
            "user must have rider role".to_string(),
        ));
    }
    if state.store.rider_for_user(payload.user_id).is_some() {
        return Err(AppError::Conflict(
            "rider profile already exists for this user".to_string(),
        ));
    }

    let rider = Rider {
        id: Uuid::new_v4(),
        user: payload.user_id,
        phone: payload.phone,
        status: RiderStatus::Offline,
        location: GeoPoint { lng: 0.0, lat: 0.0 },
        current_orders: Vec::new(),
        deliveries_completed: 0,
        capacity,
        availability: Vec::new(),
        created_at: Utc::now(),
    };

    state.store.riders.insert(rider.id, rider.clone());
    tracing::info!(rider_id = %rider.id, user_id = %rider.user, "rider profile created");

    Ok((StatusCode::CREATED, Json(rider)))
}

#[derive(Deserialize)]
pub struct ListRidersQuery {
    pub status: Option<RiderStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

async fn list_riders(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Query(query): Query<ListRidersQuery>,
) -> Result<Json<Page<Rider>>, AppError> {
    permissions::require_privileged(caller, "list riders")?;

    let mut riders: Vec<Rider> = state
        .store
        .riders
        .iter()
        .filter(|entry| {
            query
                .status
                .map_or(true, |status| entry.value().status == status)
        })
        .map(|entry| entry.value().clone())
        .collect();

    riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(paginate(
        riders,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(10),
    )))
}

async fn get_rider(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Rider>, AppError> {
    permissions::ensure_rider_scope(&state.store, caller, id, "view this rider")?;

    let rider = state
        .store
        .riders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("rider not found".to_string()))?;

    Ok(Json(rider))
}

async fn update_rider(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(mut patch): Json<RiderPatch>,
) -> Result<Json<Rider>, AppError> {
    permissions::ensure_rider_scope(&state.store, caller, id, "update this rider")?;
    permissions::scrub_rider_patch(caller.role, &mut patch);

    if let Some(capacity) = patch.capacity {
        if capacity < 1 {
            return Err(AppError::Validation(
                "capacity must be a positive number".to_string(),
            ));
        }
    }

    let mut rider = state
        .store
        .riders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound("rider not found".to_string()))?;

    if let Some(phone) = patch.phone.take() {
        rider.phone = phone;
    }
    if let Some(status) = patch.status.take() {
        rider.status = status;
    }
    if let Some(location) = patch.location.take() {
        rider.location = location;
    }
    if let Some(capacity) = patch.capacity.take() {
        rider.capacity = capacity;
    }
    if let Some(availability) = patch.availability.take() {
        rider.availability = availability;
    }

    Ok(Json(rider.clone()))
}

async fn delete_rider(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require_role(caller, permissions::ADMIN_AND_LOGISTICS, "delete riders")?;

    if !state.store.riders.contains_key(&id) {
        return Err(AppError::NotFound("rider not found".to_string()));
    }

    let active_orders = state.store.active_order_count_for_rider(id);
    if active_orders > 0 {
        return Err(AppError::Conflict(
            "cannot delete rider with active orders; reassign or complete orders first"
                .to_string(),
        ));
    }

    state.store.riders.remove(&id);
    tracing::info!(rider_id = %id, "rider profile removed");

    Ok(Json(json!({ "message": "rider profile removed" })))
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub longitude: f64,
    pub latitude: f64,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Rider>, AppError> {
    permissions::ensure_rider_scope(&state.store, caller, id, "update this rider location")?;

    let mut rider = state
        .store
        .riders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound("rider not found".to_string()))?;

    rider.location = GeoPoint {
        lng: payload.longitude,
        lat: payload.latitude,
    };

    Ok(Json(rider.clone()))
}

#[derive(Deserialize)]
pub struct RiderOrdersQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

async fn rider_orders(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<RiderOrdersQuery>,
) -> Result<Json<Page<Order>>, AppError> {
    permissions::ensure_rider_scope(&state.store, caller, id, "view this rider's orders")?;

    if !state.store.riders.contains_key(&id) {
        return Err(AppError::NotFound("rider not found".to_string()));
    }

    let mut orders: Vec<Order> = state
        .store
        .orders
        .iter()
        .filter(|entry| {
            let order = entry.value();
            order.rider == Some(id)
                && query.status.map_or(true, |status| order.status == status)
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

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RiderStatus,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Rider>, AppError> {
    permissions::ensure_rider_scope(&state.store, caller, id, "update this rider status")?;

    let mut rider = state
        .store
        .riders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound("rider not found".to_string()))?;

    rider.status = payload.status;

    Ok(Json(rider.clone()))
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub availability: Vec<AvailabilityDay>,
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Rider>, AppError> {
    permissions::ensure_rider_scope(&state.store, caller, id, "update this rider availability")?;

    let mut rider = state
        .store
        .riders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound("rider not found".to_string()))?;

    rider.availability = payload.availability;

    Ok(Json(rider.clone()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub longitude: f64,
    pub latitude: f64,
    pub max_distance: Option<f64>,
}

async fn nearby_riders(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<Rider>>, AppError> {
    permissions::require_privileged(caller, "search nearby riders")?;

    let point = GeoPoint {
        lng: query.longitude,
        lat: query.latitude,
    };
    let riders = state
        .store
        .nearby_riders(point, query.max_distance.unwrap_or(5_000.0), 10);

    Ok(Json(riders))
}

async fn rider_stats(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> Result<Json<stats::RiderStats>, AppError> {
    permissions::require_privileged(caller, "view rider statistics")?;
    Ok(Json(stats::rider_stats(&state.store)))
}
