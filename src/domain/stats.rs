//! Read-side aggregation for the dashboard widgets. Pure counts over the
//! store, no mutation.

use std::collections::HashMap;

use chrono::{NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::order::OrderStatus;
use crate::models::rider::{Rider, RiderStatus};
use crate::store::Store;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub active_orders: u64,
    pub delivered_orders: u64,
    pub exception_orders: u64,
    pub today_orders: u64,
    pub on_time_rate: f64,
    pub orders_by_status: Vec<StatusCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRider {
    pub id: Uuid,
    pub name: String,
    pub deliveries_completed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderStats {
    pub total_riders: u64,
    pub active_riders: u64,
    pub on_break_riders: u64,
    pub inactive_riders: u64,
    pub top_riders: Vec<TopRider>,
    pub riders_by_status: Vec<StatusCount>,
}

pub fn order_stats(store: &Store) -> OrderStats {
    let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

    let mut total = 0u64;
    let mut active = 0u64;
    let mut delivered = 0u64;
    let mut exception = 0u64;
    let mut today = 0u64;
    let mut on_time = 0u64;
    let mut by_status: HashMap<OrderStatus, u64> = HashMap::new();

    for entry in store.orders.iter() {
        let order = entry.value();
        total += 1;
        *by_status.entry(order.status).or_default() += 1;

        if order.status.is_active() {
            active += 1;
        }
        match order.status {
            OrderStatus::Delivered => {
                delivered += 1;
                if let Some(actual) = order.delivery.actual_time {
                    if actual <= order.delivery.estimated_time {
                        on_time += 1;
                    }
                }
            }
            OrderStatus::Exception => exception += 1,
            _ => {}
        }
        if order.created_at >= midnight {
            today += 1;
        }
    }

    // Guard divide-by-zero: no deliveries reads as 0, never NaN.
    let on_time_rate = if delivered > 0 {
        on_time as f64 / delivered as f64 * 100.0
    } else {
        0.0
    };

    OrderStats {
        total_orders: total,
        active_orders: active,
        delivered_orders: delivered,
        exception_orders: exception,
        today_orders: today,
        on_time_rate,
        orders_by_status: histogram(by_status),
    }
}

pub fn rider_stats(store: &Store) -> RiderStats {
    let mut total = 0u64;
    let mut active = 0u64;
    let mut on_break = 0u64;
    let mut inactive = 0u64;
    let mut by_status: HashMap<RiderStatus, u64> = HashMap::new();
    let mut all: Vec<Rider> = Vec::new();

    for entry in store.riders.iter() {
        let rider = entry.value();
        total += 1;
        *by_status.entry(rider.status).or_default() += 1;
        match rider.status {
            RiderStatus::Active => active += 1,
            RiderStatus::OnBreak => on_break += 1,
            RiderStatus::Inactive => inactive += 1,
            RiderStatus::Offline => {}
        }
        all.push(rider.clone());
    }

    all.sort_by(|a, b| b.deliveries_completed.cmp(&a.deliveries_completed));
    all.truncate(5);

    let top_riders = all
        .into_iter()
        .map(|rider| TopRider {
            id: rider.id,
            name: store
                .users
                .get(&rider.user)
                .map(|user| user.name.clone())
                .unwrap_or_default(),
            deliveries_completed: rider.deliveries_completed,
        })
        .collect();

    RiderStats {
        total_riders: total,
        active_riders: active,
        on_break_riders: on_break,
        inactive_riders: inactive,
        top_riders,
        riders_by_status: histogram(by_status),
    }
}

fn histogram<S: std::fmt::Display>(counts: HashMap<S, u64>) -> Vec<StatusCount> {
    let mut buckets: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();
    buckets.sort_by(|a, b| a.status.cmp(&b.status));
    buckets
}
