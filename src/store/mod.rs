use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::geo::haversine_m;
use crate::models::order::Order;
use crate::models::rider::{GeoPoint, Rider, RiderStatus};
use crate::models::user::User;

/// In-process record store. Unique-key enforcement for `order_number` and
/// `rider.user` lives here, as does the order-number sequence and the
/// nearest-within-radius scan.
pub struct Store {
    pub users: DashMap<Uuid, User>,
    pub riders: DashMap<Uuid, Rider>,
    pub orders: DashMap<Uuid, Order>,
    order_seq: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            riders: DashMap::new(),
            orders: DashMap::new(),
            order_seq: AtomicU64::new(0),
        }
    }

    /// Next human-readable order number from an atomic sequence. The
    /// count-at-creation scheme this replaces could hand the same number to
    /// two concurrent requests.
    pub fn next_order_number(&self) -> String {
        let n = self.order_seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("ORD-{n:04}")
    }

    pub fn order_number_taken(&self, number: &str) -> bool {
        self.orders
            .iter()
            .any(|entry| entry.value().order_number == number)
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone())
    }

    /// At most one rider profile exists per user account.
    pub fn rider_for_user(&self, user_id: Uuid) -> Option<Rider> {
        self.riders
            .iter()
            .find(|entry| entry.value().user == user_id)
            .map(|entry| entry.value().clone())
    }

    /// Orders that block rider deletion: assigned, picked up, or in transit.
    pub fn active_order_count_for_rider(&self, rider_id: Uuid) -> usize {
        use crate::models::order::OrderStatus;
        self.orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.rider == Some(rider_id)
                    && matches!(
                        order.status,
                        OrderStatus::Assigned | OrderStatus::PickedUp | OrderStatus::InTransit
                    )
            })
            .count()
    }

    /// Active riders within `max_distance_m` of `point`, nearest first,
    /// capped at `cap`.
    pub fn nearby_riders(&self, point: GeoPoint, max_distance_m: f64, cap: usize) -> Vec<Rider> {
        let mut hits: Vec<(f64, Rider)> = self
            .riders
            .iter()
            .filter(|entry| entry.value().status == RiderStatus::Active)
            .filter_map(|entry| {
                let distance = haversine_m(&entry.value().location, &point);
                (distance <= max_distance_m).then(|| (distance, entry.value().clone()))
            })
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.truncate(cap);
        hits.into_iter().map(|(_, rider)| rider).collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Store;

    #[test]
    fn order_numbers_are_sequential_and_padded() {
        let store = Store::new();
        assert_eq!(store.next_order_number(), "ORD-0001");
        assert_eq!(store.next_order_number(), "ORD-0002");
        assert_eq!(store.next_order_number(), "ORD-0003");
    }

    #[test]
    fn order_numbers_widen_past_four_digits() {
        let store = Store::new();
        for _ in 0..9_999 {
            store.next_order_number();
        }
        assert_eq!(store.next_order_number(), "ORD-10000");
    }
}
