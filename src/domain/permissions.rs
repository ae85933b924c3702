//! Role-based permission gate. Roles map to actions through the explicit
//! tables below; rider-role update payloads are narrowed to an allow-list
//! before they touch entity state, with disallowed fields dropped silently.

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::order::{Order, OrderPatch, OrderStatus};
use crate::models::rider::{Rider, RiderPatch};
use crate::models::user::Role;
use crate::store::Store;

/// May perform unrestricted updates on orders and riders.
pub const PRIVILEGED: &[Role] = &[
    Role::Admin,
    Role::LogisticsManager,
    Role::OperationsManager,
];

/// May create and delete riders, and delete orders.
pub const ADMIN_AND_LOGISTICS: &[Role] = &[Role::Admin, Role::LogisticsManager];

pub fn require_role(caller: AuthUser, allowed: &[Role], action: &str) -> Result<(), AppError> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("not authorized to {action}")))
    }
}

pub fn require_privileged(caller: AuthUser, action: &str) -> Result<(), AppError> {
    require_role(caller, PRIVILEGED, action)
}

/// Resolves the caller's own rider profile. A rider-role account without a
/// profile cannot act on rider-scoped resources.
pub fn own_rider(store: &Store, caller: AuthUser) -> Result<Rider, AppError> {
    store
        .rider_for_user(caller.id)
        .ok_or_else(|| AppError::NotFound("rider profile not found".to_string()))
}

/// Rider callers may only touch rider profile `rider_id`; privileged callers
/// pass through.
pub fn ensure_rider_scope(
    store: &Store,
    caller: AuthUser,
    rider_id: Uuid,
    action: &str,
) -> Result<(), AppError> {
    if caller.role != Role::Rider {
        return Ok(());
    }
    let own = own_rider(store, caller)?;
    if own.id == rider_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("not authorized to {action}")))
    }
}

/// Rider callers may only mutate orders assigned to their own profile.
pub fn ensure_order_scope(own: &Rider, order: &Order, action: &str) -> Result<(), AppError> {
    if order.rider == Some(own.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("not authorized to {action}")))
    }
}

/// Allow-list filter for order updates. Riders keep `status`, plus the
/// exception details iff the submitted status is `exception`. Everything
/// else is dropped, not rejected.
pub fn scrub_order_patch(role: Role, patch: &mut OrderPatch) {
    if role != Role::Rider {
        return;
    }

    let status = patch.status.take();
    let exception = if status == Some(OrderStatus::Exception) {
        patch.exception.take()
    } else {
        None
    };

    *patch = OrderPatch {
        status,
        exception,
        ..OrderPatch::default()
    };
}

/// Allow-list filter for rider self-updates: `status` and `location` only.
pub fn scrub_rider_patch(role: Role, patch: &mut RiderPatch) {
    if role != Role::Rider {
        return;
    }

    *patch = RiderPatch {
        status: patch.status.take(),
        location: patch.location.take(),
        ..RiderPatch::default()
    };
}

#[cfg(test)]
mod tests {
    use super::{scrub_order_patch, scrub_rider_patch};
    use crate::models::order::{ExceptionKind, ExceptionReport, OrderPatch, OrderStatus, Priority};
    use crate::models::rider::{GeoPoint, RiderPatch, RiderStatus};
    use crate::models::user::Role;

    #[test]
    fn rider_order_patch_keeps_only_status() {
        let mut patch = OrderPatch {
            status: Some(OrderStatus::PickedUp),
            priority: Some(Priority::Urgent),
            notes: Some("free upgrade".to_string()),
            total_weight: Some(12.0),
            ..OrderPatch::default()
        };

        scrub_order_patch(Role::Rider, &mut patch);

        assert_eq!(patch.status, Some(OrderStatus::PickedUp));
        assert!(patch.priority.is_none());
        assert!(patch.notes.is_none());
        assert!(patch.total_weight.is_none());
        assert!(patch.exception.is_none());
    }

    #[test]
    fn rider_order_patch_keeps_exception_with_exception_status() {
        let mut patch = OrderPatch {
            status: Some(OrderStatus::Exception),
            exception: Some(ExceptionReport {
                kind: ExceptionKind::AddressIssue,
                description: "no such street".to_string(),
            }),
            notes: Some("dropped".to_string()),
            ..OrderPatch::default()
        };

        scrub_order_patch(Role::Rider, &mut patch);

        assert_eq!(patch.status, Some(OrderStatus::Exception));
        assert!(patch.exception.is_some());
        assert!(patch.notes.is_none());
    }

    #[test]
    fn rider_order_patch_drops_exception_without_exception_status() {
        let mut patch = OrderPatch {
            status: Some(OrderStatus::InTransit),
            exception: Some(ExceptionReport {
                kind: ExceptionKind::Other,
                description: "x".to_string(),
            }),
            ..OrderPatch::default()
        };

        scrub_order_patch(Role::Rider, &mut patch);

        assert!(patch.exception.is_none());
    }

    #[test]
    fn privileged_order_patch_is_untouched() {
        let mut patch = OrderPatch {
            status: Some(OrderStatus::Cancelled),
            priority: Some(Priority::Low),
            notes: Some("customer cancelled".to_string()),
            ..OrderPatch::default()
        };

        scrub_order_patch(Role::OperationsManager, &mut patch);

        assert!(patch.priority.is_some());
        assert!(patch.notes.is_some());
    }

    #[test]
    fn rider_self_patch_keeps_status_and_location() {
        let mut patch = RiderPatch {
            status: Some(RiderStatus::OnBreak),
            location: Some(GeoPoint { lng: 13.4, lat: 52.5 }),
            phone: Some("555-0000".to_string()),
            capacity: Some(99),
            availability: Some(Vec::new()),
        };

        scrub_rider_patch(Role::Rider, &mut patch);

        assert_eq!(patch.status, Some(RiderStatus::OnBreak));
        assert!(patch.location.is_some());
        assert!(patch.phone.is_none());
        assert!(patch.capacity.is_none());
        assert!(patch.availability.is_none());
    }
}
