//! Order model and the rules governing post-creation mutation.
//!
//! The rule functions here are pure: they see the order's owner and
//! current status plus the requested patch, and decide. Handlers call
//! them before touching the database, so the whole permission matrix is
//! unit-testable without a store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{OrderId, OrderStatus, PaymentMethod, ProductId, Role, UserId};

use super::product::Product;
use crate::error::AppError;

/// An order snapshot with its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: bool,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One order line: the snapshot taken at checkout, plus the current
/// catalog record when it still exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

/// The mutable subset of an order. User identity and line items are not
/// patchable by anyone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderPatch {
    pub shipping_address: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<bool>,
}

impl OrderPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.shipping_address.is_none() && self.status.is_none() && self.payment_status.is_none()
    }
}

/// Decide whether `caller` may apply `patch` to an order owned by
/// `order_user` that currently sits in `order_status`.
///
/// Admins may touch any patchable field. Customers may only touch their
/// own orders, only `shippingAddress` and `status`, and the only status
/// they can request is `cancelled` - and then only while the order is
/// still pending.
///
/// # Errors
///
/// `Forbidden` for ownership/field violations, `BadRequest` for a
/// customer cancelling a non-pending order. Status transition legality
/// is checked separately by [`check_transition`].
pub fn authorize_patch(
    caller_id: UserId,
    caller_role: Role,
    order_user: UserId,
    order_status: OrderStatus,
    patch: &OrderPatch,
) -> Result<(), AppError> {
    if caller_role == Role::Admin {
        return Ok(());
    }

    if order_user != caller_id {
        return Err(AppError::Forbidden(
            "You can only update your own orders".to_string(),
        ));
    }

    if patch.payment_status.is_some() {
        return Err(AppError::Forbidden(
            "You can only update: shippingAddress, status".to_string(),
        ));
    }

    if let Some(requested) = patch.status {
        if requested != OrderStatus::Cancelled {
            return Err(AppError::Forbidden(
                "You can only cancel orders".to_string(),
            ));
        }
        if order_status != OrderStatus::Pending {
            return Err(AppError::BadRequest(
                "You can only cancel pending orders".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate a status transition against the lifecycle table.
///
/// # Errors
///
/// `BadRequest` naming source and target when the move is not in the
/// table.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid status transition from {from} to {to}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const OWNER: UserId = UserId::new(1);
    const OTHER: UserId = UserId::new(2);

    fn cancel_patch() -> OrderPatch {
        OrderPatch {
            status: Some(OrderStatus::Cancelled),
            ..OrderPatch::default()
        }
    }

    #[test]
    fn test_admin_may_patch_anything() {
        let patch = OrderPatch {
            shipping_address: Some("221B Baker Street, London".to_string()),
            status: Some(OrderStatus::Processing),
            payment_status: Some(true),
        };
        assert!(
            authorize_patch(OTHER, Role::Admin, OWNER, OrderStatus::Pending, &patch).is_ok()
        );
    }

    #[test]
    fn test_customer_cannot_touch_foreign_order() {
        let err = authorize_patch(
            OTHER,
            Role::Customer,
            OWNER,
            OrderStatus::Pending,
            &cancel_patch(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_customer_cannot_patch_payment_status() {
        let patch = OrderPatch {
            payment_status: Some(true),
            ..OrderPatch::default()
        };
        let err =
            authorize_patch(OWNER, Role::Customer, OWNER, OrderStatus::Pending, &patch)
                .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_customer_may_only_cancel() {
        let patch = OrderPatch {
            status: Some(OrderStatus::Shipped),
            ..OrderPatch::default()
        };
        let err =
            authorize_patch(OWNER, Role::Customer, OWNER, OrderStatus::Pending, &patch)
                .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_customer_cancel_requires_pending() {
        let err = authorize_patch(
            OWNER,
            Role::Customer,
            OWNER,
            OrderStatus::Processing,
            &cancel_patch(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_customer_may_cancel_pending() {
        assert!(
            authorize_patch(
                OWNER,
                Role::Customer,
                OWNER,
                OrderStatus::Pending,
                &cancel_patch()
            )
            .is_ok()
        );
    }

    #[test]
    fn test_customer_may_change_address_any_status() {
        let patch = OrderPatch {
            shipping_address: Some("742 Evergreen Terrace, Springfield".to_string()),
            ..OrderPatch::default()
        };
        assert!(
            authorize_patch(OWNER, Role::Customer, OWNER, OrderStatus::Shipped, &patch).is_ok()
        );
    }

    #[test]
    fn test_transition_check_messages() {
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Processing).is_ok());

        let err =
            check_transition(OrderStatus::Shipped, OrderStatus::Pending).unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.contains("shipped"));
                assert!(msg.contains("pending"));
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let result: Result<OrderPatch, _> =
            serde_json::from_str(r#"{"userId": 9, "status": "cancelled"}"#);
        assert!(result.is_err());
    }
}
