use crate::entities::{OrderStatus, OrderTarget, order_entity};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Exactly one of `course_id` / `path_id` must be set.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub course_id: Option<Uuid>,
    pub path_id: Option<Uuid>,
}

impl CreateOrderRequest {
    pub fn target(&self) -> AppResult<OrderTarget> {
        match (self.course_id, self.path_id) {
            (Some(id), None) => Ok(OrderTarget::Course(id)),
            (None, Some(id)) => Ok(OrderTarget::Path(id)),
            (Some(_), Some(_)) => Err(AppError::ValidationError(
                "An order targets either a course or a learning path, not both".into(),
            )),
            (None, None) => Err(AppError::ValidationError(
                "course_id or path_id is required".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub course_id: Option<Uuid>,
    pub path_id: Option<Uuid>,
    pub title: String,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OrderSummary {
    pub fn from_model(m: order_entity::Model, title: String) -> Self {
        Self {
            order_id: m.id,
            course_id: m.course_id,
            path_id: m.path_id,
            title,
            amount: m.amount_due(),
            status: m.status,
            expires_at: m.expires_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemType {
    Course,
    LearningPath,
}

/// One row of the order history page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserOrderResponse {
    pub order_id: Uuid,
    pub item_title: String,
    pub item_type: OrderItemType,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub minutes_remaining: Option<i64>,
    pub can_continue_payment: bool,
    pub payment_method: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Whole minutes left to pay, rounded up, and whether payment may continue.
///
/// Only pending orders with an expiry have a countdown.
pub fn payment_window(
    status: OrderStatus,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Option<i64>, bool) {
    match (status, expires_at) {
        (OrderStatus::Pending, Some(at)) => {
            let remaining_ms = (at - now).num_milliseconds();
            let minutes = (remaining_ms as f64 / 60_000.0).ceil() as i64;
            (Some(minutes), remaining_ms > 0)
        }
        _ => (None, false),
    }
}

/// What the gateway needs to start (or resume) a payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PaymentRequest {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub description: String,
}

impl PaymentRequest {
    pub fn for_order(order: &order_entity::Model) -> Self {
        Self {
            order_id: order.id,
            amount: order.amount_due(),
            description: format!("Payment_for_order_{}", order.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuePaymentDecision {
    Payable(PaymentRequest),
    NotFound,
    Expired,
    AlreadyCompleted,
}
