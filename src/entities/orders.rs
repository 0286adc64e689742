use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(50))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Decimal places of every stored amount. SQLite hands money back through
/// `f64`, so values read from storage are rounded to this scale before use.
pub const MONEY_SCALE: u32 = 2;

/// What an order buys: a single course or a whole learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTarget {
    Course(Uuid),
    Path(Uuid),
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub path_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by every update.
    pub row_version: i64,
}

impl Model {
    pub fn target(&self) -> Option<OrderTarget> {
        match (self.course_id, self.path_id) {
            (Some(course_id), None) => Some(OrderTarget::Course(course_id)),
            (None, Some(path_id)) => Some(OrderTarget::Path(path_id)),
            _ => None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Order total at currency scale.
    pub fn amount_due(&self) -> Decimal {
        self.total_amount.round_dp(MONEY_SCALE)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
