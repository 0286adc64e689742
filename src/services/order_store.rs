//! Persistence for orders, payment transactions and enrollments.
//!
//! Every operation takes a generic connection so callers can run it either
//! on the pool or inside a `DatabaseTransaction`. Status changes on orders go
//! through [`OrderStore::transition`], a compare-and-swap on `row_version`.

use crate::entities::{
    EnrollmentStatus, OrderStatus, TransactionStatus, enrollment_entity as enrollments,
    order_entity as orders, transaction_entity as transactions,
};
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Fields of a transaction row supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub order_id: Uuid,
    pub transaction_gate_id: Option<&'a str>,
    pub payment_method: &'a str,
    pub amount: Decimal,
    pub status: TransactionStatus,
}

#[derive(Clone)]
pub struct OrderStore {
    pool: DatabaseConnection,
}

impl OrderStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabaseConnection {
        &self.pool
    }

    /// Opens the transaction boundary. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        Ok(self.pool.begin().await?)
    }

    pub async fn find_order<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> AppResult<Option<orders::Model>> {
        Ok(orders::Entity::find_by_id(order_id).one(conn).await?)
    }

    pub async fn insert_order<C: ConnectionTrait>(
        conn: &C,
        order: orders::ActiveModel,
    ) -> AppResult<orders::Model> {
        Ok(order.insert(conn).await?)
    }

    /// Exact lookup on the gateway reference; the partial unique index
    /// guarantees at most one row.
    pub async fn find_transaction_by_gateway_id<C: ConnectionTrait>(
        conn: &C,
        gateway_id: &str,
    ) -> AppResult<Option<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::TransactionGateId.eq(gateway_id))
            .one(conn)
            .await?)
    }

    pub async fn insert_transaction<C: ConnectionTrait>(
        conn: &C,
        new: NewTransaction<'_>,
        now: DateTime<Utc>,
    ) -> Result<transactions::Model, DbErr> {
        transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(new.order_id),
            transaction_gate_id: Set(new.transaction_gate_id.map(str::to_string)),
            payment_method: Set(new.payment_method.to_string()),
            amount: Set(new.amount),
            status: Set(new.status),
            created_at: Set(now),
        }
        .insert(conn)
        .await
    }

    pub async fn is_enrolled<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<bool> {
        let count = enrollments::Entity::find()
            .filter(enrollments::Column::UserId.eq(user_id))
            .filter(enrollments::Column::CourseId.eq(course_id))
            .filter(enrollments::Column::Status.eq(EnrollmentStatus::Active))
            .count(conn)
            .await?;
        Ok(count > 0)
    }

    /// Number of distinct courses among `course_ids` the user is enrolled in.
    pub async fn count_enrolled<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        course_ids: &[Uuid],
    ) -> AppResult<u64> {
        if course_ids.is_empty() {
            return Ok(0);
        }
        Ok(enrollments::Entity::find()
            .filter(enrollments::Column::UserId.eq(user_id))
            .filter(enrollments::Column::CourseId.is_in(course_ids.iter().copied()))
            .filter(enrollments::Column::Status.eq(EnrollmentStatus::Active))
            .count(conn)
            .await?)
    }

    pub async fn insert_enrollment<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        course_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<enrollments::Model, DbErr> {
        enrollments::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            course_id: Set(course_id),
            enrolled_at: Set(now),
            status: Set(EnrollmentStatus::Active),
        }
        .insert(conn)
        .await
    }

    /// Moves a pending order to `to` if nobody touched it since `order` was read.
    ///
    /// The update matches on id, the observed `row_version` and
    /// `status = pending`, and bumps `row_version`. Completion additionally
    /// requires the order to still be unexpired at `now`. Returns `false` when
    /// no row matched, i.e. another writer won.
    pub async fn transition<C: ConnectionTrait>(
        conn: &C,
        order: &orders::Model,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let mut update = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(to))
            .col_expr(
                orders::Column::RowVersion,
                Expr::col(orders::Column::RowVersion).add(1),
            )
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::RowVersion.eq(order.row_version))
            .filter(orders::Column::Status.eq(OrderStatus::Pending));

        if to == OrderStatus::Completed {
            update = update.filter(
                Condition::any()
                    .add(orders::Column::ExpiresAt.is_null())
                    .add(orders::Column::ExpiresAt.gte(now)),
            );
        }

        let result = update.exec(conn).await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn find_expired_pending<C: ConnectionTrait>(
        conn: &C,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<orders::Model>> {
        Ok(orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .filter(orders::Column::ExpiresAt.is_not_null())
            .filter(orders::Column::ExpiresAt.lt(now))
            .all(conn)
            .await?)
    }

    /// The user's orders, newest first, each with its transactions.
    pub async fn find_user_orders<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> AppResult<Vec<(orders::Model, Vec<transactions::Model>)>> {
        let user_orders = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .all(conn)
            .await?;
        if user_orders.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_order: HashMap<Uuid, Vec<transactions::Model>> = HashMap::new();
        for tx in transactions::Entity::find()
            .filter(transactions::Column::OrderId.is_in(user_orders.iter().map(|o| o.id)))
            .order_by_asc(transactions::Column::CreatedAt)
            .all(conn)
            .await?
        {
            by_order.entry(tx.order_id).or_default().push(tx);
        }

        Ok(user_orders
            .into_iter()
            .map(|order| {
                let txs = by_order.remove(&order.id).unwrap_or_default();
                (order, txs)
            })
            .collect())
    }
}

/// Unique-index violations are the expected outcome of two writers racing
/// on the same gateway id or enrollment.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
