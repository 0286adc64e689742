#![allow(dead_code)] // each test binary uses a different subset

use chrono::{DateTime, Duration, Utc};
use olp_orders::config::{DatabaseConfig, OrderConfig, PaymentConfig};
use olp_orders::database::{create_pool, run_migrations};
use olp_orders::entities::{
    EnrollmentStatus, OrderStatus, course_entity as courses, enrollment_entity as enrollments,
    learning_path_entity as paths, order_entity as orders, path_course_entity as path_courses,
    transaction_entity as transactions,
};
use olp_orders::services::{OrderService, PaymentService};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::path::PathBuf;
use uuid::Uuid;

pub const PAYMENT_METHOD: &str = "VNPay";

/// Fresh in-memory database with all migrations applied.
///
/// A single connection keeps every query on the same in-memory file.
pub async fn setup_db() -> DatabaseConnection {
    let db = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("connect sqlite");
    run_migrations(&db).await.expect("migrate");
    db
}

/// Migrated database in a temporary file, shared by `max_connections`
/// connections so concurrent tasks really overlap. Delete the returned path
/// when done.
pub async fn setup_file_db(max_connections: u32) -> (DatabaseConnection, PathBuf) {
    let path = std::env::temp_dir().join(format!("olp-orders-{}.db", Uuid::new_v4()));
    let db = create_pool(&DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections,
    })
    .await
    .expect("connect sqlite file");
    run_migrations(&db).await.expect("migrate");
    (db, path)
}

pub fn order_service(db: &DatabaseConnection) -> OrderService {
    OrderService::new(db.clone(), &OrderConfig::default())
}

pub fn payment_service(db: &DatabaseConnection) -> PaymentService {
    PaymentService::new(
        db.clone(),
        &PaymentConfig {
            method: PAYMENT_METHOD.to_string(),
        },
    )
}

pub async fn seed_course(db: &DatabaseConnection, title: &str, price: Decimal) -> Uuid {
    courses::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        price: Set(price),
    }
    .insert(db)
    .await
    .expect("insert course")
    .id
}

pub async fn seed_path(
    db: &DatabaseConnection,
    title: &str,
    price: Decimal,
    course_ids: &[Uuid],
) -> Uuid {
    let path = paths::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        price: Set(price),
    }
    .insert(db)
    .await
    .expect("insert path");

    for (position, course_id) in course_ids.iter().enumerate() {
        add_course_to_path(db, path.id, *course_id, position as i32).await;
    }
    path.id
}

pub async fn add_course_to_path(db: &DatabaseConnection, path_id: Uuid, course_id: Uuid, position: i32) {
    path_courses::ActiveModel {
        path_id: Set(path_id),
        course_id: Set(course_id),
        position: Set(position),
    }
    .insert(db)
    .await
    .expect("insert path course");
}

pub async fn enroll(db: &DatabaseConnection, user_id: Uuid, course_id: Uuid) {
    enrollments::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        course_id: Set(course_id),
        enrolled_at: Set(Utc::now()),
        status: Set(EnrollmentStatus::Active),
    }
    .insert(db)
    .await
    .expect("insert enrollment");
}

/// Inserts a pending order directly, bypassing creation checks.
pub async fn seed_pending_order(
    db: &DatabaseConnection,
    user_id: Uuid,
    course_id: Uuid,
    amount: Decimal,
    expires_at: Option<DateTime<Utc>>,
) -> orders::Model {
    orders::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        course_id: Set(Some(course_id)),
        path_id: Set(None),
        total_amount: Set(amount),
        status: Set(OrderStatus::Pending),
        created_at: Set(Utc::now()),
        expires_at: Set(expires_at),
        row_version: Set(0),
    }
    .insert(db)
    .await
    .expect("insert order")
}

/// Moves an order's deadline into the past.
pub async fn backdate_expiry(db: &DatabaseConnection, order_id: Uuid, minutes_ago: i64) {
    orders::Entity::update_many()
        .col_expr(
            orders::Column::ExpiresAt,
            Expr::value(Utc::now() - Duration::minutes(minutes_ago)),
        )
        .filter(orders::Column::Id.eq(order_id))
        .exec(db)
        .await
        .expect("backdate order");
}

pub async fn load_order(db: &DatabaseConnection, order_id: Uuid) -> orders::Model {
    orders::Entity::find_by_id(order_id)
        .one(db)
        .await
        .expect("load order")
        .expect("order exists")
}

pub async fn order_transactions(db: &DatabaseConnection, order_id: Uuid) -> Vec<transactions::Model> {
    transactions::Entity::find()
        .filter(transactions::Column::OrderId.eq(order_id))
        .all(db)
        .await
        .expect("load transactions")
}

pub async fn enrollment_count(db: &DatabaseConnection, user_id: Uuid, course_id: Uuid) -> u64 {
    enrollments::Entity::find()
        .filter(enrollments::Column::UserId.eq(user_id))
        .filter(enrollments::Column::CourseId.eq(course_id))
        .count(db)
        .await
        .expect("count enrollments")
}

pub async fn total_enrollments(db: &DatabaseConnection, user_id: Uuid) -> u64 {
    enrollments::Entity::find()
        .filter(enrollments::Column::UserId.eq(user_id))
        .count(db)
        .await
        .expect("count enrollments")
}
