mod common;

use chrono::{Duration, Utc};
use common::*;
use olp_orders::entities::{OrderStatus, OrderTarget, TransactionStatus};
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

#[tokio::test]
async fn successful_callback_completes_order_and_enrolls() {
    let db = setup_db().await;
    let orders = order_service(&db);
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Rust for Backend Developers", dec!(49.99)).await;

    let summary = orders
        .create_order(user, OrderTarget::Course(course))
        .await
        .unwrap()
        .expect("order created");
    assert_eq!(summary.status, OrderStatus::Pending);
    assert_eq!(summary.amount, dec!(49.99));

    assert!(payments.process_payment(summary.order_id, Some("gw-123")).await.unwrap());

    let order = load_order(&db, summary.order_id).await;
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.row_version, 1);

    let txs = order_transactions(&db, summary.order_id).await;
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].status, TransactionStatus::Success);
    assert_eq!(txs[0].transaction_gate_id.as_deref(), Some("gw-123"));
    assert_eq!(txs[0].payment_method, PAYMENT_METHOD);
    assert_eq!(txs[0].amount.round_dp(2), dec!(49.99));
    assert_eq!(enrollment_count(&db, user, course).await, 1);

    // replay of the same callback
    assert!(payments.process_payment(summary.order_id, Some("gw-123")).await.unwrap());
    assert_eq!(order_transactions(&db, summary.order_id).await.len(), 1);
    assert_eq!(enrollment_count(&db, user, course).await, 1);
    assert_eq!(load_order(&db, summary.order_id).await.row_version, 1);
}

#[tokio::test]
async fn already_completed_order_short_circuits() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "SQL Basics", dec!(10)).await;
    let order = seed_pending_order(&db, user, course, dec!(10), None).await;

    assert!(payments.process_payment(order.id, None).await.unwrap());
    // a second callback without a gateway id
    assert!(payments.process_payment(order.id, None).await.unwrap());
    // and one with a fresh gateway id
    assert!(payments.process_payment(order.id, Some("gw-late")).await.unwrap());

    assert_eq!(order_transactions(&db, order.id).await.len(), 1);
    assert_eq!(enrollment_count(&db, user, course).await, 1);
}

#[tokio::test]
async fn enrollment_made_elsewhere_is_not_duplicated() {
    let db = setup_db().await;
    let orders = order_service(&db);
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Algorithms", dec!(25)).await;

    let summary = orders
        .create_order(user, OrderTarget::Course(course))
        .await
        .unwrap()
        .expect("order created");
    // e.g. granted by an admin while the order was pending
    enroll(&db, user, course).await;

    assert!(payments.process_payment(summary.order_id, Some("gw-1")).await.unwrap());
    assert_eq!(enrollment_count(&db, user, course).await, 1);
    assert_eq!(load_order(&db, summary.order_id).await.status, OrderStatus::Completed);
}

#[tokio::test]
async fn expired_order_is_declined_and_marked_expired() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Docker", dec!(15)).await;
    let order = seed_pending_order(
        &db,
        user,
        course,
        dec!(15),
        Some(Utc::now() - Duration::minutes(1)),
    )
    .await;

    assert!(!payments.process_payment(order.id, Some("gw-valid")).await.unwrap());

    let stored = load_order(&db, order.id).await;
    assert_eq!(stored.status, OrderStatus::Expired);
    assert!(order_transactions(&db, order.id).await.is_empty());
    assert_eq!(enrollment_count(&db, user, course).await, 0);

    // stays declined
    assert!(!payments.process_payment(order.id, None).await.unwrap());
}

#[tokio::test]
async fn unknown_order_is_declined() {
    let db = setup_db().await;
    let payments = payment_service(&db);

    assert!(!payments.process_payment(Uuid::new_v4(), Some("gw-x")).await.unwrap());
}

#[tokio::test]
async fn failed_attempt_blocks_replay_of_same_gateway_id() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Kubernetes", dec!(30)).await;
    let order = seed_pending_order(
        &db,
        user,
        course,
        dec!(30),
        Some(Utc::now() + Duration::minutes(30)),
    )
    .await;

    assert!(payments.record_failed_payment(order.id, Some("gw-fail")).await.unwrap());
    // duplicate failure report
    assert!(!payments.record_failed_payment(order.id, Some("gw-fail")).await.unwrap());
    assert!(!payments.process_payment(order.id, Some("gw-fail")).await.unwrap());

    assert_eq!(load_order(&db, order.id).await.status, OrderStatus::Pending);
    let txs = order_transactions(&db, order.id).await;
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].status, TransactionStatus::Failed);

    // a new attempt with its own gateway id still goes through
    assert!(payments.process_payment(order.id, Some("gw-retry")).await.unwrap());
    assert_eq!(load_order(&db, order.id).await.status, OrderStatus::Completed);
    assert_eq!(enrollment_count(&db, user, course).await, 1);
}

#[tokio::test]
async fn stale_snapshot_loses_to_first_commit() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Networking", dec!(20)).await;
    let order = seed_pending_order(
        &db,
        user,
        course,
        dec!(20),
        Some(Utc::now() + Duration::minutes(30)),
    )
    .await;

    // both callbacks read the order before either commits
    let first_view = load_order(&db, order.id).await;
    let second_view = load_order(&db, order.id).await;

    assert!(payments.commit_payment(&first_view, None).await.unwrap());
    assert!(!payments.commit_payment(&second_view, None).await.unwrap());

    let stored = load_order(&db, order.id).await;
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.row_version, 1);
    assert_eq!(order_transactions(&db, order.id).await.len(), 1);
    assert_eq!(enrollment_count(&db, user, course).await, 1);
}

#[tokio::test]
async fn stale_snapshot_with_claimed_gateway_id_rolls_back() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Compilers", dec!(40)).await;
    let other_course = seed_course(&db, "Linkers", dec!(40)).await;
    let order = seed_pending_order(&db, user, course, dec!(40), None).await;
    let other = seed_pending_order(&db, user, other_course, dec!(40), None).await;

    assert!(payments.process_payment(order.id, Some("gw-shared")).await.unwrap());

    // the gateway id is already taken, so the unique index rejects the insert
    let snapshot = load_order(&db, other.id).await;
    assert!(!payments.commit_payment(&snapshot, Some("gw-shared")).await.unwrap());

    let stored = load_order(&db, other.id).await;
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.row_version, 0);
    assert!(order_transactions(&db, other.id).await.is_empty());
    assert_eq!(enrollment_count(&db, user, other_course).await, 0);
}

#[tokio::test]
async fn concurrent_callbacks_complete_order_once() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Concurrency", dec!(35)).await;
    let order = seed_pending_order(
        &db,
        user,
        course,
        dec!(35),
        Some(Utc::now() + Duration::minutes(30)),
    )
    .await;

    let (a, b) = tokio::join!(
        payments.process_payment(order.id, None),
        payments.process_payment(order.id, None)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    // both read the pending order; only one swap lands
    assert!(a ^ b, "expected exactly one winner, got a={a} b={b}");
    let stored = load_order(&db, order.id).await;
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.row_version, 1);
    assert_eq!(order_transactions(&db, order.id).await.len(), 1);
    assert_eq!(enrollment_count(&db, user, course).await, 1);
}

#[tokio::test]
async fn path_payment_enrolls_current_courses_not_owned() {
    let db = setup_db().await;
    let orders = order_service(&db);
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let owned = seed_course(&db, "HTML", dec!(5)).await;
    let css = seed_course(&db, "CSS", dec!(5)).await;
    let js = seed_course(&db, "JavaScript", dec!(5)).await;
    let path = seed_path(&db, "Frontend", dec!(12), &[owned, css]).await;
    enroll(&db, user, owned).await;

    let summary = orders
        .create_order(user, OrderTarget::Path(path))
        .await
        .unwrap()
        .expect("path order created");
    assert_eq!(summary.path_id, Some(path));

    // the path gains a course after the order was placed
    add_course_to_path(&db, path, js, 2).await;

    assert!(payments.process_payment(summary.order_id, Some("gw-path")).await.unwrap());

    assert_eq!(enrollment_count(&db, user, owned).await, 1);
    assert_eq!(enrollment_count(&db, user, css).await, 1);
    assert_eq!(enrollment_count(&db, user, js).await, 1);
    assert_eq!(total_enrollments(&db, user).await, 3);

    let txs = order_transactions(&db, summary.order_id).await;
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].amount.round_dp(2), dec!(12));
}

#[tokio::test]
async fn backdated_order_created_through_service_is_declined() {
    let db = setup_db().await;
    let orders = order_service(&db);
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Go", dec!(18)).await;

    let summary = orders
        .create_order(user, OrderTarget::Course(course))
        .await
        .unwrap()
        .expect("order created");
    backdate_expiry(&db, summary.order_id, 5).await;

    assert!(!payments.process_payment(summary.order_id, Some("gw-late")).await.unwrap());
    assert_eq!(load_order(&db, summary.order_id).await.status, OrderStatus::Expired);
    assert_eq!(enrollment_count(&db, user, course).await, 0);
}

#[tokio::test]
async fn racing_commits_on_separate_connections_pick_one_winner() {
    let (db, path) = setup_file_db(4).await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Parallelism", dec!(45)).await;
    let order = seed_pending_order(
        &db,
        user,
        course,
        dec!(45),
        Some(Utc::now() + Duration::minutes(30)),
    )
    .await;

    // each callback has already read the pending order
    let first_view = load_order(&db, order.id).await;
    let second_view = load_order(&db, order.id).await;

    let first = {
        let payments = payments.clone();
        tokio::spawn(async move { payments.commit_payment(&first_view, Some("gw-race-a")).await })
    };
    let second = {
        let payments = payments.clone();
        tokio::spawn(async move { payments.commit_payment(&second_view, Some("gw-race-b")).await })
    };
    let a = first.await.expect("join").expect("first commit");
    let b = second.await.expect("join").expect("second commit");

    assert!(a ^ b, "expected exactly one winner, got a={a} b={b}");
    let stored = load_order(&db, order.id).await;
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.row_version, 1);
    let txs = order_transactions(&db, order.id).await;
    assert_eq!(txs.len(), 1);
    let winner_gid = if a { "gw-race-a" } else { "gw-race-b" };
    assert_eq!(txs[0].transaction_gate_id.as_deref(), Some(winner_gid));
    assert_eq!(enrollment_count(&db, user, course).await, 1);

    db.close().await.expect("close pool");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn storage_fault_during_commit_rolls_back_and_propagates() {
    let db = setup_db().await;
    let payments = payment_service(&db);
    let user = Uuid::new_v4();
    let course = seed_course(&db, "Fault Tolerance", dec!(27)).await;
    let order = seed_pending_order(
        &db,
        user,
        course,
        dec!(27),
        Some(Utc::now() + Duration::minutes(30)),
    )
    .await;

    // the enrollment step has nowhere to write
    db.execute_unprepared("DROP TABLE enrollments")
        .await
        .expect("drop enrollments");

    let result = payments.process_payment(order.id, Some("gw-fault")).await;
    assert!(result.is_err(), "expected a storage error, got {result:?}");

    let stored = load_order(&db, order.id).await;
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.row_version, 0);
    assert!(order_transactions(&db, order.id).await.is_empty());
}
