//! Reconciles payment gateway callbacks with stored order state.
//!
//! A callback may arrive more than once, carry no gateway id, or race another
//! callback for the same order. Duplicates are absorbed by the gateway-id
//! lookup and the unique index behind it; races are settled by the
//! `row_version` compare-and-swap in [`OrderStore::transition`].

use crate::config::PaymentConfig;
use crate::entities::{OrderStatus, OrderTarget, TransactionStatus, order_entity as orders};
use crate::error::{AppError, AppResult};
use crate::services::catalog_service;
use crate::services::order_store::{NewTransaction, OrderStore, is_unique_violation};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentService {
    store: OrderStore,
    payment_method: String,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection, config: &PaymentConfig) -> Self {
        Self {
            store: OrderStore::new(pool),
            payment_method: config.method.clone(),
        }
    }

    /// Applies a successful gateway result to `order_id`.
    ///
    /// `Ok(true)` means the order is paid, now or by an earlier call. `Ok(false)`
    /// is a declined payment: unknown order, expired order, an earlier failed
    /// attempt under the same gateway id, or a lost race. `Err` is reserved for
    /// infrastructure faults.
    pub async fn process_payment(
        &self,
        order_id: Uuid,
        gateway_transaction_id: Option<&str>,
    ) -> AppResult<bool> {
        let conn = self.store.pool();

        if let Some(gid) = gateway_transaction_id
            && let Some(existing) = OrderStore::find_transaction_by_gateway_id(conn, gid).await?
        {
            let paid = existing.status == TransactionStatus::Success;
            log::info!(
                "Gateway transaction {gid} already recorded as {} for order {}",
                existing.status,
                existing.order_id
            );
            return Ok(paid);
        }

        let Some(order) = OrderStore::find_order(conn, order_id).await? else {
            log::warn!("Payment callback for unknown order {order_id}");
            return Ok(false);
        };

        match order.status {
            OrderStatus::Completed => {
                log::info!("Order {order_id} already completed");
                return Ok(true);
            }
            OrderStatus::Expired => {
                log::info!("Payment declined: order {order_id} is expired");
                return Ok(false);
            }
            OrderStatus::Pending => {}
        }

        let now = Utc::now();
        if order.is_expired_at(now) {
            if OrderStore::transition(conn, &order, OrderStatus::Expired, now).await? {
                log::info!("Order {order_id} expired before payment arrived");
            }
            return Ok(false);
        }

        self.commit_payment(&order, gateway_transaction_id).await
    }

    /// Completes `order` as read by the caller: marks it completed, records the
    /// successful transaction and grants enrollments, all in one transaction.
    ///
    /// Returns `Ok(false)` without side effects when the order changed since
    /// the snapshot was taken or a concurrent writer claimed the gateway id.
    pub async fn commit_payment(
        &self,
        order: &orders::Model,
        gateway_transaction_id: Option<&str>,
    ) -> AppResult<bool> {
        let txn = self.store.begin().await?;
        let now = Utc::now();

        match self
            .apply_payment(&txn, order, gateway_transaction_id, now)
            .await
        {
            Ok(true) => {
                txn.commit().await?;
                log::info!(
                    "Payment committed for order {} (gateway id {:?})",
                    order.id,
                    gateway_transaction_id
                );
                Ok(true)
            }
            Ok(false) => {
                txn.rollback().await?;
                log::warn!(
                    "Payment for order {} lost a concurrent update (version {})",
                    order.id,
                    order.row_version
                );
                Ok(false)
            }
            Err(AppError::DatabaseError(err)) if is_unique_violation(&err) => {
                txn.rollback().await?;
                log::warn!(
                    "Payment for order {} raced a concurrent writer: {err}",
                    order.id
                );
                Ok(false)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    log::error!("Rollback failed for order {}: {rollback_err}", order.id);
                }
                Err(err)
            }
        }
    }

    async fn apply_payment(
        &self,
        txn: &DatabaseTransaction,
        order: &orders::Model,
        gateway_transaction_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        if !OrderStore::transition(txn, order, OrderStatus::Completed, now).await? {
            return Ok(false);
        }

        OrderStore::insert_transaction(
            txn,
            NewTransaction {
                order_id: order.id,
                transaction_gate_id: gateway_transaction_id,
                payment_method: &self.payment_method,
                amount: order.amount_due(),
                status: TransactionStatus::Success,
            },
            now,
        )
        .await?;

        let course_ids = match order.target() {
            Some(OrderTarget::Course(course_id)) => vec![course_id],
            Some(OrderTarget::Path(path_id)) => match catalog_service::find_path(txn, path_id).await? {
                Some(path) => path.course_ids,
                None => {
                    log::warn!(
                        "Learning path {path_id} missing while completing order {}",
                        order.id
                    );
                    Vec::new()
                }
            },
            None => {
                log::warn!("Order {} has no purchasable target", order.id);
                Vec::new()
            }
        };

        let mut granted = 0usize;
        for course_id in course_ids {
            if OrderStore::is_enrolled(txn, order.user_id, course_id).await? {
                continue;
            }
            OrderStore::insert_enrollment(txn, order.user_id, course_id, now).await?;
            granted += 1;
        }
        log::debug!("Granted {granted} enrollment(s) for order {}", order.id);

        Ok(true)
    }

    /// Records a failed gateway attempt so a replay of the same gateway id is
    /// declined. Returns `false` for unknown orders or an already-recorded id.
    pub async fn record_failed_payment(
        &self,
        order_id: Uuid,
        gateway_transaction_id: Option<&str>,
    ) -> AppResult<bool> {
        let conn = self.store.pool();

        if let Some(gid) = gateway_transaction_id
            && OrderStore::find_transaction_by_gateway_id(conn, gid)
                .await?
                .is_some()
        {
            return Ok(false);
        }

        let Some(order) = OrderStore::find_order(conn, order_id).await? else {
            log::warn!("Failed payment reported for unknown order {order_id}");
            return Ok(false);
        };

        let inserted = OrderStore::insert_transaction(
            conn,
            NewTransaction {
                order_id: order.id,
                transaction_gate_id: gateway_transaction_id,
                payment_method: &self.payment_method,
                amount: order.amount_due(),
                status: TransactionStatus::Failed,
            },
            Utc::now(),
        )
        .await;

        match inserted {
            Ok(_) => {
                log::info!("Recorded failed payment for order {order_id}");
                Ok(true)
            }
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
