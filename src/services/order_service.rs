use crate::config::OrderConfig;
use crate::entities::{OrderStatus, OrderTarget, TransactionStatus, order_entity as orders};
use crate::error::AppResult;
use crate::models::{
    ContinuePaymentDecision, OrderItemType, OrderSummary, PaymentRequest, UserOrderResponse,
    payment_window,
};
use crate::services::catalog_service::{self, CatalogService};
use crate::services::order_store::OrderStore;
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, Set};
use uuid::Uuid;

const UNKNOWN_TITLE: &str = "Unknown";

/// Order creation, lookup and expiration.
#[derive(Clone)]
pub struct OrderService {
    store: OrderStore,
    catalog: CatalogService,
    order_ttl: Duration,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, config: &OrderConfig) -> Self {
        Self {
            store: OrderStore::new(pool.clone()),
            catalog: CatalogService::new(pool),
            order_ttl: Duration::minutes(config.expiry_minutes),
        }
    }

    /// Places a pending order for a course or a learning path.
    ///
    /// Returns `None` when the item does not exist, the path has no courses,
    /// or the user already owns what the order would grant.
    pub async fn create_order(
        &self,
        user_id: Uuid,
        target: OrderTarget,
    ) -> AppResult<Option<OrderSummary>> {
        let conn = self.store.pool();

        let (title, price) = match target {
            OrderTarget::Course(course_id) => {
                if OrderStore::is_enrolled(conn, user_id, course_id).await? {
                    log::info!("User {user_id} already enrolled in course {course_id}");
                    return Ok(None);
                }
                let Some(course) = self.catalog.get_course(course_id).await? else {
                    log::warn!("Order rejected: course {course_id} not found");
                    return Ok(None);
                };
                (course.title, course.price)
            }
            OrderTarget::Path(path_id) => {
                let Some(path) = self.catalog.get_path(path_id).await? else {
                    log::warn!("Order rejected: learning path {path_id} not found");
                    return Ok(None);
                };
                if path.course_ids.is_empty() {
                    log::warn!("Order rejected: learning path {path_id} has no courses");
                    return Ok(None);
                }
                let owned = OrderStore::count_enrolled(conn, user_id, &path.course_ids).await?;
                if owned as usize >= path.course_ids.len() {
                    log::info!("User {user_id} already joined learning path {path_id}");
                    return Ok(None);
                }
                (path.title, path.price)
            }
        };

        let now = Utc::now();
        let (course_id, path_id) = match target {
            OrderTarget::Course(id) => (Some(id), None),
            OrderTarget::Path(id) => (None, Some(id)),
        };
        let order = OrderStore::insert_order(
            conn,
            orders::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                course_id: Set(course_id),
                path_id: Set(path_id),
                total_amount: Set(price),
                status: Set(OrderStatus::Pending),
                created_at: Set(now),
                expires_at: Set(Some(now + self.order_ttl)),
                row_version: Set(0),
            },
        )
        .await?;

        log::info!(
            "Created order {} for user {user_id}: {} ({})",
            order.id,
            title,
            order.total_amount
        );
        Ok(Some(OrderSummary::from_model(order, title)))
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Option<OrderSummary>> {
        let conn = self.store.pool();
        let Some(order) = OrderStore::find_order(conn, order_id).await? else {
            return Ok(None);
        };
        let title = catalog_service::find_item_title(conn, order.course_id, order.path_id)
            .await?
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        Ok(Some(OrderSummary::from_model(order, title)))
    }

    /// Like [`get_order`](Self::get_order) but hides other users' orders.
    pub async fn get_order_for_user(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderSummary>> {
        let conn = self.store.pool();
        match OrderStore::find_order(conn, order_id).await? {
            Some(order) if order.user_id == user_id => self.get_order(order_id).await,
            _ => Ok(None),
        }
    }

    /// Order history, newest first.
    pub async fn get_user_orders(&self, user_id: Uuid) -> AppResult<Vec<UserOrderResponse>> {
        let conn = self.store.pool();
        let rows = OrderStore::find_user_orders(conn, user_id).await?;

        let course_ids = rows.iter().filter_map(|(o, _)| o.course_id).collect();
        let path_ids = rows.iter().filter_map(|(o, _)| o.path_id).collect();
        let (course_titles, path_titles) =
            catalog_service::find_titles(conn, course_ids, path_ids).await?;

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|(order, txs)| {
                let (item_title, item_type) = match order.course_id {
                    Some(id) => (
                        course_titles
                            .get(&id)
                            .cloned()
                            .unwrap_or_else(|| "Unknown Course".to_string()),
                        OrderItemType::Course,
                    ),
                    None => (
                        order
                            .path_id
                            .and_then(|id| path_titles.get(&id).cloned())
                            .unwrap_or_else(|| "Unknown Learning Path".to_string()),
                        OrderItemType::LearningPath,
                    ),
                };
                let (minutes_remaining, can_continue_payment) =
                    payment_window(order.status, order.expires_at, now);
                let paid = txs
                    .iter()
                    .find(|t| t.status == TransactionStatus::Success);

                UserOrderResponse {
                    order_id: order.id,
                    item_title,
                    item_type,
                    amount: order.amount_due(),
                    status: order.status,
                    created_at: order.created_at,
                    expires_at: order.expires_at,
                    minutes_remaining,
                    can_continue_payment,
                    payment_method: paid.map(|t| t.payment_method.clone()),
                    completed_at: paid.map(|t| t.created_at),
                }
            })
            .collect())
    }

    /// Decides whether the owner may resume paying for `order_id`.
    pub async fn continue_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<ContinuePaymentDecision> {
        let order = match OrderStore::find_order(self.store.pool(), order_id).await? {
            Some(order) if order.user_id == user_id => order,
            _ => return Ok(ContinuePaymentDecision::NotFound),
        };

        Ok(match order.status {
            OrderStatus::Completed => ContinuePaymentDecision::AlreadyCompleted,
            OrderStatus::Expired => ContinuePaymentDecision::Expired,
            OrderStatus::Pending if order.is_expired_at(Utc::now()) => {
                ContinuePaymentDecision::Expired
            }
            OrderStatus::Pending => ContinuePaymentDecision::Payable(PaymentRequest::for_order(&order)),
        })
    }

    /// Marks every lapsed pending order as expired; returns how many changed.
    ///
    /// Each order is moved with a compare-and-swap, so an order completed by a
    /// concurrent payment in the meantime is left alone.
    pub async fn expire_stale_orders(&self) -> AppResult<u64> {
        let conn = self.store.pool();
        let now = Utc::now();
        let stale = OrderStore::find_expired_pending(conn, now).await?;

        let mut expired = 0u64;
        for order in stale {
            if OrderStore::transition(conn, &order, OrderStatus::Expired, now).await? {
                log::info!("Order {} expired", order.id);
                expired += 1;
            } else {
                log::debug!("Order {} changed before it could be expired", order.id);
            }
        }
        Ok(expired)
    }
}
