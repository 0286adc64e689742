//! Background jobs. Call `spawn_all` once during startup.

use crate::services::OrderService;
use std::time::Duration;

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(order_service: OrderService, sweep_interval: Duration) {
    // pending orders past their window become expired
    tokio::spawn(async move {
        loop {
            match order_service.expire_stale_orders().await {
                Ok(n) if n > 0 => log::info!("Expired stale orders: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to expire stale orders: {e:?}"),
            }
            tokio::time::sleep(sweep_interval).await;
        }
    });
}
