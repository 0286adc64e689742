pub mod order;
pub mod webhook;

pub use order::order_config;
pub use webhook::webhook_config;
