pub mod catalog_service;
pub mod order_service;
pub mod order_store;
pub mod payment_service;

pub use catalog_service::*;
pub use order_service::*;
pub use order_store::*;
pub use payment_service::*;
