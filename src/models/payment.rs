use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Gateway callback, already verified upstream.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentCallbackRequest {
    pub order_id: Uuid,
    pub gateway_transaction_id: Option<String>,
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentCallbackResponse {
    /// `false` means declined, expired or lost a race; never a fault.
    pub accepted: bool,
}
