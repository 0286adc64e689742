use crate::models::{ApiResponse, PaymentCallbackRequest, PaymentCallbackResponse};
use crate::services::PaymentService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use log::{info, warn};

/// Payment gateway callback.
///
/// The gateway's signature has been checked before the request reaches this
/// service. A declined payment is answered with 200 and `accepted: false`;
/// only infrastructure faults produce an error status, so the gateway retries
/// exactly those.
#[utoipa::path(
    post,
    path = "/webhook/payment",
    tag = "webhook",
    request_body = PaymentCallbackRequest,
    responses(
        (status = 200, description = "Callback handled", body = PaymentCallbackResponse),
        (status = 500, description = "Storage fault; safe to retry")
    )
)]
pub async fn payment_callback(
    payment_service: web::Data<PaymentService>,
    request: web::Json<PaymentCallbackRequest>,
) -> Result<HttpResponse> {
    let callback = request.into_inner();
    let gateway_id = callback.gateway_transaction_id.as_deref();

    info!(
        "Payment callback for order {} (gateway id {:?}, success {})",
        callback.order_id, gateway_id, callback.success
    );

    let outcome = if callback.success {
        payment_service
            .process_payment(callback.order_id, gateway_id)
            .await
    } else {
        payment_service
            .record_failed_payment(callback.order_id, gateway_id)
            .await
            .map(|_| false)
    };

    match outcome {
        Ok(accepted) => {
            if !accepted {
                warn!("Payment for order {} was not accepted", callback.order_id);
            }
            Ok(HttpResponse::Ok().json(ApiResponse::success(PaymentCallbackResponse { accepted })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/payment", web::post().to(payment_callback)));
}
