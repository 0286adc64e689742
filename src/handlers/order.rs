use crate::error::AppError;
use crate::models::*;
use crate::services::OrderService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

fn get_user_id_from_request(req: &HttpRequest) -> Result<Uuid, AppError> {
    req.extensions()
        .get::<Uuid>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pending order created", body = OrderSummary),
        (status = 400, description = "Invalid target, or the order was rejected (item missing or already owned)"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    request: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let target = match request.target() {
        Ok(target) => target,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.create_order(user_id, target).await {
        Ok(Some(summary)) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(summary, "Order created")))
        }
        Ok(None) => Ok(HttpResponse::BadRequest().json(ApiResponse::rejected(
            "ORDER_REJECTED",
            "The item does not exist or is already owned",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "order",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Order history, newest first", body = [UserOrderResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match order_service.get_user_orders(user_id).await {
        Ok(orders) => Ok(HttpResponse::Ok().json(ApiResponse::success(orders))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "order",
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Order found", body = OrderSummary),
        (status = 404, description = "No such order for this user"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let order_id = path.into_inner();

    match order_service.get_order_for_user(user_id, order_id).await {
        Ok(Some(summary)) => Ok(HttpResponse::Ok().json(ApiResponse::success(summary))),
        Ok(None) => Ok(AppError::NotFound(format!("Order {order_id} not found")).error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/continue-payment",
    tag = "order",
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment may resume", body = PaymentRequest),
        (status = 400, description = "Order expired or already completed"),
        (status = 404, description = "No such order for this user"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn continue_payment(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let order_id = path.into_inner();

    match order_service.continue_payment(user_id, order_id).await {
        Ok(ContinuePaymentDecision::Payable(payment)) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(payment)))
        }
        Ok(ContinuePaymentDecision::NotFound) => {
            Ok(AppError::NotFound(format!("Order {order_id} not found")).error_response())
        }
        Ok(ContinuePaymentDecision::Expired) => Ok(HttpResponse::BadRequest().json(
            ApiResponse::rejected("ORDER_EXPIRED", "The order has expired; place a new one"),
        )),
        Ok(ContinuePaymentDecision::AlreadyCompleted) => Ok(HttpResponse::BadRequest().json(
            ApiResponse::rejected("ORDER_COMPLETED", "The order has already been paid"),
        )),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(get_orders))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}/continue-payment", web::post().to(continue_payment)),
    );
}
