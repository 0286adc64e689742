use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{OrderStatus, TransactionStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::order::create_order,
        handlers::order::get_orders,
        handlers::order::get_order,
        handlers::order::continue_payment,
        handlers::webhook::payment_callback,
    ),
    components(
        schemas(
            CreateOrderRequest,
            OrderSummary,
            OrderStatus,
            OrderItemType,
            UserOrderResponse,
            PaymentRequest,
            PaymentCallbackRequest,
            PaymentCallbackResponse,
            TransactionStatus,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "order", description = "Course and learning path orders"),
        (name = "webhook", description = "Payment gateway callbacks"),
    ),
    info(
        title = "Learning Platform Orders API",
        version = "1.0.0",
        description = "Order placement, payment reconciliation and order history"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
