use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::time::Duration;

use olp_orders::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::{OrderService, PaymentService},
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    let order_service = OrderService::new(pool.clone(), &config.orders);
    let payment_service = PaymentService::new(pool.clone(), &config.payment);

    tasks::spawn_all(
        order_service.clone(),
        Duration::from_secs(config.orders.sweep_interval_secs),
    );

    log::info!(
        "Starting HTTP server at {}:{} (order window {} min, payment method {})",
        config.server.host,
        config.server.port,
        config.orders.expiry_minutes,
        config.payment.method
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(web::scope("/api/v1").configure(handlers::order_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
