use axum::routing::{get, post};
use axum::Router;
use booking_engine::config::AppConfig;
use booking_engine::gateways::mercadopago::MercadoPagoGateway;
use booking_engine::gateways::mobbex::MobbexGateway;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::repo::listings_repo::ListingsRepo;
use booking_engine::repo::notifications_repo::NotificationsRepo;
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::notifier::Notifier;
use booking_engine::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let bookings = BookingsRepo { pool: pool.clone() };
    let listings = ListingsRepo { pool: pool.clone() };
    let notifications = NotificationsRepo { pool: pool.clone() };

    let booking_service = BookingService {
        bookings: Arc::new(bookings),
        listings: Arc::new(listings),
        notifier: Notifier {
            store: Arc::new(notifications),
        },
        mercadopago: Arc::new(MercadoPagoGateway::new(cfg.mercadopago.clone())),
        mobbex: Arc::new(MobbexGateway::new(cfg.mobbex.clone())),
    };

    let state = AppState { booking_service };

    let app = Router::new()
        .route("/health", get(booking_engine::http::handlers::bookings::health))
        .route(
            "/bookings",
            post(booking_engine::http::handlers::bookings::create_booking),
        )
        .route(
            "/bookings/:booking_id",
            get(booking_engine::http::handlers::bookings::get_booking),
        )
        .route(
            "/bookings/:booking_id/accept",
            post(booking_engine::http::handlers::bookings::accept),
        )
        .route(
            "/bookings/:booking_id/decline",
            post(booking_engine::http::handlers::bookings::decline),
        )
        .route(
            "/bookings/:booking_id/checkout",
            post(booking_engine::http::handlers::bookings::create_checkout),
        )
        .route(
            "/bookings/:booking_id/cancel",
            post(booking_engine::http::handlers::bookings::cancel),
        )
        .route(
            "/bookings/:booking_id/complete",
            post(booking_engine::http::handlers::bookings::complete),
        )
        .route(
            "/webhooks/mercadopago",
            post(booking_engine::http::handlers::webhooks::mercadopago),
        )
        .route(
            "/webhooks/mobbex",
            post(booking_engine::http::handlers::webhooks::mobbex),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
