use anyhow::Result;
use booking_engine::config::AppConfig;
use booking_engine::gateways::mercadopago::MercadoPagoGateway;
use booking_engine::gateways::mobbex::MobbexGateway;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::repo::listings_repo::ListingsRepo;
use booking_engine::repo::notifications_repo::NotificationsRepo;
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::notifier::Notifier;
use booking_engine::stores::BookingStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Sweeps paid bookings whose stay has ended into `completed`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let bookings: Arc<dyn BookingStore> = Arc::new(BookingsRepo { pool: pool.clone() });
    let service = BookingService {
        bookings: bookings.clone(),
        listings: Arc::new(ListingsRepo { pool: pool.clone() }),
        notifier: Notifier {
            store: Arc::new(NotificationsRepo { pool }),
        },
        mercadopago: Arc::new(MercadoPagoGateway::new(cfg.mercadopago.clone())),
        mobbex: Arc::new(MobbexGateway::new(cfg.mobbex.clone())),
    };

    loop {
        let due = bookings.due_for_completion(chrono::Utc::now(), 100).await?;
        for booking in due {
            if let Err(err) = service.complete(booking.booking_id, None).await {
                tracing::warn!(
                    booking_id = %booking.booking_id,
                    "completion sweep skipped booking: {}",
                    err
                );
            }
        }

        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    }
}
