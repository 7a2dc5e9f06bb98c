use crate::domain::booking::Booking;
use crate::domain::payment::GatewayKind;
use crate::error::CoreError;

pub mod mercadopago;
pub mod mobbex;
pub mod mock;

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub external_id: String,
    pub checkout_url: String,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Fetches the authoritative payment record when a webhook only carries
    /// an id. Bounded by the configured timeout; a timeout surfaces as
    /// `UpstreamTimeout`, never as a rejected payment.
    async fn fetch_payment_details(&self, payment_id: &str) -> Result<serde_json::Value, CoreError>;

    async fn create_checkout(
        &self,
        booking: &Booking,
        listing_title: &str,
    ) -> Result<CheckoutSession, CoreError>;
}
