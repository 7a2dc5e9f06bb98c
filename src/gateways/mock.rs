use crate::domain::booking::Booking;
use crate::domain::payment::GatewayKind;
use crate::error::CoreError;
use crate::gateways::{CheckoutSession, PaymentGateway};
use serde_json::json;

/// Behavior-driven stand-in used in tests and local development.
pub struct MockGateway {
    pub kind: GatewayKind,
    pub behavior: String,
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    async fn fetch_payment_details(&self, payment_id: &str) -> Result<serde_json::Value, CoreError> {
        match self.behavior.as_str() {
            "ALWAYS_TIMEOUT" => Err(CoreError::UpstreamTimeout(format!("mock payment {}", payment_id))),
            behavior => Ok(json!({
                "id": payment_id,
                "status": match behavior {
                    "ALWAYS_REJECTED" => "rejected",
                    "ALWAYS_PENDING" => "pending",
                    _ => "approved",
                },
            })),
        }
    }

    async fn create_checkout(
        &self,
        booking: &Booking,
        _listing_title: &str,
    ) -> Result<CheckoutSession, CoreError> {
        if self.behavior == "ALWAYS_TIMEOUT" {
            return Err(CoreError::UpstreamTimeout("mock checkout".to_string()));
        }
        Ok(CheckoutSession {
            external_id: format!("mock_checkout_{}", booking.booking_id),
            checkout_url: format!("https://mock.gateway/checkout/{}", booking.booking_id),
        })
    }
}
