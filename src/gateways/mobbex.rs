use crate::config::MobbexConfig;
use crate::domain::booking::Booking;
use crate::domain::payment::{CanonicalStatus, GatewayKind, PaymentEvent};
use crate::error::CoreError;
use crate::gateways::{CheckoutSession, PaymentGateway};
use serde_json::json;

pub const REFERENCE_PREFIX: &str = "booking_";

pub struct MobbexGateway {
    pub cfg: MobbexConfig,
    pub client: reqwest::Client,
}

impl MobbexGateway {
    pub fn new(cfg: MobbexConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MobbexGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Mobbex
    }

    async fn fetch_payment_details(&self, payment_id: &str) -> Result<serde_json::Value, CoreError> {
        let url = format!("{}/p/operations/{}", self.cfg.base_url, payment_id);
        let resp = self
            .client
            .get(url)
            .header("x-api-key", &self.cfg.api_key)
            .header("x-access-token", &self.cfg.access_token)
            .timeout(std::time::Duration::from_millis(self.cfg.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::UpstreamTimeout(format!("mobbex operation {}", payment_id))
                } else {
                    CoreError::Gateway(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(CoreError::Gateway(format!(
                "mobbex operation lookup returned {}",
                resp.status()
            )));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| CoreError::Gateway(e.to_string()))
    }

    async fn create_checkout(
        &self,
        booking: &Booking,
        listing_title: &str,
    ) -> Result<CheckoutSession, CoreError> {
        let url = format!("{}/p/checkout", self.cfg.base_url);
        let body = json!({
            "total": booking.total_amount,
            "currency": booking.currency,
            "description": listing_title,
            "reference": format!("{}{}", REFERENCE_PREFIX, booking.booking_id),
            "test": false,
        });

        let resp = self
            .client
            .post(url)
            .header("x-api-key", &self.cfg.api_key)
            .header("x-access-token", &self.cfg.access_token)
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.cfg.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::UpstreamTimeout("mobbex checkout".to_string())
                } else {
                    CoreError::Gateway(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(CoreError::Gateway(format!(
                "mobbex checkout returned {}",
                resp.status()
            )));
        }

        let v: serde_json::Value = resp.json().await.map_err(|e| CoreError::Gateway(e.to_string()))?;
        let external_id = v
            .pointer("/data/id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| CoreError::Gateway("checkout response missing id".to_string()))?
            .to_string();
        let checkout_url = v
            .pointer("/data/url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| CoreError::Gateway("checkout response missing url".to_string()))?
            .to_string();

        Ok(CheckoutSession {
            external_id,
            checkout_url,
        })
    }
}

/// Normalizes a Mobbex webhook body. The payment lives under
/// `data.payment`; the booking reference is the checkout reference with the
/// `booking_` prefix stripped.
pub fn normalize(payload: &serde_json::Value) -> Result<PaymentEvent, CoreError> {
    let reference = payload
        .pointer("/data/payment/reference")
        .and_then(|r| r.as_str())
        .or_else(|| {
            payload
                .pointer("/data/checkout/reference")
                .and_then(|r| r.as_str())
        })
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CoreError::MalformedPayload("missing payment reference".to_string()))?;

    let booking_reference = reference
        .strip_prefix(REFERENCE_PREFIX)
        .unwrap_or(reference)
        .to_string();

    let gateway_status = payload
        .pointer("/data/payment/status/code")
        .map(|c| match c.as_str() {
            Some(s) => s.to_string(),
            None => c.to_string(),
        })
        .unwrap_or_default();

    Ok(PaymentEvent {
        booking_reference,
        gateway: GatewayKind::Mobbex,
        canonical_status: map_status(&gateway_status),
        gateway_status,
        gateway_payment_id: payload
            .pointer("/data/payment/id")
            .and_then(|id| id.as_str())
            .map(str::to_string),
        amount: payload.pointer("/data/payment/total").and_then(|t| t.as_f64()),
        raw_payload: payload.clone(),
    })
}

/// Mobbex reports numeric status codes. Unknown codes land on `pending`,
/// never on `approved`.
fn map_status(code: &str) -> CanonicalStatus {
    match code {
        "200" => CanonicalStatus::Approved,
        "400" | "401" | "402" | "500" | "601" | "602" | "603" => CanonicalStatus::Rejected,
        "0" | "1" | "2" | "3" | "100" => CanonicalStatus::Pending,
        _ => CanonicalStatus::Pending,
    }
}
