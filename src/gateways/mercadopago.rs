use crate::config::MercadoPagoConfig;
use crate::domain::booking::Booking;
use crate::domain::payment::{CanonicalStatus, GatewayKind, PaymentEvent};
use crate::error::CoreError;
use crate::gateways::{CheckoutSession, PaymentGateway};
use serde_json::json;

pub struct MercadoPagoGateway {
    pub cfg: MercadoPagoConfig,
    pub client: reqwest::Client,
}

impl MercadoPagoGateway {
    pub fn new(cfg: MercadoPagoConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MercadoPagoGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::MercadoPago
    }

    async fn fetch_payment_details(&self, payment_id: &str) -> Result<serde_json::Value, CoreError> {
        let url = format!("{}/v1/payments/{}", self.cfg.base_url, payment_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.cfg.access_token)
            .timeout(std::time::Duration::from_millis(self.cfg.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::UpstreamTimeout(format!("mercadopago payment {}", payment_id))
                } else {
                    CoreError::Gateway(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(CoreError::Gateway(format!(
                "mercadopago payment lookup returned {}",
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
        let url = format!("{}/checkout/preferences", self.cfg.base_url);
        let body = json!({
            "items": [{
                "title": listing_title,
                "quantity": 1,
                "unit_price": booking.total_amount,
                "currency_id": booking.currency,
            }],
            "external_reference": booking.booking_id.to_string(),
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.cfg.access_token)
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.cfg.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::UpstreamTimeout("mercadopago preference".to_string())
                } else {
                    CoreError::Gateway(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(CoreError::Gateway(format!(
                "mercadopago preference returned {}",
                resp.status()
            )));
        }

        let v: serde_json::Value = resp.json().await.map_err(|e| CoreError::Gateway(e.to_string()))?;
        let external_id = v
            .get("id")
            .map(value_to_string)
            .ok_or_else(|| CoreError::Gateway("preference response missing id".to_string()))?;
        let checkout_url = v
            .get("init_point")
            .and_then(|u| u.as_str())
            .ok_or_else(|| CoreError::Gateway("preference response missing init_point".to_string()))?
            .to_string();

        Ok(CheckoutSession {
            external_id,
            checkout_url,
        })
    }
}

/// Payment id carried by the webhook envelope (`{"type": "payment",
/// "data": {"id": ...}}`, or the legacy `topic`/`id` form). `None` means the
/// delivery has nothing to reconcile.
pub fn payment_id_from_envelope(body: &serde_json::Value) -> Option<String> {
    let kind = body
        .get("type")
        .or_else(|| body.get("topic"))
        .and_then(|t| t.as_str())
        .unwrap_or_default();
    if !kind.contains("payment") {
        return None;
    }

    body.get("data")
        .and_then(|d| d.get("id"))
        .or_else(|| body.get("id"))
        .map(value_to_string)
}

/// Normalizes a fetched MercadoPago payment record. Only the booking
/// reference is load-bearing; everything else degrades gracefully.
pub fn normalize(payload: &serde_json::Value) -> Result<PaymentEvent, CoreError> {
    let booking_reference = payload
        .get("external_reference")
        .and_then(|r| r.as_str())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CoreError::MalformedPayload("missing external_reference".to_string()))?
        .to_string();

    let gateway_status = payload
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();

    Ok(PaymentEvent {
        booking_reference,
        gateway: GatewayKind::MercadoPago,
        canonical_status: map_status(&gateway_status),
        gateway_status,
        gateway_payment_id: payload.get("id").map(value_to_string),
        amount: payload.get("transaction_amount").and_then(|a| a.as_f64()),
        raw_payload: payload.clone(),
    })
}

/// Unknown vocabulary lands on `pending`, never on `approved`.
fn map_status(status: &str) -> CanonicalStatus {
    match status {
        "approved" => CanonicalStatus::Approved,
        "rejected" | "cancelled" | "refunded" | "charged_back" => CanonicalStatus::Rejected,
        "pending" | "in_process" | "in_mediation" | "authorized" => CanonicalStatus::Pending,
        _ => CanonicalStatus::Pending,
    }
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    }
}
