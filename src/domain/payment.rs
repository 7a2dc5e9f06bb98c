use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    MercadoPago,
    Mobbex,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::MercadoPago => "mercadopago",
            GatewayKind::Mobbex => "mobbex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mercadopago" => Some(GatewayKind::MercadoPago),
            "mobbex" => Some(GatewayKind::Mobbex),
            _ => None,
        }
    }
}

/// Three-way payment outcome every gateway vocabulary collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Approved,
    Pending,
    Rejected,
}

/// Adapter-normalized view of one webhook delivery. Ephemeral: folded into
/// the booking's `payment_data` snapshot, never persisted on its own.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentEvent {
    pub booking_reference: String,
    pub gateway: GatewayKind,
    pub gateway_status: String,
    pub canonical_status: CanonicalStatus,
    pub gateway_payment_id: Option<String>,
    pub amount: Option<f64>,
    pub raw_payload: serde_json::Value,
}

/// Last gateway-reported state stored on the booking. Advisory input for
/// reconciliation; the booking status column stays authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub gateway: GatewayKind,
    pub gateway_payment_id: Option<String>,
    pub gateway_status: String,
    pub canonical_status: CanonicalStatus,
    pub amount: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentData {
    pub fn from_event(event: &PaymentEvent, now: DateTime<Utc>) -> Self {
        Self {
            gateway: event.gateway,
            gateway_payment_id: event.gateway_payment_id.clone(),
            gateway_status: event.gateway_status.clone(),
            canonical_status: event.canonical_status,
            amount: event.amount,
            updated_at: now,
        }
    }
}
