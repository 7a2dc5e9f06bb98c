use crate::error::CoreError;
use crate::service::booking_service::ApplyOutcome;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn mercadopago(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let result = state.booking_service.process_mercadopago_webhook(&body).await;
    respond("mercadopago", result)
}

pub async fn mobbex(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let result = state.booking_service.process_mobbex_webhook(&body).await;
    respond("mobbex", result)
}

/// Gateways retry on non-2xx, so only failures worth redelivering get one:
/// an upstream timeout or a store/gateway fault. Deliveries we cannot tie to
/// a booking are acknowledged with 200 and logged, which keeps genuinely bad
/// payloads from turning into retry storms.
fn respond(gateway: &str, result: Result<ApplyOutcome, CoreError>) -> Response {
    match result {
        Ok(outcome) => {
            tracing::info!(gateway, outcome = outcome.as_str(), "webhook processed");
            (StatusCode::OK, Json(json!({ "status": outcome.as_str() }))).into_response()
        }
        Err(CoreError::MalformedPayload(msg)) => {
            tracing::warn!(gateway, "webhook ignored: {}", msg);
            (StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response()
        }
        Err(CoreError::NotFound(msg)) => {
            tracing::warn!(gateway, "webhook for unknown booking ignored: {}", msg);
            (StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response()
        }
        Err(err) => {
            tracing::warn!(gateway, "webhook processing failed: {}", err);
            err.into_response()
        }
    }
}
