use crate::domain::booking::CancelledBy;
use crate::domain::payment::GatewayKind;
use crate::error::CoreError;
use crate::service::booking_service::CreateBookingInput;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub post_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub guest_count: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub gateway: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub external_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub cancelled_by: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub success: bool,
    pub penalty_amount: f64,
}

/// Identity is delegated: the auth layer in front of this service installs
/// the caller's id in `X-User-Id`.
fn actor_id(headers: &HeaderMap) -> Result<Uuid, CoreError> {
    headers
        .get("x-user-id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(CoreError::Unauthorized)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let actor = actor_id(&headers)?;
    let booking = state
        .booking_service
        .create_booking(
            actor,
            CreateBookingInput {
                post_id: req.post_id,
                start_date: req.start_date,
                end_date: req.end_date,
                guest_count: req.guest_count,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let booking = state.booking_service.get_booking(booking_id).await?;
    Ok(Json(booking))
}

pub async fn accept(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let actor = actor_id(&headers)?;
    let booking = state.booking_service.accept(booking_id, actor).await?;
    Ok(Json(booking))
}

pub async fn decline(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let actor = actor_id(&headers)?;
    let booking = state.booking_service.decline(booking_id, actor).await?;
    Ok(Json(booking))
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let actor = actor_id(&headers)?;
    let gateway = GatewayKind::parse(&req.gateway).ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "gateway must be mercadopago or mobbex, got {:?}",
            req.gateway
        ))
    })?;
    let session = state
        .booking_service
        .create_checkout(booking_id, actor, gateway)
        .await?;
    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        external_id: session.external_id,
    }))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CancelRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let actor = actor_id(&headers)?;
    let cancelled_by = CancelledBy::parse(&req.cancelled_by).ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "cancelledBy must be client or owner, got {:?}",
            req.cancelled_by
        ))
    })?;
    let outcome = state
        .booking_service
        .request_cancel(booking_id, cancelled_by, actor)
        .await?;
    Ok(Json(CancelResponse {
        success: true,
        penalty_amount: outcome.penalty_amount,
    }))
}

pub async fn complete(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let actor = actor_id(&headers)?;
    let booking = state.booking_service.complete(booking_id, Some(actor)).await?;
    Ok(Json(booking))
}
