use crate::domain::payment::PaymentData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Requested,
    Accepted,
    Declined,
    PendingPayment,
    Paid,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Declined => "declined",
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Paid => "paid",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(BookingStatus::Requested),
            "accepted" => Some(BookingStatus::Accepted),
            "declined" => Some(BookingStatus::Declined),
            "pending_payment" => Some(BookingStatus::PendingPayment),
            "paid" => Some(BookingStatus::Paid),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Declined | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }

    /// Cancellation is only reachable from requested and the payment-bearing
    /// states. An accepted booking has to move into checkout (or be declined)
    /// before either party can cancel it.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            BookingStatus::Requested | BookingStatus::PendingPayment | BookingStatus::Paid
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Client,
    Owner,
}

impl CancelledBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelledBy::Client => "client",
            CancelledBy::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(CancelledBy::Client),
            "owner" => Some(CancelledBy::Owner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: Uuid,
    pub post_id: Uuid,
    pub client_id: Uuid,
    pub owner_id: Uuid,
    pub status: BookingStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub guest_count: i32,
    pub total_amount: f64,
    pub currency: String,
    pub penalty_amount: Option<f64>,
    pub cancelled_by: Option<CancelledBy>,
    pub payment_data: Option<PaymentData>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
