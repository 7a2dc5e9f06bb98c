use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingRequested,
    BookingAccepted,
    BookingDeclined,
    PaymentPending,
    PaymentCompleted,
    PaymentFailed,
    BookingCancelled,
    BookingCompleted,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::BookingRequested => "booking_requested",
            NotificationType::BookingAccepted => "booking_accepted",
            NotificationType::BookingDeclined => "booking_declined",
            NotificationType::PaymentPending => "payment_pending",
            NotificationType::PaymentCompleted => "payment_completed",
            NotificationType::PaymentFailed => "payment_failed",
            NotificationType::BookingCancelled => "booking_cancelled",
            NotificationType::BookingCompleted => "booking_completed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    /// Collision key for webhook redelivery: a second insert with the same
    /// key is silently dropped by the store.
    pub dedup_key: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        title: String,
        message: String,
        data: serde_json::Value,
        booking_id: Uuid,
        gateway_payment_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let dedup_key = format!(
            "{}:{}:{}:{}",
            booking_id,
            notification_type.as_str(),
            user_id,
            gateway_payment_id.unwrap_or("-"),
        );
        Self {
            notification_id: Uuid::new_v4(),
            user_id,
            notification_type,
            title,
            message,
            data,
            dedup_key,
            is_read: false,
            created_at: now,
        }
    }
}
