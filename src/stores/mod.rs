use crate::domain::booking::{Booking, BookingStatus, CancelledBy};
use crate::domain::listing::Listing;
use crate::domain::notification::Notification;
use crate::domain::payment::PaymentData;
use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Extra columns written together with a status change. Every timestamp is
/// applied with set-once semantics by the store.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub penalty_amount: Option<f64>,
    pub cancelled_by: Option<CancelledBy>,
    pub payment_data: Option<PaymentData>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>>;

    async fn insert(&self, booking: &Booking) -> Result<()>;

    /// Compare-and-swap status write: succeeds only while the persisted
    /// status still equals `expected`, so concurrent webhook delivery and
    /// user cancellation serialize per booking id. Returns false when the
    /// booking moved underneath the caller.
    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new_status: BookingStatus,
        patch: &BookingPatch,
    ) -> Result<bool>;

    /// Paid bookings whose stay has ended, for the completion sweep.
    async fn due_for_completion(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>>;
}

#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    async fn get_by_id(&self, post_id: Uuid) -> Result<Option<Listing>>;
}

#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    /// Durable once accepted. Returns false when the dedup key already
    /// exists, which is how webhook redelivery avoids duplicate spam.
    async fn create(&self, notification: &Notification) -> Result<bool>;
}
