use crate::domain::booking::{Booking, CancelledBy};
use crate::domain::notification::{Notification, NotificationType};
use crate::stores::NotificationStore;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;

const DELIVERY_ATTEMPTS: u64 = 3;

/// Delivers notification records to the store, at-least-once. The store
/// suppresses duplicates by dedup key, so webhook redelivery cannot spam.
/// A delivery that keeps failing is logged and dropped; the status write it
/// follows is the durable fact and never rolls back.
#[derive(Clone)]
pub struct Notifier {
    pub store: Arc<dyn NotificationStore>,
}

impl Notifier {
    pub async fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            self.deliver(notification).await;
        }
    }

    async fn deliver(&self, notification: Notification) {
        let mut attempt = 0;
        loop {
            match self.store.create(&notification).await {
                Ok(true) => {
                    tracing::info!(
                        user_id = %notification.user_id,
                        kind = notification.notification_type.as_str(),
                        "notification delivered"
                    );
                    return;
                }
                Ok(false) => {
                    tracing::debug!(
                        dedup_key = %notification.dedup_key,
                        "duplicate notification suppressed"
                    );
                    return;
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= DELIVERY_ATTEMPTS {
                        tracing::error!(
                            dedup_key = %notification.dedup_key,
                            "notification delivery failed after {} attempts: {}",
                            attempt,
                            err
                        );
                        return;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(100 * attempt)).await;
                }
            }
        }
    }
}

fn base_data(booking: &Booking) -> serde_json::Value {
    json!({
        "bookingId": booking.booking_id,
        "postId": booking.post_id,
    })
}

pub fn booking_requested(booking: &Booking, now: DateTime<Utc>) -> Vec<Notification> {
    vec![Notification::new(
        booking.owner_id,
        NotificationType::BookingRequested,
        "New booking request".to_string(),
        format!(
            "You received a booking request for {} guest(s), {} to {}.",
            booking.guest_count,
            booking.start_date.date_naive(),
            booking.end_date.date_naive()
        ),
        base_data(booking),
        booking.booking_id,
        None,
        now,
    )]
}

pub fn booking_accepted(booking: &Booking, now: DateTime<Utc>) -> Vec<Notification> {
    vec![Notification::new(
        booking.client_id,
        NotificationType::BookingAccepted,
        "Booking accepted".to_string(),
        "Your booking request was accepted. You can now proceed to payment.".to_string(),
        base_data(booking),
        booking.booking_id,
        None,
        now,
    )]
}

pub fn booking_declined(booking: &Booking, now: DateTime<Utc>) -> Vec<Notification> {
    vec![Notification::new(
        booking.client_id,
        NotificationType::BookingDeclined,
        "Booking declined".to_string(),
        "The owner declined your booking request.".to_string(),
        base_data(booking),
        booking.booking_id,
        None,
        now,
    )]
}

pub fn checkout_created(booking: &Booking, checkout_url: &str, now: DateTime<Utc>) -> Vec<Notification> {
    let mut data = base_data(booking);
    data["checkoutUrl"] = json!(checkout_url);
    vec![Notification::new(
        booking.client_id,
        NotificationType::PaymentPending,
        "Complete your payment".to_string(),
        format!(
            "Your checkout is ready: {} {:.2} pending.",
            booking.currency, booking.total_amount
        ),
        data,
        booking.booking_id,
        None,
        now,
    )]
}

pub fn payment_completed(
    booking: &Booking,
    gateway_payment_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let mut data = base_data(booking);
    data["gatewayPaymentId"] = json!(gateway_payment_id);
    vec![Notification::new(
        booking.owner_id,
        NotificationType::PaymentCompleted,
        "Payment received".to_string(),
        format!(
            "Payment of {} {:.2} for a booking on your listing was approved.",
            booking.currency, booking.total_amount
        ),
        data,
        booking.booking_id,
        gateway_payment_id,
        now,
    )]
}

pub fn payment_failed(
    booking: &Booking,
    gateway_payment_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let mut data = base_data(booking);
    data["gatewayPaymentId"] = json!(gateway_payment_id);
    vec![Notification::new(
        booking.client_id,
        NotificationType::PaymentFailed,
        "Payment failed".to_string(),
        "Your payment was rejected. The booking is open again so you can retry.".to_string(),
        data,
        booking.booking_id,
        gateway_payment_id,
        now,
    )]
}

/// Cancellation notifies both parties: a confirmation (with the penalty, if
/// any) for whoever cancelled and an informational message for the other.
pub fn booking_cancelled(
    booking: &Booking,
    cancelled_by: CancelledBy,
    penalty_amount: f64,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let (canceller, other) = match cancelled_by {
        CancelledBy::Client => (booking.client_id, booking.owner_id),
        CancelledBy::Owner => (booking.owner_id, booking.client_id),
    };

    let mut data = base_data(booking);
    data["penaltyAmount"] = json!(penalty_amount);
    data["cancelledBy"] = json!(cancelled_by.as_str());

    let confirmation = if penalty_amount > 0.0 {
        format!(
            "Your booking was cancelled. A cancellation penalty of {} {:.2} applies.",
            booking.currency, penalty_amount
        )
    } else {
        "Your booking was cancelled. No penalty applies.".to_string()
    };

    vec![
        Notification::new(
            canceller,
            NotificationType::BookingCancelled,
            "Booking cancelled".to_string(),
            confirmation,
            data.clone(),
            booking.booking_id,
            None,
            now,
        ),
        Notification::new(
            other,
            NotificationType::BookingCancelled,
            "Booking cancelled".to_string(),
            format!("The {} cancelled this booking.", cancelled_by.as_str()),
            data,
            booking.booking_id,
            None,
            now,
        ),
    ]
}

pub fn booking_completed(booking: &Booking, now: DateTime<Utc>) -> Vec<Notification> {
    vec![Notification::new(
        booking.client_id,
        NotificationType::BookingCompleted,
        "Stay completed".to_string(),
        "Your booking is complete. Thanks for travelling with us!".to_string(),
        base_data(booking),
        booking.booking_id,
        None,
        now,
    )]
}
