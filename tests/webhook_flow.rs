use async_trait::async_trait;
use booking_engine::domain::booking::{Booking, BookingStatus, CancelledBy};
use booking_engine::domain::listing::{CancellationPolicy, Listing};
use booking_engine::domain::notification::{Notification, NotificationType};
use booking_engine::domain::payment::{CanonicalStatus, GatewayKind, PaymentEvent};
use booking_engine::error::CoreError;
use booking_engine::gateways::mock::MockGateway;
use booking_engine::service::booking_service::{ApplyOutcome, BookingService};
use booking_engine::service::notifier::Notifier;
use booking_engine::stores::{BookingPatch, BookingStore, ListingStore, NotificationStore};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

struct MemoryBookings {
    rows: Mutex<HashMap<Uuid, Booking>>,
}

impl MemoryBookings {
    fn with(booking: Booking) -> Arc<Self> {
        let mut rows = HashMap::new();
        rows.insert(booking.booking_id, booking);
        Arc::new(Self {
            rows: Mutex::new(rows),
        })
    }

    fn get(&self, booking_id: Uuid) -> Booking {
        self.rows.lock().unwrap().get(&booking_id).cloned().unwrap()
    }
}

#[async_trait]
impl BookingStore for MemoryBookings {
    async fn get_by_id(&self, booking_id: Uuid) -> anyhow::Result<Option<Booking>> {
        Ok(self.rows.lock().unwrap().get(&booking_id).cloned())
    }

    async fn insert(&self, booking: &Booking) -> anyhow::Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(booking.booking_id, booking.clone());
        Ok(())
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new_status: BookingStatus,
        patch: &BookingPatch,
    ) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&booking_id) else {
            return Ok(false);
        };
        if row.status != expected {
            return Ok(false);
        }

        row.status = new_status;
        if let Some(p) = patch.penalty_amount {
            row.penalty_amount = Some(p);
        }
        if let Some(c) = patch.cancelled_by {
            row.cancelled_by = Some(c);
        }
        if let Some(pd) = &patch.payment_data {
            row.payment_data = Some(pd.clone());
        }
        // timestamps stamp at most once, like the COALESCE writes in Postgres
        if row.accepted_at.is_none() {
            row.accepted_at = patch.accepted_at;
        }
        if row.paid_at.is_none() {
            row.paid_at = patch.paid_at;
        }
        if row.cancelled_at.is_none() {
            row.cancelled_at = patch.cancelled_at;
        }
        if row.completed_at.is_none() {
            row.completed_at = patch.completed_at;
        }
        Ok(true)
    }

    async fn due_for_completion(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> anyhow::Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.status == BookingStatus::Paid && b.end_date <= now)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

struct MemoryListings {
    rows: HashMap<Uuid, Listing>,
}

#[async_trait]
impl ListingStore for MemoryListings {
    async fn get_by_id(&self, post_id: Uuid) -> anyhow::Result<Option<Listing>> {
        Ok(self.rows.get(&post_id).cloned())
    }
}

struct MemoryNotifications {
    rows: Mutex<Vec<Notification>>,
    seen: Mutex<HashSet<String>>,
}

impl MemoryNotifications {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            seen: Mutex::new(HashSet::new()),
        })
    }

    fn all(&self) -> Vec<Notification> {
        self.rows.lock().unwrap().clone()
    }

    fn of_type(&self, kind: NotificationType) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.notification_type == kind)
            .collect()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotifications {
    async fn create(&self, notification: &Notification) -> anyhow::Result<bool> {
        if !self.seen.lock().unwrap().insert(notification.dedup_key.clone()) {
            return Ok(false);
        }
        self.rows.lock().unwrap().push(notification.clone());
        Ok(true)
    }
}

struct Fixture {
    service: BookingService,
    bookings: Arc<MemoryBookings>,
    notifications: Arc<MemoryNotifications>,
    booking_id: Uuid,
    client_id: Uuid,
    owner_id: Uuid,
}

fn fixture(status: BookingStatus, policies: Vec<CancellationPolicy>) -> Fixture {
    let client_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();
    let now = Utc::now();

    let booking = Booking {
        booking_id,
        post_id,
        client_id,
        owner_id,
        status,
        start_date: now + Duration::days(5),
        end_date: now + Duration::days(8),
        guest_count: 2,
        total_amount: 1000.0,
        currency: "ARS".to_string(),
        penalty_amount: None,
        cancelled_by: None,
        payment_data: None,
        accepted_at: None,
        paid_at: None,
        cancelled_at: None,
        completed_at: None,
        created_at: now,
    };

    let listing = Listing {
        post_id,
        owner_id,
        title: "Cabin by the lake".to_string(),
        is_published: true,
        nightly_price: 250.0,
        currency: "ARS".to_string(),
        cancellation_policies: policies,
    };

    let bookings = MemoryBookings::with(booking);
    let notifications = MemoryNotifications::new();
    let mut listings = HashMap::new();
    listings.insert(post_id, listing);

    let service = BookingService {
        bookings: bookings.clone(),
        listings: Arc::new(MemoryListings { rows: listings }),
        notifier: Notifier {
            store: notifications.clone(),
        },
        mercadopago: Arc::new(MockGateway {
            kind: GatewayKind::MercadoPago,
            behavior: "ALWAYS_APPROVED".to_string(),
        }),
        mobbex: Arc::new(MockGateway {
            kind: GatewayKind::Mobbex,
            behavior: "ALWAYS_APPROVED".to_string(),
        }),
    };

    Fixture {
        service,
        bookings,
        notifications,
        booking_id,
        client_id,
        owner_id,
    }
}

fn event(
    booking_id: Uuid,
    canonical: CanonicalStatus,
    payment_id: &str,
) -> PaymentEvent {
    let raw = match canonical {
        CanonicalStatus::Approved => "approved",
        CanonicalStatus::Pending => "pending",
        CanonicalStatus::Rejected => "rejected",
    };
    PaymentEvent {
        booking_reference: booking_id.to_string(),
        gateway: GatewayKind::MercadoPago,
        gateway_status: raw.to_string(),
        canonical_status: canonical,
        gateway_payment_id: Some(payment_id.to_string()),
        amount: Some(1000.0),
        raw_payload: json!({}),
    }
}

#[tokio::test]
async fn approved_event_marks_booking_paid_and_notifies_owner() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let outcome = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Approved, "p1"))
        .await
        .unwrap();

    assert!(matches!(outcome, ApplyOutcome::Applied { to: BookingStatus::Paid, .. }));
    let booking = fx.bookings.get(fx.booking_id);
    assert_eq!(booking.status, BookingStatus::Paid);
    assert!(booking.paid_at.is_some());
    assert_eq!(
        booking.payment_data.as_ref().and_then(|d| d.gateway_payment_id.clone()),
        Some("p1".to_string())
    );

    let paid = fx.notifications.of_type(NotificationType::PaymentCompleted);
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].user_id, fx.owner_id);
}

#[tokio::test]
async fn replayed_webhook_produces_one_write_and_one_notification() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let first = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Approved, "p1"))
        .await
        .unwrap();
    assert!(matches!(first, ApplyOutcome::Applied { .. }));

    let replay = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Approved, "p1"))
        .await
        .unwrap();
    assert_eq!(replay, ApplyOutcome::Duplicate);

    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Paid);
    assert_eq!(fx.notifications.all().len(), 1);
}

#[tokio::test]
async fn approved_event_on_completed_booking_is_ignored() {
    let fx = fixture(BookingStatus::Completed, vec![]);

    let outcome = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Approved, "p1"))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::IgnoredTerminal);
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Completed);
    assert!(fx.notifications.all().is_empty());
}

#[tokio::test]
async fn rejected_event_reopens_the_booking_for_retry() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let outcome = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Rejected, "p2"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ApplyOutcome::Applied { to: BookingStatus::Requested, .. }
    ));
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Requested);

    let failed = fx.notifications.of_type(NotificationType::PaymentFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].user_id, fx.client_id);
}

#[tokio::test]
async fn pending_event_on_requested_booking_is_rejected_not_applied() {
    let fx = fixture(BookingStatus::Requested, vec![]);

    let outcome = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Pending, "p3"))
        .await
        .unwrap();

    assert!(matches!(outcome, ApplyOutcome::RejectedTransition { .. }));
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Requested);
    assert!(fx.notifications.all().is_empty());
}

#[tokio::test]
async fn same_status_with_new_payment_id_refreshes_the_snapshot_silently() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let outcome = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Pending, "p4"))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Refreshed);
    let booking = fx.bookings.get(fx.booking_id);
    assert_eq!(booking.status, BookingStatus::PendingPayment);
    assert_eq!(
        booking.payment_data.as_ref().and_then(|d| d.gateway_payment_id.clone()),
        Some("p4".to_string())
    );
    assert!(fx.notifications.all().is_empty());
}

#[tokio::test]
async fn unknown_booking_reference_is_not_found() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let err = fx
        .service
        .apply_payment_event(event(Uuid::new_v4(), CanonicalStatus::Approved, "p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn non_uuid_reference_is_malformed() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let mut bad = event(fx.booking_id, CanonicalStatus::Approved, "p1");
    bad.booking_reference = "order-42".to_string();

    let err = fx.service.apply_payment_event(bad).await.unwrap_err();
    assert!(matches!(err, CoreError::MalformedPayload(_)));
}

#[tokio::test]
async fn client_cancel_applies_the_tightest_policy_window() {
    let policies = vec![
        CancellationPolicy {
            days_quantity: 7,
            penalty_percentage: 50.0,
        },
        CancellationPolicy {
            days_quantity: 3,
            penalty_percentage: 20.0,
        },
    ];
    // fixture start date is 5 days out, so the 7-day window applies
    let fx = fixture(BookingStatus::Paid, policies);

    let outcome = fx
        .service
        .request_cancel(fx.booking_id, CancelledBy::Client, fx.client_id)
        .await
        .unwrap();

    assert_eq!(outcome.penalty_amount, 500.0);
    let booking = fx.bookings.get(fx.booking_id);
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.penalty_amount, Some(500.0));
    assert_eq!(booking.cancelled_by, Some(CancelledBy::Client));
    assert!(booking.cancelled_at.is_some());

    let cancelled = fx.notifications.of_type(NotificationType::BookingCancelled);
    assert_eq!(cancelled.len(), 2);
    let recipients: HashSet<Uuid> = cancelled.iter().map(|n| n.user_id).collect();
    assert!(recipients.contains(&fx.client_id));
    assert!(recipients.contains(&fx.owner_id));
}

#[tokio::test]
async fn owner_cancel_is_always_free() {
    let policies = vec![CancellationPolicy {
        days_quantity: 7,
        penalty_percentage: 50.0,
    }];
    let fx = fixture(BookingStatus::Paid, policies);

    let outcome = fx
        .service
        .request_cancel(fx.booking_id, CancelledBy::Owner, fx.owner_id)
        .await
        .unwrap();

    assert_eq!(outcome.penalty_amount, 0.0);
    assert_eq!(fx.bookings.get(fx.booking_id).penalty_amount, Some(0.0));
}

#[tokio::test]
async fn cancel_from_accepted_is_an_invalid_transition() {
    let fx = fixture(BookingStatus::Accepted, vec![]);

    let err = fx
        .service
        .request_cancel(fx.booking_id, CancelledBy::Client, fx.client_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Accepted);
    assert!(fx.notifications.all().is_empty());
}

#[tokio::test]
async fn cancel_by_someone_else_is_unauthorized() {
    let fx = fixture(BookingStatus::Paid, vec![]);

    let err = fx
        .service
        .request_cancel(fx.booking_id, CancelledBy::Client, fx.owner_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));
}

#[tokio::test]
async fn accepted_booking_flows_through_checkout_payment_and_replay() {
    let fx = fixture(BookingStatus::Accepted, vec![]);

    // owner-side approval already happened; client opens checkout
    let session = fx
        .service
        .create_checkout(fx.booking_id, fx.client_id, GatewayKind::MercadoPago)
        .await
        .unwrap();
    assert!(!session.checkout_url.is_empty());
    assert_eq!(
        fx.bookings.get(fx.booking_id).status,
        BookingStatus::PendingPayment
    );

    let first = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Approved, "p1"))
        .await
        .unwrap();
    assert!(matches!(first, ApplyOutcome::Applied { .. }));
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Paid);
    assert_eq!(
        fx.notifications.of_type(NotificationType::PaymentCompleted).len(),
        1
    );

    let replay = fx
        .service
        .apply_payment_event(event(fx.booking_id, CanonicalStatus::Approved, "p1"))
        .await
        .unwrap();
    assert_eq!(replay, ApplyOutcome::Duplicate);
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Paid);
    assert_eq!(
        fx.notifications.of_type(NotificationType::PaymentCompleted).len(),
        1
    );
}

#[tokio::test]
async fn mobbex_webhook_body_drives_the_same_reconciliation() {
    let fx = fixture(BookingStatus::PendingPayment, vec![]);

    let body = json!({
        "type": "checkout",
        "data": {
            "payment": {
                "id": "op-1",
                "reference": format!("booking_{}", fx.booking_id),
                "total": 1000.0,
                "status": { "code": "200", "text": "approved" },
            }
        }
    });

    let outcome = fx.service.process_mobbex_webhook(&body).await.unwrap();
    assert!(matches!(outcome, ApplyOutcome::Applied { to: BookingStatus::Paid, .. }));
    assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Paid);
}

#[tokio::test]
async fn accept_then_decline_is_rejected() {
    let fx = fixture(BookingStatus::Requested, vec![]);

    fx.service.accept(fx.booking_id, fx.owner_id).await.unwrap();
    let booking = fx.bookings.get(fx.booking_id);
    assert_eq!(booking.status, BookingStatus::Accepted);
    assert!(booking.accepted_at.is_some());
    assert_eq!(
        fx.notifications.of_type(NotificationType::BookingAccepted).len(),
        1
    );

    let err = fx.service.decline(fx.booking_id, fx.owner_id).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn completion_sweep_completes_ended_paid_bookings() {
    let fx = fixture(BookingStatus::Paid, vec![]);

    // stay has not ended yet
    let due = fx
        .bookings
        .due_for_completion(Utc::now(), 10)
        .await
        .unwrap();
    assert!(due.is_empty());

    let due = fx
        .bookings
        .due_for_completion(Utc::now() + Duration::days(9), 10)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);

    let booking = fx
        .service
        .complete(due[0].booking_id, None)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Completed);
    assert!(booking.completed_at.is_some());
    assert_eq!(
        fx.notifications.of_type(NotificationType::BookingCompleted).len(),
        1
    );
}

#[tokio::test]
async fn request_cancel_succeeds_from_every_cancellable_status() {
    for status in [
        BookingStatus::Requested,
        BookingStatus::PendingPayment,
        BookingStatus::Paid,
    ] {
        let fx = fixture(status, vec![]);
        let outcome = fx
            .service
            .request_cancel(fx.booking_id, CancelledBy::Client, fx.client_id)
            .await
            .unwrap();
        assert_eq!(outcome.penalty_amount, 0.0, "from {}", status);
        assert_eq!(fx.bookings.get(fx.booking_id).status, BookingStatus::Cancelled);
    }

    for status in [
        BookingStatus::Accepted,
        BookingStatus::Declined,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ] {
        let fx = fixture(status, vec![]);
        let err = fx
            .service
            .request_cancel(fx.booking_id, CancelledBy::Client, fx.client_id)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidTransition { .. }),
            "from {}",
            status
        );
    }
}

#[tokio::test]
async fn create_booking_enforces_input_invariants() {
    let fx = fixture(BookingStatus::Requested, vec![]);
    let listing_post = fx.bookings.get(fx.booking_id).post_id;
    let now = Utc::now();

    // owners cannot book their own listing
    let err = fx
        .service
        .create_booking(
            fx.owner_id,
            booking_engine::service::booking_service::CreateBookingInput {
                post_id: listing_post,
                start_date: now + Duration::days(10),
                end_date: now + Duration::days(12),
                guest_count: 2,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));

    // inverted date range
    let err = fx
        .service
        .create_booking(
            fx.client_id,
            booking_engine::service::booking_service::CreateBookingInput {
                post_id: listing_post,
                start_date: now + Duration::days(12),
                end_date: now + Duration::days(10),
                guest_count: 2,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));

    // unknown listing
    let err = fx
        .service
        .create_booking(
            fx.client_id,
            booking_engine::service::booking_service::CreateBookingInput {
                post_id: Uuid::new_v4(),
                start_date: now + Duration::days(10),
                end_date: now + Duration::days(12),
                guest_count: 2,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn created_booking_starts_requested_and_notifies_the_owner() {
    let fx = fixture(BookingStatus::Requested, vec![]);
    let listing_post = fx.bookings.get(fx.booking_id).post_id;
    let now = Utc::now();

    let booking = fx
        .service
        .create_booking(
            fx.client_id,
            booking_engine::service::booking_service::CreateBookingInput {
                post_id: listing_post,
                start_date: now + Duration::days(10),
                end_date: now + Duration::days(12),
                guest_count: 3,
            },
        )
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Requested);
    assert_eq!(booking.total_amount, 500.0); // 2 nights at 250.0
    assert_eq!(booking.owner_id, fx.owner_id);

    let requested = fx.notifications.of_type(NotificationType::BookingRequested);
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].user_id, fx.owner_id);
}
