use crate::domain::booking::{Booking, BookingStatus, CancelledBy};
use crate::domain::listing::Listing;
use crate::domain::payment::{CanonicalStatus, GatewayKind, PaymentData, PaymentEvent};
use crate::error::CoreError;
use crate::gateways::{mercadopago, mobbex, CheckoutSession, PaymentGateway};
use crate::lifecycle::penalty::compute_penalty;
use crate::lifecycle::transitions;
use crate::service::notifier::{self, Notifier};
use crate::stores::{BookingPatch, BookingStore, ListingStore};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Lost-CAS retries before giving up on a transition. Each retry re-reads
/// and re-validates against the fresh status.
const CAS_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct BookingService {
    pub bookings: Arc<dyn BookingStore>,
    pub listings: Arc<dyn ListingStore>,
    pub notifier: Notifier,
    pub mercadopago: Arc<dyn PaymentGateway>,
    pub mobbex: Arc<dyn PaymentGateway>,
}

#[derive(Debug, Clone)]
pub struct CreateBookingInput {
    pub post_id: Uuid,
    pub start_date: chrono::DateTime<Utc>,
    pub end_date: chrono::DateTime<Utc>,
    pub guest_count: i32,
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub penalty_amount: f64,
    pub days_before_booking: i64,
}

/// What became of one reconciled payment event. Everything except `Applied`
/// leaves the booking untouched status-wise; webhook handlers answer 200 for
/// all of them.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Same status, new gateway snapshot: `payment_data` refreshed only.
    Refreshed,
    /// Same gateway payment id, same resulting status: full no-op.
    Duplicate,
    /// Booking already finalized; late delivery logged and dropped.
    IgnoredTerminal,
    /// The event asked for a transition the table forbids.
    RejectedTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied { .. } => "applied",
            ApplyOutcome::Refreshed => "refreshed",
            ApplyOutcome::Duplicate => "duplicate_ignored",
            ApplyOutcome::IgnoredTerminal => "terminal_ignored",
            ApplyOutcome::RejectedTransition { .. } => "transition_rejected",
        }
    }
}

impl BookingService {
    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, CoreError> {
        self.load(booking_id).await
    }

    pub async fn create_booking(
        &self,
        client_id: Uuid,
        input: CreateBookingInput,
    ) -> Result<Booking, CoreError> {
        if input.start_date >= input.end_date {
            return Err(CoreError::InvalidInput(
                "startDate must be before endDate".to_string(),
            ));
        }
        if input.guest_count < 1 {
            return Err(CoreError::InvalidInput(
                "guestCount must be at least 1".to_string(),
            ));
        }

        let listing = self.load_listing(input.post_id).await?;
        if !listing.is_published {
            return Err(CoreError::InvalidInput("listing is not published".to_string()));
        }
        if listing.owner_id == client_id {
            return Err(CoreError::InvalidInput(
                "a user may not book their own listing".to_string(),
            ));
        }

        let nights = (input.end_date - input.start_date).num_days().max(1);
        let now = Utc::now();
        let booking = Booking {
            booking_id: Uuid::new_v4(),
            post_id: listing.post_id,
            client_id,
            owner_id: listing.owner_id,
            status: BookingStatus::Requested,
            start_date: input.start_date,
            end_date: input.end_date,
            guest_count: input.guest_count,
            total_amount: listing.nightly_price * nights as f64,
            currency: listing.currency.clone(),
            penalty_amount: None,
            cancelled_by: None,
            payment_data: None,
            accepted_at: None,
            paid_at: None,
            cancelled_at: None,
            completed_at: None,
            created_at: now,
        };

        self.bookings.insert(&booking).await?;
        self.notifier
            .dispatch(notifier::booking_requested(&booking, now))
            .await;

        Ok(booking)
    }

    pub async fn accept(&self, booking_id: Uuid, actor: Uuid) -> Result<Booking, CoreError> {
        for _ in 0..CAS_ATTEMPTS {
            let booking = self.load(booking_id).await?;
            if booking.owner_id != actor {
                return Err(CoreError::Unauthorized);
            }
            transitions::validate(booking.status, BookingStatus::Accepted)?;

            let now = Utc::now();
            let patch = BookingPatch {
                accepted_at: Some(now),
                ..Default::default()
            };
            if self
                .bookings
                .transition(booking_id, booking.status, BookingStatus::Accepted, &patch)
                .await?
            {
                let mut updated = booking;
                updated.status = BookingStatus::Accepted;
                updated.accepted_at = Some(now);
                self.notifier
                    .dispatch(notifier::booking_accepted(&updated, now))
                    .await;
                return Ok(updated);
            }
        }
        Err(concurrent_update())
    }

    pub async fn decline(&self, booking_id: Uuid, actor: Uuid) -> Result<Booking, CoreError> {
        for _ in 0..CAS_ATTEMPTS {
            let booking = self.load(booking_id).await?;
            if booking.owner_id != actor {
                return Err(CoreError::Unauthorized);
            }
            transitions::validate(booking.status, BookingStatus::Declined)?;

            let now = Utc::now();
            if self
                .bookings
                .transition(
                    booking_id,
                    booking.status,
                    BookingStatus::Declined,
                    &BookingPatch::default(),
                )
                .await?
            {
                let mut updated = booking;
                updated.status = BookingStatus::Declined;
                self.notifier
                    .dispatch(notifier::booking_declined(&updated, now))
                    .await;
                return Ok(updated);
            }
        }
        Err(concurrent_update())
    }

    pub async fn create_checkout(
        &self,
        booking_id: Uuid,
        actor: Uuid,
        gateway: GatewayKind,
    ) -> Result<CheckoutSession, CoreError> {
        let booking = self.load(booking_id).await?;
        if booking.client_id != actor {
            return Err(CoreError::Unauthorized);
        }
        transitions::validate(booking.status, BookingStatus::PendingPayment)?;

        let listing = self.load_listing(booking.post_id).await?;
        let session = self
            .gateway_for(gateway)
            .create_checkout(&booking, &listing.title)
            .await?;

        for _ in 0..CAS_ATTEMPTS {
            let current = self.load(booking_id).await?;
            transitions::validate(current.status, BookingStatus::PendingPayment)?;
            if self
                .bookings
                .transition(
                    booking_id,
                    current.status,
                    BookingStatus::PendingPayment,
                    &BookingPatch::default(),
                )
                .await?
            {
                let now = Utc::now();
                let mut updated = current;
                updated.status = BookingStatus::PendingPayment;
                self.notifier
                    .dispatch(notifier::checkout_created(&updated, &session.checkout_url, now))
                    .await;
                return Ok(session);
            }
        }
        Err(concurrent_update())
    }

    /// Owner cancellations are always free; client cancellations run the
    /// listing's policy windows through the penalty calculator.
    pub async fn request_cancel(
        &self,
        booking_id: Uuid,
        cancelled_by: CancelledBy,
        actor: Uuid,
    ) -> Result<CancelOutcome, CoreError> {
        for _ in 0..CAS_ATTEMPTS {
            let booking = self.load(booking_id).await?;
            let expected_actor = match cancelled_by {
                CancelledBy::Client => booking.client_id,
                CancelledBy::Owner => booking.owner_id,
            };
            if actor != expected_actor {
                return Err(CoreError::Unauthorized);
            }
            transitions::validate(booking.status, BookingStatus::Cancelled)?;

            let now = Utc::now();
            let (penalty_amount, days_before_booking) = match cancelled_by {
                CancelledBy::Owner => (0.0, 0),
                CancelledBy::Client => {
                    let listing = self.load_listing(booking.post_id).await?;
                    let outcome = compute_penalty(
                        &listing.cancellation_policies,
                        booking.total_amount,
                        booking.start_date,
                        now,
                    );
                    (outcome.penalty_amount, outcome.days_before_booking)
                }
            };

            let patch = BookingPatch {
                penalty_amount: Some(penalty_amount),
                cancelled_by: Some(cancelled_by),
                cancelled_at: Some(now),
                ..Default::default()
            };
            if self
                .bookings
                .transition(booking_id, booking.status, BookingStatus::Cancelled, &patch)
                .await?
            {
                self.notifier
                    .dispatch(notifier::booking_cancelled(
                        &booking,
                        cancelled_by,
                        penalty_amount,
                        now,
                    ))
                    .await;
                return Ok(CancelOutcome {
                    penalty_amount,
                    days_before_booking,
                });
            }
        }
        Err(concurrent_update())
    }

    pub async fn complete(&self, booking_id: Uuid, actor: Option<Uuid>) -> Result<Booking, CoreError> {
        for _ in 0..CAS_ATTEMPTS {
            let booking = self.load(booking_id).await?;
            if let Some(actor) = actor {
                if booking.owner_id != actor {
                    return Err(CoreError::Unauthorized);
                }
            }
            transitions::validate(booking.status, BookingStatus::Completed)?;

            let now = Utc::now();
            let patch = BookingPatch {
                completed_at: Some(now),
                ..Default::default()
            };
            if self
                .bookings
                .transition(booking_id, booking.status, BookingStatus::Completed, &patch)
                .await?
            {
                let mut updated = booking;
                updated.status = BookingStatus::Completed;
                updated.completed_at = Some(now);
                self.notifier
                    .dispatch(notifier::booking_completed(&updated, now))
                    .await;
                return Ok(updated);
            }
        }
        Err(concurrent_update())
    }

    /// Webhook entry point for MercadoPago: the envelope only carries a
    /// payment id, so the authoritative record is fetched before
    /// normalization.
    pub async fn process_mercadopago_webhook(
        &self,
        body: &serde_json::Value,
    ) -> Result<ApplyOutcome, CoreError> {
        let payment_id = mercadopago::payment_id_from_envelope(body).ok_or_else(|| {
            CoreError::MalformedPayload("webhook carries no payment id".to_string())
        })?;
        let details = self.mercadopago.fetch_payment_details(&payment_id).await?;
        let event = mercadopago::normalize(&details)?;
        self.apply_payment_event(event).await
    }

    /// Webhook entry point for Mobbex: the body carries the full payment.
    pub async fn process_mobbex_webhook(
        &self,
        body: &serde_json::Value,
    ) -> Result<ApplyOutcome, CoreError> {
        let event = mobbex::normalize(body)?;
        self.apply_payment_event(event).await
    }

    /// Reconciles one normalized gateway event against the persisted status.
    /// Origin gateway is irrelevant here; every event goes through the same
    /// checks.
    pub async fn apply_payment_event(&self, event: PaymentEvent) -> Result<ApplyOutcome, CoreError> {
        let booking_id = Uuid::parse_str(&event.booking_reference).map_err(|_| {
            CoreError::MalformedPayload(format!(
                "booking reference {:?} is not a booking id",
                event.booking_reference
            ))
        })?;

        for _ in 0..CAS_ATTEMPTS {
            let booking = self.load(booking_id).await?;

            if booking.status.is_terminal() {
                tracing::info!(
                    booking_id = %booking_id,
                    status = booking.status.as_str(),
                    gateway_status = %event.gateway_status,
                    "payment event for finalized booking ignored"
                );
                return Ok(ApplyOutcome::IgnoredTerminal);
            }

            let target = transitions::target_for(event.canonical_status);
            let now = Utc::now();
            let same_payment = match (&event.gateway_payment_id, &booking.payment_data) {
                (Some(id), Some(data)) => data.gateway_payment_id.as_deref() == Some(id.as_str()),
                _ => false,
            };

            if booking.status == target {
                if same_payment {
                    return Ok(ApplyOutcome::Duplicate);
                }
                let patch = BookingPatch {
                    payment_data: Some(PaymentData::from_event(&event, now)),
                    ..Default::default()
                };
                if self
                    .bookings
                    .transition(booking_id, booking.status, booking.status, &patch)
                    .await?
                {
                    return Ok(ApplyOutcome::Refreshed);
                }
                continue;
            }

            if transitions::validate(booking.status, target).is_err() {
                tracing::warn!(
                    booking_id = %booking_id,
                    from = booking.status.as_str(),
                    to = target.as_str(),
                    "payment event asks for an illegal transition, dropped"
                );
                return Ok(ApplyOutcome::RejectedTransition {
                    from: booking.status,
                    to: target,
                });
            }

            let patch = BookingPatch {
                payment_data: Some(PaymentData::from_event(&event, now)),
                paid_at: (target == BookingStatus::Paid).then_some(now),
                ..Default::default()
            };
            if self
                .bookings
                .transition(booking_id, booking.status, target, &patch)
                .await?
            {
                let mut updated = booking;
                let from = updated.status;
                updated.status = target;

                match event.canonical_status {
                    CanonicalStatus::Approved => {
                        self.notifier
                            .dispatch(notifier::payment_completed(
                                &updated,
                                event.gateway_payment_id.as_deref(),
                                now,
                            ))
                            .await;
                    }
                    CanonicalStatus::Rejected => {
                        self.notifier
                            .dispatch(notifier::payment_failed(
                                &updated,
                                event.gateway_payment_id.as_deref(),
                                now,
                            ))
                            .await;
                    }
                    CanonicalStatus::Pending => {}
                }

                return Ok(ApplyOutcome::Applied { from, to: target });
            }
        }
        Err(concurrent_update())
    }

    fn gateway_for(&self, kind: GatewayKind) -> &Arc<dyn PaymentGateway> {
        match kind {
            GatewayKind::MercadoPago => &self.mercadopago,
            GatewayKind::Mobbex => &self.mobbex,
        }
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, CoreError> {
        self.bookings
            .get_by_id(booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", booking_id)))
    }

    async fn load_listing(&self, post_id: Uuid) -> Result<Listing, CoreError> {
        self.listings
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("listing {}", post_id)))
    }
}

fn concurrent_update() -> CoreError {
    CoreError::InvalidState("booking changed concurrently, retry".to_string())
}
