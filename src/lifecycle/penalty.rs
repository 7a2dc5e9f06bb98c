use crate::domain::listing::CancellationPolicy;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyOutcome {
    pub penalty_amount: f64,
    pub days_before_booking: i64,
    pub applicable_policy: Option<CancellationPolicy>,
}

/// Penalty owed for cancelling a booking `now`, given the listing's policy
/// windows. Among the windows that still contain the cancellation
/// (`days_quantity >= days_before_booking`) the tightest one applies;
/// cancelling outside every window is free.
pub fn compute_penalty(
    policies: &[CancellationPolicy],
    total_amount: f64,
    start_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> PenaltyOutcome {
    let days_before_booking = days_before(start_date, now);

    let applicable = policies
        .iter()
        .filter(|p| p.days_quantity >= days_before_booking)
        .fold(None::<&CancellationPolicy>, |best, p| match best {
            Some(b) if b.days_quantity <= p.days_quantity => Some(b),
            _ => Some(p),
        });

    let penalty_amount = match applicable {
        Some(policy) => round2(total_amount * policy.penalty_percentage / 100.0),
        None => 0.0,
    };

    PenaltyOutcome {
        penalty_amount,
        days_before_booking,
        applicable_policy: applicable.cloned(),
    }
}

/// Whole days remaining before the start date, rounded up, floored at zero
/// once the start has passed.
fn days_before(start_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (start_date - now).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + 86_399) / 86_400
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
