use booking_engine::domain::listing::CancellationPolicy;
use booking_engine::lifecycle::penalty::compute_penalty;
use chrono::{Duration, TimeZone, Utc};

fn policies() -> Vec<CancellationPolicy> {
    vec![
        CancellationPolicy {
            days_quantity: 7,
            penalty_percentage: 50.0,
        },
        CancellationPolicy {
            days_quantity: 3,
            penalty_percentage: 20.0,
        },
    ]
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[test]
fn five_days_out_hits_the_seven_day_window() {
    let now = now();
    let start = now + Duration::days(5);
    let out = compute_penalty(&policies(), 1000.0, start, now);
    assert_eq!(out.days_before_booking, 5);
    assert_eq!(out.penalty_amount, 500.0);
    assert_eq!(out.applicable_policy.as_ref().map(|p| p.days_quantity), Some(7));
}

#[test]
fn two_days_out_hits_the_three_day_window() {
    let now = now();
    let start = now + Duration::days(2);
    let out = compute_penalty(&policies(), 1000.0, start, now);
    assert_eq!(out.days_before_booking, 2);
    assert_eq!(out.penalty_amount, 200.0);
    assert_eq!(out.applicable_policy.as_ref().map(|p| p.days_quantity), Some(3));
}

#[test]
fn outside_every_window_is_free() {
    let now = now();
    let start = now + Duration::days(10);
    let out = compute_penalty(&policies(), 1000.0, start, now);
    assert_eq!(out.days_before_booking, 10);
    assert_eq!(out.penalty_amount, 0.0);
    assert!(out.applicable_policy.is_none());
}

#[test]
fn partial_days_round_up() {
    let now = now();
    let start = now + Duration::days(4) + Duration::hours(1);
    let out = compute_penalty(&policies(), 1000.0, start, now);
    assert_eq!(out.days_before_booking, 5);
    assert_eq!(out.penalty_amount, 500.0);
}

#[test]
fn past_start_date_floors_at_zero_days_and_hits_the_tightest_window() {
    let now = now();
    let start = now - Duration::days(1);
    let out = compute_penalty(&policies(), 1000.0, start, now);
    assert_eq!(out.days_before_booking, 0);
    assert_eq!(out.applicable_policy.as_ref().map(|p| p.days_quantity), Some(3));
    assert_eq!(out.penalty_amount, 200.0);
}

#[test]
fn no_policies_means_no_penalty() {
    let now = now();
    let out = compute_penalty(&[], 1000.0, now + Duration::days(2), now);
    assert_eq!(out.penalty_amount, 0.0);
    assert!(out.applicable_policy.is_none());
}

#[test]
fn penalty_rounds_to_two_decimals() {
    let now = now();
    let policies = vec![CancellationPolicy {
        days_quantity: 7,
        penalty_percentage: 33.0,
    }];
    let out = compute_penalty(&policies, 999.99, now + Duration::days(5), now);
    assert_eq!(out.penalty_amount, 330.0);
}

#[test]
fn result_is_deterministic_and_order_independent() {
    let now = now();
    let start = now + Duration::days(5);
    let forward = policies();
    let mut reversed = policies();
    reversed.reverse();

    let a = compute_penalty(&forward, 1000.0, start, now);
    let b = compute_penalty(&reversed, 1000.0, start, now);
    let c = compute_penalty(&forward, 1000.0, start, now);

    assert_eq!(a, b);
    assert_eq!(a, c);
}
