use booking_engine::domain::booking::BookingStatus;
use booking_engine::domain::payment::CanonicalStatus;
use booking_engine::error::CoreError;
use booking_engine::lifecycle::transitions::{target_for, validate};

const ALL: [BookingStatus; 7] = [
    BookingStatus::Requested,
    BookingStatus::Accepted,
    BookingStatus::Declined,
    BookingStatus::PendingPayment,
    BookingStatus::Paid,
    BookingStatus::Cancelled,
    BookingStatus::Completed,
];

#[test]
fn every_tabled_transition_is_legal() {
    assert!(validate(BookingStatus::Requested, BookingStatus::Accepted).is_ok());
    assert!(validate(BookingStatus::Requested, BookingStatus::Declined).is_ok());
    assert!(validate(BookingStatus::Accepted, BookingStatus::PendingPayment).is_ok());
    assert!(validate(BookingStatus::PendingPayment, BookingStatus::Paid).is_ok());
    assert!(validate(BookingStatus::PendingPayment, BookingStatus::Requested).is_ok());
    assert!(validate(BookingStatus::Paid, BookingStatus::Completed).is_ok());
}

#[test]
fn cancellation_is_legal_exactly_from_requested_pending_payment_and_paid() {
    for from in ALL {
        let result = validate(from, BookingStatus::Cancelled);
        let expected_legal = matches!(
            from,
            BookingStatus::Requested | BookingStatus::PendingPayment | BookingStatus::Paid
        );
        assert_eq!(result.is_ok(), expected_legal, "cancel from {}", from);
    }
}

#[test]
fn accepted_bookings_cannot_be_cancelled() {
    let err = validate(BookingStatus::Accepted, BookingStatus::Cancelled).unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[test]
fn terminal_states_admit_no_transition() {
    for from in [
        BookingStatus::Declined,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ] {
        assert!(from.is_terminal());
        for to in ALL {
            assert!(validate(from, to).is_err(), "{} -> {}", from, to);
        }
    }
}

#[test]
fn payment_cannot_skip_checkout() {
    assert!(validate(BookingStatus::Requested, BookingStatus::Paid).is_err());
    assert!(validate(BookingStatus::Accepted, BookingStatus::Paid).is_err());
}

#[test]
fn paid_cannot_reopen() {
    assert!(validate(BookingStatus::Paid, BookingStatus::Requested).is_err());
    assert!(validate(BookingStatus::Paid, BookingStatus::PendingPayment).is_err());
}

#[test]
fn canonical_statuses_map_to_their_targets() {
    assert_eq!(target_for(CanonicalStatus::Approved), BookingStatus::Paid);
    assert_eq!(target_for(CanonicalStatus::Pending), BookingStatus::PendingPayment);
    // rejection reopens, it never cancels
    assert_eq!(target_for(CanonicalStatus::Rejected), BookingStatus::Requested);
}
