use crate::domain::booking::BookingStatus;
use crate::domain::payment::CanonicalStatus;
use crate::error::CoreError;

/// Validates one edge of the booking lifecycle.
///
/// requested -> accepted | declined | cancelled
/// accepted -> pending_payment
/// pending_payment -> paid | requested | cancelled
/// paid -> completed | cancelled
pub fn validate(from: BookingStatus, to: BookingStatus) -> Result<(), CoreError> {
    let legal = match (from, to) {
        (BookingStatus::Requested, BookingStatus::Accepted) => true,
        (BookingStatus::Requested, BookingStatus::Declined) => true,
        (BookingStatus::Accepted, BookingStatus::PendingPayment) => true,
        (BookingStatus::PendingPayment, BookingStatus::Paid) => true,
        // a rejected payment reopens the booking for another attempt
        (BookingStatus::PendingPayment, BookingStatus::Requested) => true,
        (BookingStatus::Paid, BookingStatus::Completed) => true,
        (from, BookingStatus::Cancelled) => from.is_cancellable(),
        _ => false,
    };

    if legal {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

/// Booking status a reconciled payment outcome drives toward. Rejection
/// reopens the booking; it never cancels it.
pub fn target_for(canonical: CanonicalStatus) -> BookingStatus {
    match canonical {
        CanonicalStatus::Approved => BookingStatus::Paid,
        CanonicalStatus::Pending => BookingStatus::PendingPayment,
        CanonicalStatus::Rejected => BookingStatus::Requested,
    }
}
