pub mod config;
pub mod domain {
    pub mod booking;
    pub mod listing;
    pub mod notification;
    pub mod payment;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod bookings;
        pub mod webhooks;
    }
}
pub mod lifecycle {
    pub mod penalty;
    pub mod transitions;
}
pub mod repo {
    pub mod bookings_repo;
    pub mod listings_repo;
    pub mod notifications_repo;
}
pub mod service {
    pub mod booking_service;
    pub mod notifier;
}
pub mod stores;

#[derive(Clone)]
pub struct AppState {
    pub booking_service: service::booking_service::BookingService,
}
