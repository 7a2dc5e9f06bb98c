use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cancellation window on a listing: cancelling with at most
/// `days_quantity` days left before the start date costs
/// `penalty_percentage` of the booking total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub days_quantity: i64,
    pub penalty_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub post_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub is_published: bool,
    pub nightly_price: f64,
    pub currency: String,
    pub cancellation_policies: Vec<CancellationPolicy>,
}
