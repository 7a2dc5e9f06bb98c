use crate::domain::listing::{CancellationPolicy, Listing};
use crate::stores::ListingStore;
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct ListingsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl ListingStore for ListingsRepo {
    async fn get_by_id(&self, post_id: Uuid) -> Result<Option<Listing>> {
        let row = sqlx::query(
            r#"
            SELECT post_id, owner_id, title, is_published, nightly_price, currency, cancellation_policies
            FROM listings
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let policies: serde_json::Value = row.get("cancellation_policies");
            let cancellation_policies: Vec<CancellationPolicy> = serde_json::from_value(policies)?;

            Ok(Listing {
                post_id: row.get("post_id"),
                owner_id: row.get("owner_id"),
                title: row.get("title"),
                is_published: row.get("is_published"),
                nightly_price: row.get("nightly_price"),
                currency: row.get("currency"),
                cancellation_policies,
            })
        })
        .transpose()
    }
}
