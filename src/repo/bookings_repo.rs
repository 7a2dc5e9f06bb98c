use crate::domain::booking::{Booking, BookingStatus, CancelledBy};
use crate::domain::payment::PaymentData;
use crate::stores::{BookingPatch, BookingStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct BookingsRepo {
    pub pool: PgPool,
}

const BOOKING_COLUMNS: &str = r#"
    booking_id, post_id, client_id, owner_id, status, start_date, end_date,
    guest_count, total_amount, currency, penalty_amount, cancelled_by,
    payment_data, accepted_at, paid_at, cancelled_at, completed_at, created_at
"#;

#[async_trait::async_trait]
impl BookingStore for BookingsRepo {
    async fn get_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE booking_id = $1", BOOKING_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(booking_from_row).transpose()
    }

    async fn insert(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                booking_id, post_id, client_id, owner_id, status, start_date, end_date,
                guest_count, total_amount, currency, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.booking_id)
        .bind(booking.post_id)
        .bind(booking.client_id)
        .bind(booking.owner_id)
        .bind(booking.status.as_str())
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.guest_count)
        .bind(booking.total_amount)
        .bind(booking.currency.clone())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new_status: BookingStatus,
        patch: &BookingPatch,
    ) -> Result<bool> {
        let payment_data = patch
            .payment_data
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = $3,
                penalty_amount = COALESCE($4, penalty_amount),
                cancelled_by = COALESCE($5, cancelled_by),
                payment_data = COALESCE($6, payment_data),
                accepted_at = COALESCE(accepted_at, $7),
                paid_at = COALESCE(paid_at, $8),
                cancelled_at = COALESCE(cancelled_at, $9),
                completed_at = COALESCE(completed_at, $10),
                updated_at = now()
            WHERE booking_id = $1 AND status = $2
            "#,
        )
        .bind(booking_id)
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(patch.penalty_amount)
        .bind(patch.cancelled_by.map(|c| c.as_str()))
        .bind(payment_data)
        .bind(patch.accepted_at)
        .bind(patch.paid_at)
        .bind(patch.cancelled_at)
        .bind(patch.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn due_for_completion(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE status = 'paid' AND end_date <= $1
            ORDER BY end_date ASC
            LIMIT $2
            "#,
            BOOKING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(booking_from_row).collect()
    }
}

fn booking_from_row(row: PgRow) -> Result<Booking> {
    let status: String = row.get("status");
    let status = BookingStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status in store: {}", status))?;

    let cancelled_by: Option<String> = row.get("cancelled_by");
    let cancelled_by = cancelled_by.as_deref().and_then(CancelledBy::parse);

    let payment_data: Option<serde_json::Value> = row.get("payment_data");
    let payment_data = payment_data
        .map(serde_json::from_value::<PaymentData>)
        .transpose()?;

    Ok(Booking {
        booking_id: row.get("booking_id"),
        post_id: row.get("post_id"),
        client_id: row.get("client_id"),
        owner_id: row.get("owner_id"),
        status,
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        guest_count: row.get("guest_count"),
        total_amount: row.get("total_amount"),
        currency: row.get("currency"),
        penalty_amount: row.get("penalty_amount"),
        cancelled_by,
        payment_data,
        accepted_at: row.get("accepted_at"),
        paid_at: row.get("paid_at"),
        cancelled_at: row.get("cancelled_at"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
    })
}
