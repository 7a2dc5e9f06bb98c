use crate::domain::notification::Notification;
use crate::stores::NotificationStore;
use anyhow::Result;
use sqlx::PgPool;

#[derive(Clone)]
pub struct NotificationsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl NotificationStore for NotificationsRepo {
    async fn create(&self, notification: &Notification) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (
                notification_id, user_id, notification_type, title, message, data,
                dedup_key, is_read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (dedup_key) DO NOTHING
            "#,
        )
        .bind(notification.notification_id)
        .bind(notification.user_id)
        .bind(notification.notification_type.as_str())
        .bind(notification.title.clone())
        .bind(notification.message.clone())
        .bind(notification.data.clone())
        .bind(notification.dedup_key.clone())
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
