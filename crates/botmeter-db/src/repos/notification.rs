//! Notification repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbNotification, DbResult};

pub struct NotificationRepo {
    pool: PgPool,
}

impl NotificationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        tenant_id: Option<Uuid>,
        notification_type: &str,
        title: &str,
        message: &str,
    ) -> DbResult<DbNotification> {
        let notification = sqlx::query_as::<_, DbNotification>(
            r#"
            INSERT INTO notifications (tenant_id, notification_type, title, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tenant_id, notification_type, title, message, is_read, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(notification_type)
        .bind(title)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn list_unread(&self, limit: i64) -> DbResult<Vec<DbNotification>> {
        let notifications = sqlx::query_as::<_, DbNotification>(
            r#"
            SELECT id, tenant_id, notification_type, title, message, is_read, created_at
            FROM notifications
            WHERE is_read = FALSE
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_read(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> DbResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE is_read = FALSE")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
