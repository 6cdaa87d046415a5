//! Usage log repository
//!
//! Append-only: this repository exposes INSERT and read queries only.
//! Records are never updated or deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbUsageLog};

pub struct UsageRepo {
    pool: PgPool,
}

impl UsageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one usage record.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        tenant_id: Uuid,
        direction: &str,
        content: &str,
        cost: Decimal,
        from_phone: Option<&str>,
        to_phone: Option<&str>,
        message_id: Option<&str>,
    ) -> DbResult<DbUsageLog> {
        let log = sqlx::query_as::<_, DbUsageLog>(
            r#"
            INSERT INTO usage_logs (tenant_id, direction, content, cost, from_phone, to_phone, message_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, tenant_id, direction, content, cost, from_phone, to_phone, message_id, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(direction)
        .bind(content)
        .bind(cost)
        .bind(from_phone)
        .bind(to_phone)
        .bind(message_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    pub async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbUsageLog>> {
        let logs = if let Some(since) = since {
            sqlx::query_as::<_, DbUsageLog>(
                r#"
                SELECT id, tenant_id, direction, content, cost, from_phone, to_phone, message_id, created_at
                FROM usage_logs
                WHERE tenant_id = $1 AND created_at >= $2
                ORDER BY created_at DESC
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(tenant_id)
            .bind(since)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, DbUsageLog>(
                r#"
                SELECT id, tenant_id, direction, content, cost, from_phone, to_phone, message_id, created_at
                FROM usage_logs
                WHERE tenant_id = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(tenant_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(logs)
    }

    pub async fn count_by_tenant(&self, tenant_id: Uuid) -> DbResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM usage_logs WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
