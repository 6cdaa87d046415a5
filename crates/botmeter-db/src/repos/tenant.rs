//! Tenant repository: identity, routing keys, configuration, and the
//! wallet balance column.
//!
//! The balance is only ever mutated through [`TenantRepo::adjust_balance`]
//! and [`TenantRepo::charge_monthly_fee`], both single-statement atomic
//! increments at the store level. No read-modify-write path exists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbBillingProfile, DbError, DbResult, DbTenant, DbTenantCredentials};

const TENANT_COLUMNS: &str = "id, business_name, owner_phone, channel_id, provider_sid, \
     provider_token, system_prompt, ai_model, status, wallet_balance, monthly_fee, \
     next_billing_date, created_at, updated_at";

pub struct TenantRepo {
    pool: PgPool,
}

impl TenantRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new tenant. The unique index on `channel_id` enforces
    /// the routing-key invariant at the store level.
    pub async fn create(
        &self,
        business_name: &str,
        owner_phone: Option<&str>,
        channel_id: Option<&str>,
        monthly_fee: Decimal,
    ) -> DbResult<DbTenant> {
        let tenant = sqlx::query_as::<_, DbTenant>(&format!(
            r#"
            INSERT INTO tenants (business_name, owner_phone, channel_id, monthly_fee)
            VALUES ($1, $2, $3, $4)
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(business_name)
        .bind(owner_phone)
        .bind(channel_id)
        .bind(monthly_fee)
        .fetch_one(&self.pool)
        .await?;

        Ok(tenant)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Find by the primary routing key (provider phone number / page id).
    pub async fn find_by_channel(&self, channel_id: &str) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE channel_id = $1"
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Secondary association: resolve through the owner's personal
    /// contact number when no tenant owns the channel id directly.
    pub async fn find_by_owner_phone(&self, phone: &str) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE owner_phone = $1 LIMIT 1"
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Authoritative balance read, bypassing every cache.
    pub async fn get_balance(&self, id: Uuid) -> DbResult<Decimal> {
        let balance: Option<(Decimal,)> =
            sqlx::query_as("SELECT wallet_balance FROM tenants WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        balance
            .map(|(b,)| b)
            .ok_or_else(|| DbError::NotFound(format!("tenant {id}")))
    }

    /// Fetch encrypted credentials. Always read fresh — this projection
    /// is deliberately excluded from the cache tier.
    pub async fn get_credentials(&self, id: Uuid) -> DbResult<Option<DbTenantCredentials>> {
        let creds = sqlx::query_as::<_, DbTenantCredentials>(
            "SELECT provider_sid, provider_token FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(creds)
    }

    /// Subset read by the monthly billing sweep.
    pub async fn get_billing_profile(&self, id: Uuid) -> DbResult<Option<DbBillingProfile>> {
        let profile = sqlx::query_as::<_, DbBillingProfile>(
            "SELECT status, wallet_balance, monthly_fee FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    // =========================================================================
    // Balance Mutation (atomic, single-statement)
    // =========================================================================

    /// Atomically adjust the wallet balance by `delta` (negative for a
    /// debit) and return the authoritative post-adjustment balance.
    ///
    /// This is one store-level increment statement — never a separate
    /// read plus write.
    pub async fn adjust_balance(&self, id: Uuid, delta: Decimal) -> DbResult<Decimal> {
        let balance: Option<(Decimal,)> = sqlx::query_as(
            r#"
            UPDATE tenants
            SET wallet_balance = wallet_balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING wallet_balance
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        balance
            .map(|(b,)| b)
            .ok_or_else(|| DbError::NotFound(format!("tenant {id}")))
    }

    /// Atomically deduct the monthly fee and advance the next billing
    /// date in the same statement, returning the new balance.
    pub async fn charge_monthly_fee(
        &self,
        id: Uuid,
        fee: Decimal,
        next_billing_date: DateTime<Utc>,
    ) -> DbResult<Decimal> {
        let balance: Option<(Decimal,)> = sqlx::query_as(
            r#"
            UPDATE tenants
            SET wallet_balance = wallet_balance - $2,
                next_billing_date = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING wallet_balance
            "#,
        )
        .bind(id)
        .bind(fee)
        .bind(next_billing_date)
        .fetch_optional(&self.pool)
        .await?;

        balance
            .map(|(b,)| b)
            .ok_or_else(|| DbError::NotFound(format!("tenant {id}")))
    }

    // =========================================================================
    // Configuration Mutation
    // =========================================================================

    pub async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE tenants SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("tenant {id}")));
        }
        Ok(())
    }

    pub async fn update_bot_config(
        &self,
        id: Uuid,
        system_prompt: Option<&str>,
        ai_model: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET system_prompt = COALESCE($2, system_prompt),
                ai_model = COALESCE($3, ai_model),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(system_prompt)
        .bind(ai_model)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("tenant {id}")));
        }
        Ok(())
    }

    /// Store new provider credentials. `provider_token` must already be
    /// vault ciphertext — plaintext never reaches this layer.
    pub async fn update_provider_credentials(
        &self,
        id: Uuid,
        provider_sid: &str,
        encrypted_token: &str,
        channel_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET provider_sid = $2, provider_token = $3, channel_id = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(provider_sid)
        .bind(encrypted_token)
        .bind(channel_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("tenant {id}")));
        }
        Ok(())
    }
}
