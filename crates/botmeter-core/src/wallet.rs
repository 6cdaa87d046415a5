//! Wallet ledger
//!
//! All balance reads are cache-first with a store fallback; all balance
//! mutations are single-statement atomic increments against the store,
//! followed by a cache refresh with the authoritative post-mutation
//! value (write to store first, then cache — never the reverse).
//!
//! Known limitation: the sufficiency check and the decrement are two
//! separate steps, not one conditional store operation. Two concurrent
//! debits for the same tenant can both pass the check before either
//! decrements; the store-level increment is still atomic, so updates
//! are never lost, but the balance can go negative under true
//! concurrency.

use std::sync::Arc;

use botmeter_db::Database;
use botmeter_types::{TenantId, TenantStatus};
use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;

use crate::notify::ThresholdNotifier;
use crate::{cache_read, cache_write, BillingConfig, CoreError, CoreResult};

pub struct WalletLedger {
    db: Arc<Database>,
    config: BillingConfig,
    notifier: ThresholdNotifier,
}

impl WalletLedger {
    pub fn new(db: Arc<Database>, config: BillingConfig) -> Self {
        let notifier = ThresholdNotifier::new(db.clone());
        Self { db, config, notifier }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Balance read: cache-first, store on miss, cache repopulated with TTL.
    ///
    /// The cached copy is advisory; a forced authoritative read is
    /// `TenantRepo::get_balance` directly.
    pub async fn get_balance(&self, tenant_id: TenantId) -> CoreResult<Decimal> {
        let cache = self.db.cache();

        if let Some(balance) = cache_read("balance get", cache.get_tenant_balance(tenant_id).await)
        {
            return Ok(balance);
        }

        let balance = self.db.tenant_repo().get_balance(tenant_id).await?;

        cache_write(
            "balance set",
            cache.set_tenant_balance(tenant_id, balance).await,
        );

        Ok(balance)
    }

    pub async fn has_sufficient_balance(
        &self,
        tenant_id: TenantId,
        amount: Decimal,
    ) -> CoreResult<bool> {
        let balance = self.get_balance(tenant_id).await?;
        Ok(balance >= amount)
    }

    /// Credit the wallet (payment approval, direct top-up) and return the
    /// authoritative new balance.
    pub async fn credit(&self, tenant_id: TenantId, amount: Decimal) -> CoreResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(amount));
        }

        let new_balance = self.db.tenant_repo().adjust_balance(tenant_id, amount).await?;

        cache_write(
            "balance refresh",
            self.db.cache().set_tenant_balance(tenant_id, new_balance).await,
        );

        Ok(new_balance)
    }

    /// Debit the wallet by `amount`, failing with `InsufficientBalance`
    /// (and touching nothing) when the balance does not cover it.
    pub async fn debit(&self, tenant_id: TenantId, amount: Decimal) -> CoreResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(amount));
        }

        let balance = self.get_balance(tenant_id).await?;
        if balance < amount {
            return Err(CoreError::InsufficientBalance { balance, required: amount });
        }

        // Single-statement atomic decrement; the check above and this
        // write are deliberately not one conditional operation.
        let new_balance = self
            .db
            .tenant_repo()
            .adjust_balance(tenant_id, -amount)
            .await?;

        cache_write(
            "balance refresh",
            self.db.cache().set_tenant_balance(tenant_id, new_balance).await,
        );

        // The pre-decrement balance derived from the authoritative
        // post-decrement value, not from the possibly-stale cached read.
        let old_balance = new_balance + amount;
        self.notifier
            .check_and_notify(
                tenant_id,
                old_balance,
                new_balance,
                self.config.low_balance_threshold,
            )
            .await;

        Ok(new_balance)
    }

    /// Monthly subscription sweep for one tenant.
    ///
    /// Non-ACTIVE tenants fail with `TenantNotActive`. A balance short of
    /// the fee pauses the tenant with no partial debit. Otherwise the fee
    /// is deducted and `next_billing_date` advances one calendar month in
    /// the same statement.
    pub async fn run_monthly_billing(&self, tenant_id: TenantId) -> CoreResult<Decimal> {
        let repo = self.db.tenant_repo();
        let profile = repo
            .get_billing_profile(tenant_id)
            .await?
            .ok_or(CoreError::NotFound)?;

        let status = TenantStatus::parse(&profile.status)?;
        if !status.is_active() {
            return Err(CoreError::TenantNotActive { status });
        }

        let fee = profile.monthly_fee;

        if profile.wallet_balance < fee {
            repo.update_status(tenant_id, TenantStatus::Paused.as_str()).await?;

            // The status change stales both the balance snapshot and the
            // config snapshot (which carries status).
            let cache = self.db.cache();
            cache_write("balance invalidate", cache.delete_tenant_balance(tenant_id).await);
            cache_write("config invalidate", cache.delete_tenant_config(tenant_id).await);

            return Err(CoreError::InsufficientBalance {
                balance: profile.wallet_balance,
                required: fee,
            });
        }

        let next_billing = next_billing_date_after(Utc::now());
        let new_balance = repo.charge_monthly_fee(tenant_id, fee, next_billing).await?;

        cache_write(
            "balance refresh",
            self.db.cache().set_tenant_balance(tenant_id, new_balance).await,
        );

        self.notifier
            .check_and_notify(
                tenant_id,
                new_balance + fee,
                new_balance,
                self.config.low_balance_threshold,
            )
            .await;

        Ok(new_balance)
    }

    /// Drop every tenant-scoped cache entry this ledger can stale.
    pub async fn invalidate_cache(&self, tenant_id: TenantId) {
        let cache = self.db.cache();
        cache_write("balance invalidate", cache.delete_tenant_balance(tenant_id).await);
        cache_write("config invalidate", cache.delete_tenant_config(tenant_id).await);
    }
}

/// One calendar month ahead, clamped to the last day of shorter months.
fn next_billing_date_after(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or(now + Duration::days(30))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn billing_date_advances_one_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let next = next_billing_date_after(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn billing_date_clamps_at_month_end() {
        let jan31 = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let next = next_billing_date_after(jan31);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());

        let leap = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            next_billing_date_after(leap),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn billing_date_rolls_over_year_end() {
        let dec = Utc.with_ymd_and_hms(2026, 12, 3, 8, 30, 0).unwrap();
        assert_eq!(
            next_billing_date_after(dec),
            Utc.with_ymd_and_hms(2027, 1, 3, 8, 30, 0).unwrap()
        );
    }
}
