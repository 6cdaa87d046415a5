//! Tenant resolver
//!
//! Maps an inbound channel identifier (provider phone number, page id)
//! to the owning tenant's live messaging configuration. Cache-aside over
//! the relational store: the channel mapping and the non-secret config
//! snapshot are cached with independent TTLs, while credentials are
//! re-fetched from the store and decrypted on every resolution — the
//! cache never holds plaintext or ciphertext secrets.
//!
//! A cache outage degrades silently to direct store lookups; a store
//! outage is a hard failure and callers must fail closed.

use std::sync::Arc;

use botmeter_crypto::CredentialVault;
use botmeter_db::{Database, DbTenant};
use botmeter_types::{TenantId, TenantStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{cache_read, cache_write, CoreError, CoreResult};

/// Schema version of the cached config snapshot. A snapshot with any
/// other version deserializes fine but is treated as a cache miss.
pub const CACHED_CONFIG_VERSION: u32 = 1;

/// Non-secret projection of a tenant's messaging configuration, as
/// stored in the cache tier. Credentials are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTenantConfig {
    pub version: u32,
    pub tenant_id: TenantId,
    pub business_name: String,
    pub system_prompt: Option<String>,
    pub ai_model: Option<String>,
    pub status: TenantStatus,
    pub wallet_balance: Decimal,
}

impl CachedTenantConfig {
    fn from_row(tenant: &DbTenant, status: TenantStatus) -> Self {
        Self {
            version: CACHED_CONFIG_VERSION,
            tenant_id: tenant.id,
            business_name: tenant.business_name.clone(),
            system_prompt: tenant.system_prompt.clone(),
            ai_model: tenant.ai_model.clone(),
            status,
            wallet_balance: tenant.wallet_balance,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version == CACHED_CONFIG_VERSION
    }
}

/// Full messaging configuration returned to the ingress gate: the cached
/// (or freshly loaded) snapshot merged with freshly decrypted credentials.
#[derive(Debug, Clone)]
pub struct TenantMessagingConfig {
    pub tenant_id: TenantId,
    pub business_name: String,
    pub system_prompt: Option<String>,
    pub ai_model: Option<String>,
    pub status: TenantStatus,
    pub wallet_balance: Decimal,
    pub provider_sid: Option<String>,
    /// Decrypted provider auth token. Never logged, never cached.
    pub provider_token: Option<String>,
}

pub struct TenantResolver {
    db: Arc<Database>,
    vault: Arc<CredentialVault>,
}

impl TenantResolver {
    pub fn new(db: Arc<Database>, vault: Arc<CredentialVault>) -> Self {
        Self { db, vault }
    }

    /// Resolve a channel identifier to the owning tenant's messaging
    /// configuration, or `NotFound` when no tenant owns it.
    pub async fn resolve_by_channel(&self, channel_id: &str) -> CoreResult<TenantMessagingConfig> {
        let cache = self.db.cache();

        // 1. Cached channel mapping. A hit skips the store lookup and
        //    the mapping is not re-written.
        if let Some(tenant_id) =
            cache_read("channel get", cache.get_channel_tenant(channel_id).await)
        {
            debug!(%channel_id, %tenant_id, "channel resolved from cache");
            return self.load_messaging_config(tenant_id).await;
        }

        // 2. Store lookup: primary routing key, then the owner's personal
        //    contact number as a secondary association.
        let repo = self.db.tenant_repo();
        let tenant = match repo.find_by_channel(channel_id).await? {
            Some(tenant) => tenant,
            None => repo
                .find_by_owner_phone(channel_id)
                .await?
                .ok_or(CoreError::NotFound)?,
        };

        // 3. Refresh the mapping on the DB fallback hit only. A failed
        //    resolution writes nothing — no negative-result caching.
        cache_write(
            "channel set",
            cache.set_channel_tenant(channel_id, tenant.id).await,
        );

        self.load_messaging_config(tenant.id).await
    }

    /// Fetch the messaging config for a resolved tenant id: snapshot from
    /// cache when possible, credentials always fresh from the store.
    pub async fn load_messaging_config(
        &self,
        tenant_id: TenantId,
    ) -> CoreResult<TenantMessagingConfig> {
        let cache = self.db.cache();

        let cached: Option<CachedTenantConfig> =
            cache_read("config get", cache.get_tenant_config(tenant_id).await)
                .filter(CachedTenantConfig::is_current);

        let snapshot = match cached {
            Some(snapshot) => snapshot,
            None => {
                let tenant = self
                    .db
                    .tenant_repo()
                    .find_by_id(tenant_id)
                    .await?
                    .ok_or(CoreError::NotFound)?;
                let status = TenantStatus::parse(&tenant.status)?;

                let snapshot = CachedTenantConfig::from_row(&tenant, status);
                cache_write("config set", cache.set_tenant_config(tenant_id, &snapshot).await);
                snapshot
            }
        };

        // Credentials are always re-fetched and decrypted here, whether
        // the snapshot came from the cache or the store.
        let creds = self
            .db
            .tenant_repo()
            .get_credentials(tenant_id)
            .await?
            .ok_or(CoreError::NotFound)?;

        let provider_token = match creds.provider_token.as_deref() {
            Some(ciphertext) => Some(self.vault.decrypt(ciphertext)?),
            None => None,
        };

        Ok(TenantMessagingConfig {
            tenant_id: snapshot.tenant_id,
            business_name: snapshot.business_name,
            system_prompt: snapshot.system_prompt,
            ai_model: snapshot.ai_model,
            status: snapshot.status,
            wallet_balance: snapshot.wallet_balance,
            provider_sid: creds.provider_sid,
            provider_token,
        })
    }

    // =========================================================================
    // Configuration updates (admin/customer paths)
    // =========================================================================

    /// Update the bot prompt/model and invalidate the config snapshot.
    pub async fn update_bot_config(
        &self,
        tenant_id: TenantId,
        system_prompt: Option<&str>,
        ai_model: Option<&str>,
    ) -> CoreResult<()> {
        self.db
            .tenant_repo()
            .update_bot_config(tenant_id, system_prompt, ai_model)
            .await?;

        cache_write(
            "config invalidate",
            self.db.cache().delete_tenant_config(tenant_id).await,
        );
        Ok(())
    }

    /// Rotate provider credentials. The token is encrypted before it
    /// reaches the store; the channel mapping is refreshed and the stale
    /// config snapshot dropped. The balance key is untouched — it cannot
    /// be staled by a credential change.
    pub async fn update_provider_credentials(
        &self,
        tenant_id: TenantId,
        provider_sid: &str,
        provider_token: &str,
        channel_id: &str,
    ) -> CoreResult<()> {
        let encrypted = self.vault.encrypt(provider_token)?;

        self.db
            .tenant_repo()
            .update_provider_credentials(tenant_id, provider_sid, &encrypted, channel_id)
            .await?;

        let cache = self.db.cache();
        cache_write("channel set", cache.set_channel_tenant(channel_id, tenant_id).await);
        cache_write("config invalidate", cache.delete_tenant_config(tenant_id).await);
        Ok(())
    }

    /// Transition tenant status and drop every snapshot it stales.
    pub async fn update_status(&self, tenant_id: TenantId, status: TenantStatus) -> CoreResult<()> {
        self.db
            .tenant_repo()
            .update_status(tenant_id, status.as_str())
            .await?;

        let cache = self.db.cache();
        cache_write("config invalidate", cache.delete_tenant_config(tenant_id).await);
        cache_write("balance invalidate", cache.delete_tenant_balance(tenant_id).await);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn snapshot() -> CachedTenantConfig {
        CachedTenantConfig {
            version: CACHED_CONFIG_VERSION,
            tenant_id: Uuid::new_v4(),
            business_name: "Corner Bakery".to_string(),
            system_prompt: Some("You take bread orders.".to_string()),
            ai_model: Some("gpt-4o-mini".to_string()),
            status: TenantStatus::Active,
            wallet_balance: dec!(12.50),
        }
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let original = snapshot();
        let json = serde_json::to_string(&original).unwrap();
        let back: CachedTenantConfig = serde_json::from_str(&json).unwrap();

        assert!(back.is_current());
        assert_eq!(back.tenant_id, original.tenant_id);
        assert_eq!(back.wallet_balance, dec!(12.50));
        assert_eq!(back.status, TenantStatus::Active);
    }

    #[test]
    fn snapshot_never_serializes_credentials() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        assert!(!json.contains("provider_token"));
        assert!(!json.contains("provider_sid"));
    }

    #[test]
    fn stale_version_is_a_miss() {
        let mut old = snapshot();
        old.version = CACHED_CONFIG_VERSION + 1;
        assert!(!old.is_current());

        // The resolver filters non-current snapshots down to a miss.
        let filtered = Some(old).filter(CachedTenantConfig::is_current);
        assert!(filtered.is_none());
    }
}
