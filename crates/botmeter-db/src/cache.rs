//! Redis cache manager for tenant routing, config snapshots, and balances
//!
//! The cache is a read-through accelerator over PostgreSQL and is never
//! the source of truth. Every entry carries its own TTL; the balance TTL
//! is the shortest of the tenant-scoped entries to bound staleness during
//! heavy billing activity. Mutation paths write to the store first and
//! then refresh or invalidate here — never the reverse.

use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{DbError, DbResult};

/// Cache key builders, one per entry family.
pub mod keys {
    use uuid::Uuid;

    pub const CHANNEL: &str = "channel:";
    pub const TENANT_CONFIG: &str = "tenant-config:";
    pub const TENANT_BALANCE: &str = "tenant-balance:";

    /// `channel:<id>` → tenant id
    pub fn channel(channel_id: &str) -> String {
        format!("{CHANNEL}{channel_id}")
    }

    /// `tenant-config:<id>` → non-secret config snapshot
    pub fn tenant_config(tenant_id: Uuid) -> String {
        format!("{TENANT_CONFIG}{tenant_id}")
    }

    /// `tenant-balance:<id>` → balance snapshot
    pub fn tenant_balance(tenant_id: Uuid) -> String {
        format!("{TENANT_BALANCE}{tenant_id}")
    }
}

/// Default TTLs. Config is shorter-lived than the channel mapping, and
/// balance is the shortest-lived tenant entry.
pub mod ttl {
    use std::time::Duration;

    pub const CHANNEL_MAPPING: Duration = Duration::from_secs(60 * 60); // 1 hour
    pub const TENANT_CONFIG: Duration = Duration::from_secs(10 * 60); // 10 minutes
    pub const TENANT_BALANCE: Duration = Duration::from_secs(5 * 60); // 5 minutes
}

pub struct CacheManager {
    pool: RedisPool,
}

impl CacheManager {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Basic Operations
    // =========================================================================

    /// Set a value with expiration
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> DbResult<()> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Redis(e.to_string()))?;

        let json = serde_json::to_string(value).map_err(|e| DbError::Serialization(e.to_string()))?;

        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs())
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;

        Ok(())
    }

    /// Get a value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Redis(e.to_string()))?;

        let result: Option<String> = conn.get(key).await.map_err(|e| DbError::Redis(e.to_string()))?;

        match result {
            Some(json) => {
                let value =
                    serde_json::from_str(&json).map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Redis(e.to_string()))?;

        let deleted: i32 = conn.del(key).await.map_err(|e| DbError::Redis(e.to_string()))?;

        Ok(deleted > 0)
    }

    /// Health probe
    pub async fn ping(&self) -> DbResult<()> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Redis(e.to_string()))?;
        let _: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;
        Ok(())
    }

    // =========================================================================
    // Channel Routing
    // =========================================================================

    /// Cache `channel id → tenant id` with the channel-mapping TTL.
    pub async fn set_channel_tenant(&self, channel_id: &str, tenant_id: Uuid) -> DbResult<()> {
        self.set(&keys::channel(channel_id), &tenant_id, ttl::CHANNEL_MAPPING)
            .await
    }

    /// Look up a cached channel mapping.
    pub async fn get_channel_tenant(&self, channel_id: &str) -> DbResult<Option<Uuid>> {
        self.get(&keys::channel(channel_id)).await
    }

    // =========================================================================
    // Tenant Config Snapshots (non-secret subset only)
    // =========================================================================

    pub async fn set_tenant_config<T: Serialize>(&self, tenant_id: Uuid, config: &T) -> DbResult<()> {
        self.set(&keys::tenant_config(tenant_id), config, ttl::TENANT_CONFIG)
            .await
    }

    pub async fn get_tenant_config<T: DeserializeOwned>(&self, tenant_id: Uuid) -> DbResult<Option<T>> {
        self.get(&keys::tenant_config(tenant_id)).await
    }

    pub async fn delete_tenant_config(&self, tenant_id: Uuid) -> DbResult<bool> {
        self.delete(&keys::tenant_config(tenant_id)).await
    }

    // =========================================================================
    // Balance Snapshots
    // =========================================================================

    pub async fn set_tenant_balance(&self, tenant_id: Uuid, balance: Decimal) -> DbResult<()> {
        self.set(&keys::tenant_balance(tenant_id), &balance, ttl::TENANT_BALANCE)
            .await
    }

    pub async fn get_tenant_balance(&self, tenant_id: Uuid) -> DbResult<Option<Decimal>> {
        self.get(&keys::tenant_balance(tenant_id)).await
    }

    pub async fn delete_tenant_balance(&self, tenant_id: Uuid) -> DbResult<bool> {
        self.delete(&keys::tenant_balance(tenant_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats() {
        let id = Uuid::nil();
        assert_eq!(keys::channel("+15551234567"), "channel:+15551234567");
        assert_eq!(
            keys::tenant_config(id),
            format!("tenant-config:{id}")
        );
        assert_eq!(
            keys::tenant_balance(id),
            format!("tenant-balance:{id}")
        );
    }

    #[test]
    fn ttl_ordering_bounds_staleness() {
        // Balance is the most volatile entry and must expire first;
        // the channel mapping changes rarely and may live longest.
        assert!(ttl::TENANT_BALANCE < ttl::TENANT_CONFIG);
        assert!(ttl::TENANT_CONFIG < ttl::CHANNEL_MAPPING);
    }
}
