//! Botmeter billing engine
//!
//! The core of the multi-tenant messaging-bot billing platform:
//!
//! - [`resolver::TenantResolver`] — channel identifier → live messaging
//!   config, with decrypted credentials merged in fresh on every call
//! - [`wallet::WalletLedger`] — cache-first balance reads, atomic
//!   credit/debit, monthly subscription sweep
//! - [`usage::UsageRecorder`] — one append-only record per message, with
//!   an explicit charge policy
//! - [`notify::ThresholdNotifier`] — low-balance floor crossing alerts
//!
//! Every operation performs at least one I/O round trip; callers must
//! not hold in-process locks across them. The cache tier is optional at
//! every call site — a cache outage degrades to store lookups — while
//! the relational store is the source of truth and its unavailability is
//! a hard failure.

pub mod config;
pub mod error;
pub mod notify;
pub mod resolver;
pub mod usage;
pub mod wallet;

pub use config::BillingConfig;
pub use error::{CoreError, CoreResult};
pub use notify::ThresholdNotifier;
pub use resolver::{CachedTenantConfig, TenantMessagingConfig, TenantResolver};
pub use usage::{UsageRecord, UsageRecorder};
pub use wallet::WalletLedger;

pub use botmeter_types::{ChargePolicy, MessageDirection, TenantId, TenantStatus};

use botmeter_db::DbResult;
use tracing::warn;

/// Degrade a cache read to a miss, logging the outage. Every cache call
/// site has a store fallback; the cache is never allowed to fail an
/// operation.
pub(crate) fn cache_read<T>(op: &str, result: DbResult<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "cache {op} failed; falling back to store");
            None
        }
    }
}

/// Swallow a cache write/invalidate failure, logging the outage.
pub(crate) fn cache_write<T>(op: &str, result: DbResult<T>) {
    if let Err(e) = result {
        warn!(error = %e, "cache {op} failed; entry will expire by TTL instead");
    }
}
