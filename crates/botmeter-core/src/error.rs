//! Billing core error taxonomy
//!
//! Business-expected outcomes (`NotFound`, `InsufficientBalance`,
//! `TenantNotActive`) are typed results callers branch on; they never
//! leave partial state behind. Store failures are hard failures — the
//! cache is never an acceptable substitute source of truth, so cache
//! errors are swallowed at their call sites and do not appear here.

use botmeter_crypto::VaultError;
use botmeter_db::DbError;
use botmeter_types::{TenantStatus, UnknownVariant};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Tenant or channel unresolvable. Expected; surfaced as "no route".
    #[error("Tenant not found")]
    NotFound,

    /// Expected business outcome; balance and records are untouched.
    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    /// Tenant is PAUSED or BANNED; callers short-circuit before billing.
    #[error("Tenant is not active (status: {status})")]
    TenantNotActive { status: TenantStatus },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Missing key or unparsable setting. Fatal at process start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Relational store unavailable or query failed. Hard failure;
    /// callers must fail closed.
    #[error("Store error: {0}")]
    Store(DbError),

    #[error("Credential vault error: {0}")]
    Vault(#[from] VaultError),

    /// A status/direction string in the store does not parse. Indicates
    /// schema drift, not bad input.
    #[error("Corrupt store data: {0}")]
    Corrupt(#[from] UnknownVariant),
}

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(_) => CoreError::NotFound,
            other => CoreError::Store(other),
        }
    }
}

impl CoreError {
    /// Expected business outcomes, as opposed to infrastructure failures.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound
                | CoreError::InsufficientBalance { .. }
                | CoreError::TenantNotActive { .. }
                | CoreError::InvalidAmount(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
