//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Tenant Models
// ============================================================================

/// One customer account: identity, routing keys, AI configuration, wallet.
///
/// `provider_token` is always vault ciphertext; plaintext credentials
/// never touch this struct. Rows are never deleted — `status` moves to
/// BANNED instead.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTenant {
    pub id: Uuid,
    pub business_name: String,
    /// Secondary channel association: the owner's personal contact number.
    pub owner_phone: Option<String>,
    /// Primary routing key (provider phone number or page id). Unique.
    pub channel_id: Option<String>,
    pub provider_sid: Option<String>,
    /// Encrypted provider auth token (ciphertext only).
    pub provider_token: Option<String>,
    pub system_prompt: Option<String>,
    pub ai_model: Option<String>,
    /// ACTIVE | PAUSED | BANNED
    pub status: String,
    pub wallet_balance: Decimal,
    pub monthly_fee: Decimal,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subset read by the monthly billing sweep.
#[derive(Debug, Clone, FromRow)]
pub struct DbBillingProfile {
    pub status: String,
    pub wallet_balance: Decimal,
    pub monthly_fee: Decimal,
}

/// Credentials row, fetched fresh at resolution time and never cached.
#[derive(Debug, Clone, FromRow)]
pub struct DbTenantCredentials {
    pub provider_sid: Option<String>,
    pub provider_token: Option<String>,
}

// ============================================================================
// Usage Models
// ============================================================================

/// One immutable record per logged message. Append-only: no update or
/// delete query exists for this table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbUsageLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// INBOUND | OUTBOUND
    pub direction: String,
    pub content: String,
    pub cost: Decimal,
    pub from_phone: Option<String>,
    pub to_phone: Option<String>,
    /// External message id for idempotency/dedupe.
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Notification Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbNotification {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
