//! Botmeter Types - Canonical domain types for the messaging-bot billing core
//!
//! This crate contains the foundational types shared across the billing
//! engine with zero dependencies on other botmeter crates:
//!
//! - Tenant lifecycle status and its string mapping to the store
//! - Message direction for usage attribution
//! - Charge policy: the explicit billing decision passed by callers
//!
//! # Architectural Invariants
//!
//! 1. Wallet amounts are `rust_decimal::Decimal` — floats never touch money
//! 2. A channel identifier routes to at most one tenant
//! 3. Usage records are append-only; tenants are never deleted, only BANNED

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tenant identifier. Opaque key into the relational store.
pub type TenantId = Uuid;

/// Parse failure for a status or direction string coming from the store.
///
/// These strings are written by this codebase only, so a parse failure
/// indicates store corruption or a schema drift, not bad user input.
#[derive(Debug, Clone, Error)]
#[error("unknown {field} value in store: {value}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

/// Tenant lifecycle status.
///
/// Stored as TEXT in the tenants table. `Banned` is terminal and replaces
/// physical deletion; `Paused` is entered automatically when the monthly
/// sweep finds insufficient balance, and is reversible by a top-up flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    Active,
    Paused,
    Banned,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "ACTIVE",
            TenantStatus::Paused => "PAUSED",
            TenantStatus::Banned => "BANNED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "ACTIVE" => Ok(TenantStatus::Active),
            "PAUSED" => Ok(TenantStatus::Paused),
            "BANNED" => Ok(TenantStatus::Banned),
            other => Err(UnknownVariant {
                field: "tenant status",
                value: other.to_string(),
            }),
        }
    }

    /// Whether messages may be forwarded and billed for this tenant.
    pub fn is_active(&self) -> bool {
        matches!(self, TenantStatus::Active)
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a logged message relative to the tenant's bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Inbound => "INBOUND",
            MessageDirection::Outbound => "OUTBOUND",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownVariant> {
        match s {
            "INBOUND" => Ok(MessageDirection::Inbound),
            "OUTBOUND" => Ok(MessageDirection::Outbound),
            other => Err(UnknownVariant {
                field: "message direction",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing decision for a logged message, supplied explicitly by the caller.
///
/// Inbound messages are typically funded by the outbound reply they
/// trigger, so the directional default charges outbound traffic only.
/// Making the policy an input (rather than inferring it from direction
/// inside the recorder) keeps billing behavior testable and auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "amount", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargePolicy {
    /// Debit the configured default per-message cost.
    ChargeNow,
    /// Record the message without debiting the wallet.
    ChargeNever,
    /// Debit a caller-supplied amount instead of the default.
    ChargeAmount(Decimal),
}

impl ChargePolicy {
    /// The directional default: outbound replies are billed, inbound
    /// triggers are not.
    pub fn for_direction(direction: MessageDirection) -> Self {
        match direction {
            MessageDirection::Outbound => ChargePolicy::ChargeNow,
            MessageDirection::Inbound => ChargePolicy::ChargeNever,
        }
    }

    /// Resolve the cost to attribute to the usage record.
    ///
    /// The resolved cost is recorded even when no debit happens, so
    /// analytics can price unbilled traffic.
    pub fn resolved_cost(&self, default_cost: Decimal) -> Decimal {
        match self {
            ChargePolicy::ChargeAmount(amount) => *amount,
            ChargePolicy::ChargeNow | ChargePolicy::ChargeNever => default_cost,
        }
    }

    /// Whether the wallet must be debited for this message.
    pub fn should_debit(&self) -> bool {
        !matches!(self, ChargePolicy::ChargeNever)
    }
}

/// Notification type written by the threshold notifier.
pub const NOTIFICATION_LOW_BALANCE: &str = "LOW_BALANCE";

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_roundtrip() {
        for status in [TenantStatus::Active, TenantStatus::Paused, TenantStatus::Banned] {
            assert_eq!(TenantStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(TenantStatus::parse("DELETED").is_err());
    }

    #[test]
    fn only_active_may_bill() {
        assert!(TenantStatus::Active.is_active());
        assert!(!TenantStatus::Paused.is_active());
        assert!(!TenantStatus::Banned.is_active());
    }

    #[test]
    fn direction_roundtrip() {
        for dir in [MessageDirection::Inbound, MessageDirection::Outbound] {
            assert_eq!(MessageDirection::parse(dir.as_str()).unwrap(), dir);
        }
        assert!(MessageDirection::parse("SIDEWAYS").is_err());
    }

    #[test]
    fn directional_default_charges_outbound_only() {
        assert_eq!(
            ChargePolicy::for_direction(MessageDirection::Outbound),
            ChargePolicy::ChargeNow
        );
        assert_eq!(
            ChargePolicy::for_direction(MessageDirection::Inbound),
            ChargePolicy::ChargeNever
        );
    }

    #[test]
    fn explicit_amount_overrides_default_cost() {
        let default = dec!(0.03);
        assert_eq!(ChargePolicy::ChargeNow.resolved_cost(default), default);
        assert_eq!(ChargePolicy::ChargeNever.resolved_cost(default), default);
        assert_eq!(
            ChargePolicy::ChargeAmount(dec!(0.10)).resolved_cost(default),
            dec!(0.10)
        );
    }

    #[test]
    fn charge_never_skips_debit_but_keeps_cost() {
        assert!(ChargePolicy::ChargeNow.should_debit());
        assert!(ChargePolicy::ChargeAmount(dec!(1)).should_debit());
        assert!(!ChargePolicy::ChargeNever.should_debit());
    }
}
