//! Billing configuration
//!
//! All amounts are `Decimal`, parsed from their environment strings
//! without ever passing through a float.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{CoreError, CoreResult};

/// Billing knobs shared by the wallet ledger and usage recorder.
#[derive(Debug, Clone, Copy)]
pub struct BillingConfig {
    /// Default cost attributed (and debited, policy permitting) per message.
    pub cost_per_message: Decimal,
    /// Default subscription fee for newly registered tenants.
    pub monthly_fee: Decimal,
    /// Low-balance floor; crossing it downward fires a notification.
    pub low_balance_threshold: Decimal,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cost_per_message: dec!(0.03),
            monthly_fee: dec!(29.00),
            low_balance_threshold: dec!(1.00),
        }
    }
}

impl BillingConfig {
    /// Load from `COST_PER_MESSAGE`, `MONTHLY_SUBSCRIPTION_FEE`, and
    /// `LOW_BALANCE_THRESHOLD`, falling back to the defaults above.
    /// A present-but-unparsable value is a configuration error.
    pub fn from_env() -> CoreResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            cost_per_message: env_decimal("COST_PER_MESSAGE", defaults.cost_per_message)?,
            monthly_fee: env_decimal("MONTHLY_SUBSCRIPTION_FEE", defaults.monthly_fee)?,
            low_balance_threshold: env_decimal(
                "LOW_BALANCE_THRESHOLD",
                defaults.low_balance_threshold,
            )?,
        })
    }
}

fn env_decimal(key: &str, default: Decimal) -> CoreResult<Decimal> {
    match std::env::var(key) {
        Ok(raw) => parse_decimal(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_decimal(key: &str, raw: &str) -> CoreResult<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| CoreError::Configuration(format!("{key} is not a valid decimal: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_exact_decimals() {
        let config = BillingConfig::default();
        assert_eq!(config.cost_per_message, dec!(0.03));
        assert_eq!(config.monthly_fee, dec!(29.00));
        assert_eq!(config.low_balance_threshold, dec!(1.00));
    }

    #[test]
    fn decimal_parsing_keeps_precision() {
        assert_eq!(parse_decimal("K", "0.03").unwrap(), dec!(0.03));
        assert_eq!(parse_decimal("K", " 29.00 ").unwrap(), dec!(29.00));
        // Exactness floats cannot provide
        assert_eq!(
            parse_decimal("K", "0.1").unwrap() + parse_decimal("K", "0.2").unwrap(),
            dec!(0.3)
        );
    }

    #[test]
    fn garbage_is_a_configuration_error() {
        assert!(matches!(
            parse_decimal("COST_PER_MESSAGE", "three cents"),
            Err(CoreError::Configuration(_))
        ));
    }
}
