//! Usage recorder
//!
//! Appends one immutable usage record per processed message and, policy
//! permitting, debits the wallet. The sufficiency check runs BEFORE the
//! record is persisted: an unbillable message produces no ghost record.
//! A zero resolved cost is recorded but never debited. A debit failure
//! after the record is persisted leaves an unbilled record behind — an
//! accepted reconciliation gap, logged with the record id rather than
//! wrapped in a transaction.

use std::sync::Arc;

use botmeter_db::{Database, DbUsageLog};
use botmeter_types::{ChargePolicy, MessageDirection, TenantId};
use rust_decimal::Decimal;
use tracing::error;

use crate::wallet::WalletLedger;
use crate::{CoreError, CoreResult};

/// One logged message, as returned to callers.
pub type UsageRecord = DbUsageLog;

pub struct UsageRecorder {
    db: Arc<Database>,
    ledger: Arc<WalletLedger>,
}

impl UsageRecorder {
    pub fn new(db: Arc<Database>, ledger: Arc<WalletLedger>) -> Self {
        Self { db, ledger }
    }

    /// Append a usage record and apply the charge policy.
    ///
    /// `policy` is the explicit billing decision; use
    /// [`ChargePolicy::for_direction`] for the directional default
    /// (outbound charges, inbound does not). The record's cost column
    /// always carries the resolved cost, debited or not.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_message(
        &self,
        tenant_id: TenantId,
        direction: MessageDirection,
        content: &str,
        from_phone: Option<&str>,
        to_phone: Option<&str>,
        message_id: Option<&str>,
        policy: ChargePolicy,
    ) -> CoreResult<UsageRecord> {
        let cost = policy.resolved_cost(self.ledger.config().cost_per_message);
        let debit_due = debit_due(policy, cost);

        // Gate before persisting: an insufficient wallet writes nothing.
        if debit_due {
            let balance = self.ledger.get_balance(tenant_id).await?;
            if balance < cost {
                return Err(CoreError::InsufficientBalance { balance, required: cost });
            }
        }

        let record = self
            .db
            .usage_repo()
            .insert(
                tenant_id,
                direction.as_str(),
                content,
                cost,
                from_phone,
                to_phone,
                message_id,
            )
            .await?;

        if debit_due {
            if let Err(e) = self.ledger.debit(tenant_id, cost).await {
                // Record persisted, debit failed: unbilled usage record.
                error!(
                    %tenant_id,
                    usage_log_id = %record.id,
                    error = %e,
                    "debit failed after usage record was persisted; record is unbilled"
                );
                return Err(e);
            }
        }

        Ok(record)
    }
}

/// A wallet debit happens only when the policy calls for one AND the
/// resolved cost is positive. A zero-cost message is recorded with its
/// zero cost and the wallet is left untouched — it must never reach the
/// ledger's positive-amount guard.
fn debit_due(policy: ChargePolicy, cost: Decimal) -> bool {
    policy.should_debit() && cost > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_resolved_cost_never_debits() {
        // An explicit zero charge is valid input and must not produce a
        // debit call (which rejects non-positive amounts).
        assert!(!debit_due(ChargePolicy::ChargeAmount(Decimal::ZERO), Decimal::ZERO));
        // Same when the configured default cost itself is zero.
        assert!(!debit_due(ChargePolicy::ChargeNow, Decimal::ZERO));
    }

    #[test]
    fn positive_cost_debits_per_policy() {
        assert!(debit_due(ChargePolicy::ChargeNow, dec!(0.03)));
        assert!(debit_due(ChargePolicy::ChargeAmount(dec!(0.10)), dec!(0.10)));
        assert!(!debit_due(ChargePolicy::ChargeNever, dec!(0.03)));
    }
}
