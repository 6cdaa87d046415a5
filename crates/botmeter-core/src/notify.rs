//! Threshold notifier
//!
//! Emits a low-balance notification when a debit crosses the configured
//! floor downward. Crossing, not "below", is the trigger: repeated debits
//! under the floor stay silent until the balance recovers above it and
//! crosses again. Notification failures are logged and swallowed — an
//! alerting outage must never fail a debit.

use std::sync::Arc;

use botmeter_db::Database;
use botmeter_types::{TenantId, NOTIFICATION_LOW_BALANCE};
use rust_decimal::Decimal;
use tracing::warn;

/// Strict downward crossing: at or above the floor before, below it after.
pub fn crossed_floor(old_balance: Decimal, new_balance: Decimal, floor: Decimal) -> bool {
    old_balance >= floor && new_balance < floor
}

pub struct ThresholdNotifier {
    db: Arc<Database>,
}

impl ThresholdNotifier {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a low-balance notification if the balance crossed the floor.
    /// Side effect only; never blocks or fails the caller.
    pub async fn check_and_notify(
        &self,
        tenant_id: TenantId,
        old_balance: Decimal,
        new_balance: Decimal,
        floor: Decimal,
    ) {
        if !crossed_floor(old_balance, new_balance, floor) {
            return;
        }

        let message = format!(
            "Wallet balance dropped to {new_balance}, below the {floor} low-balance threshold. \
             Top up to keep the bot responding."
        );

        if let Err(e) = self
            .db
            .notification_repo()
            .insert(
                Some(tenant_id),
                NOTIFICATION_LOW_BALANCE,
                "Low wallet balance",
                &message,
            )
            .await
        {
            warn!(%tenant_id, error = %e, "failed to record low-balance notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fires_only_on_strict_downward_crossing() {
        let floor = dec!(3);
        assert!(!crossed_floor(dec!(5), dec!(3), floor)); // 3 is not < 3
        assert!(crossed_floor(dec!(3), dec!(2), floor));
        assert!(!crossed_floor(dec!(2), dec!(4), floor)); // upward
        assert!(crossed_floor(dec!(4), dec!(1), floor));
    }

    #[test]
    fn balance_sequence_fires_exactly_twice() {
        // Sequence [5, 3, 2, 4, 1] with floor 3: crossings at 3→2 and 4→1.
        let floor = dec!(3);
        let sequence = [dec!(5), dec!(3), dec!(2), dec!(4), dec!(1)];
        let fired = sequence
            .windows(2)
            .filter(|w| crossed_floor(w[0], w[1], floor))
            .count();
        assert_eq!(fired, 2);
    }

    #[test]
    fn stays_silent_while_below_floor() {
        let floor = dec!(3);
        assert!(!crossed_floor(dec!(2), dec!(1), floor));
        assert!(!crossed_floor(dec!(1), dec!(0.5), floor));
    }
}
