//! End-to-end billing flow against live Postgres and Redis.
//!
//! Ignored by default; run with
//!
//! ```bash
//! DATABASE_URL=... REDIS_URL=... cargo test -p botmeter-core -- --ignored
//! ```
//!
//! Each test registers its own tenant, so runs are isolated and the
//! suite can be pointed at a shared development database.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use botmeter_core::{
    BillingConfig, ChargePolicy, CoreError, MessageDirection, UsageRecorder, WalletLedger,
};
use botmeter_db::{Database, DatabaseConfig};

async fn billing_stack() -> (Arc<Database>, Arc<WalletLedger>, UsageRecorder) {
    let config = DatabaseConfig::from_env().expect("DATABASE_URL and REDIS_URL must be set");
    let db = Arc::new(Database::connect(&config).await.expect("database connect"));
    db.migrate().await.expect("migrations");

    let ledger = Arc::new(WalletLedger::new(db.clone(), BillingConfig::default()));
    let recorder = UsageRecorder::new(db.clone(), ledger.clone());
    (db, ledger, recorder)
}

#[tokio::test]
#[ignore]
async fn insufficient_balance_persists_no_record() {
    let (db, _ledger, recorder) = billing_stack().await;

    // Fresh tenants start ACTIVE with a zero balance.
    let tenant = db
        .tenant_repo()
        .create("Unfunded Bakery", None, None, dec!(29.00))
        .await
        .expect("create tenant");

    let err = recorder
        .log_message(
            tenant.id,
            MessageDirection::Outbound,
            "reply that cannot be billed",
            None,
            None,
            None,
            ChargePolicy::ChargeAmount(dec!(0.05)),
        )
        .await
        .expect_err("zero balance cannot cover the charge");

    assert!(matches!(err, CoreError::InsufficientBalance { .. }));

    // The rejection happened before the insert: no ghost record.
    let count = db
        .usage_repo()
        .count_by_tenant(tenant.id)
        .await
        .expect("count records");
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore]
async fn zero_cost_message_is_recorded_without_debit() {
    let (db, ledger, recorder) = billing_stack().await;

    let tenant = db
        .tenant_repo()
        .create("Free Tier Florist", None, None, dec!(29.00))
        .await
        .expect("create tenant");

    // A zero charge is valid even against an empty wallet.
    let record = recorder
        .log_message(
            tenant.id,
            MessageDirection::Outbound,
            "complimentary reply",
            None,
            None,
            None,
            ChargePolicy::ChargeAmount(Decimal::ZERO),
        )
        .await
        .expect("zero-cost message succeeds");

    assert_eq!(record.cost, Decimal::ZERO);
    assert_eq!(
        ledger.get_balance(tenant.id).await.expect("balance"),
        Decimal::ZERO
    );
    let count = db
        .usage_repo()
        .count_by_tenant(tenant.id)
        .await
        .expect("count records");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore]
async fn billed_outbound_message_debits_default_cost() {
    let (db, ledger, recorder) = billing_stack().await;

    let tenant = db
        .tenant_repo()
        .create("Funded Tailor", None, None, dec!(29.00))
        .await
        .expect("create tenant");
    ledger.credit(tenant.id, dec!(10.00)).await.expect("top up");

    let record = recorder
        .log_message(
            tenant.id,
            MessageDirection::Outbound,
            "billed reply",
            Some("+15550001111"),
            Some("+15550002222"),
            Some("SM-test"),
            ChargePolicy::for_direction(MessageDirection::Outbound),
        )
        .await
        .expect("funded tenant bills cleanly");

    assert_eq!(record.cost, dec!(0.03));
    assert_eq!(
        ledger.get_balance(tenant.id).await.expect("balance"),
        dec!(9.97)
    );
}
