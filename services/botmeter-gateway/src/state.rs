//! Shared application state

use std::sync::Arc;

use botmeter_core::{TenantResolver, UsageRecorder, WalletLedger};
use botmeter_db::Database;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub db: Arc<Database>,
    pub resolver: TenantResolver,
    pub ledger: Arc<WalletLedger>,
    pub recorder: UsageRecorder,
    /// External AI workflow endpoint messages are forwarded to.
    pub workflow_url: String,
    /// Public base URL used to build the workflow callback address.
    pub public_url: String,
    pub http: reqwest::Client,
}
