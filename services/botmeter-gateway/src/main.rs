//! Botmeter Gateway
//!
//! Ingress gate for the multi-tenant bot billing platform. Receives
//! provider webhooks, resolves the tenant, applies the kill switch
//! (status + wallet balance), records usage, and forwards eligible
//! messages to the external AI workflow engine.
//!
//! # Usage
//!
//! ```bash
//! # Start with environment configuration
//! DATABASE_URL=... REDIS_URL=... ENCRYPTION_KEY=... \
//! WORKFLOW_WEBHOOK_URL=... botmeter-gateway
//!
//! # Override the bind address
//! botmeter-gateway --host 0.0.0.0 --port 8080
//! ```

mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use botmeter_core::{BillingConfig, TenantResolver, UsageRecorder, WalletLedger};
use botmeter_crypto::CredentialVault;
use botmeter_db::{Database, DatabaseConfig};

use crate::state::AppState;

/// Botmeter Gateway - webhook ingress for the bot billing core
#[derive(Parser, Debug)]
#[command(name = "botmeter-gateway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// External AI workflow webhook URL
    #[arg(long, env = "WORKFLOW_WEBHOOK_URL")]
    workflow_url: String,

    /// Public base URL for workflow callbacks
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:3000")]
    public_url: String,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Skip running migrations at startup
    #[arg(long, env = "SKIP_MIGRATIONS")]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(fmt::layer())
        .init();

    // Configuration errors are fatal here, before any traffic is accepted.
    let vault = Arc::new(CredentialVault::from_env().context("credential vault")?);
    let db_config = DatabaseConfig::from_env().map_err(anyhow::Error::msg)?;
    let billing = BillingConfig::from_env().context("billing configuration")?;

    let db = Arc::new(Database::connect(&db_config).await?);
    if !args.skip_migrations {
        db.migrate().await?;
    }

    let ledger = Arc::new(WalletLedger::new(db.clone(), billing));
    let state = Arc::new(AppState {
        resolver: TenantResolver::new(db.clone(), vault),
        recorder: UsageRecorder::new(db.clone(), ledger.clone()),
        ledger,
        workflow_url: args.workflow_url,
        public_url: args.public_url.trim_end_matches('/').to_string(),
        http: reqwest::Client::new(),
        db,
    });

    let app = routes::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid bind address")?;

    tracing::info!("Botmeter gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
