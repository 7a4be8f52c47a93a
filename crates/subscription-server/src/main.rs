//! Subscription payment server
//!
//! Axum-based server that starts Chapa checkouts and records verified
//! payments when the gateway calls back.

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subscription_payments::{
    ChapaClient, MemoryPaymentStore, PaymentConfig, PaymentGateway, PaymentService, PaymentStore,
    SqlitePaymentStore,
};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before the filter reads RUST_LOG
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment from .env"),
        Err(e) => tracing::debug!("No .env loaded: {e}"),
    }

    // Payments
    let config = PaymentConfig::from_env().context("loading payment configuration")?;
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(ChapaClient::new(&config).context("building gateway client")?);
    tracing::info!(gateway = gateway.name(), base = %config.api_base_url, "✓ Gateway configured");

    let store: Arc<dyn PaymentStore> = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => Arc::new(
            SqlitePaymentStore::connect(url.trim())
                .await
                .context("opening payment database")?,
        ),
        _ => {
            tracing::warn!("⚠ DATABASE_URL not set - payments are kept in memory only");
            Arc::new(MemoryPaymentStore::new())
        }
    };
    tracing::info!(store = store.backend(), "✓ Payment store ready");

    let charge = config.charge.clone();
    let state = AppState::new(PaymentService::new(gateway, store, config));
    let app = routes::router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!("subscription server running on http://{}", addr);
    tracing::info!("  Charge: {} {}", charge.amount, charge.currency);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                   - Health check");
    tracing::info!("  POST /api/pay                  - Start a checkout");
    tracing::info!("  GET  /api/payment/callback     - Gateway callback");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
