//! client-lookup binary
//!
//! Usage:
//!   LOOKUP_ACCESS_PASSWORD=... LOOKUP_ADMIN_PASSWORD=... client-lookup
//!   client-lookup --ingest-mode shared --persisted-path data/shared.json

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use client_lookup_core::{LookupService, Session};
use client_lookup_server::{build_router, config::Args, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "client_lookup_server=info,client_lookup_core=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let bind = args.bind;
    let session_ttl = chrono::Duration::minutes(args.session_ttl_mins);
    let config = args.into_config().context("Invalid configuration")?;

    info!(
        bundled_default = %config.bundled_default.display(),
        persisted = ?config.persisted_path,
        mode = ?config.ingest_mode,
        session_ttl_mins = session_ttl.num_minutes(),
        "Starting client lookup"
    );

    let service = LookupService::from_config(&config).context("Failed to build lookup service")?;

    // Resolve once so a missing default shows up at startup, not
    // only on the first request.
    match service.resolve(&Session::new()) {
        Ok(source) => info!(source = %source.label(), "Initial data source"),
        Err(e) => warn!(error = %e, "No data source available yet"),
    }

    let state = AppState::new(service, config.max_upload_bytes).with_session_ttl(session_ttl);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        return Err(e.into());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
