//! youtube-sauce API binary entrypoint.
//! Loads `.env` + config, initializes tracing and storage, then serves the
//! Axum router until SIGTERM / Ctrl-C.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use metrics::gauge;
use tracing::{error, info};

use youtube_sauce::{logging, App, Config};

const LIMITER_PRUNE_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let cfg = Config::load().context("loading configuration")?;
    logging::init_tracing(&cfg);
    info!(
        service = "youtube-sauce",
        port = cfg.port,
        backend = %cfg.storage,
        origins = cfg.allowed_origins.len(),
        region = cfg.region.as_deref(),
        "starting"
    );

    let App { router, state } = match youtube_sauce::app(&cfg).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, region = cfg.region.as_deref(), "failed to initialize storage");
            return Err(e);
        }
    };

    // Keyed limiter state grows with distinct clients; prune it periodically.
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_PRUNE_EVERY);
        loop {
            ticker.tick().await;
            limiter.prune();
            gauge!("rate_limiter_clients").set(limiter.tracked_clients() as f64);
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "server running");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("http server")?;
    info!("HTTP server closed");

    state.store.close().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, starting graceful shutdown"),
        _ = terminate => info!("SIGTERM received, starting graceful shutdown"),
    }
}
