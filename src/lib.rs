// src/lib.rs
// Public library surface for the server binary and integration tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod origin;
pub mod ratelimit;
pub mod storage;
pub mod timestamp;
pub mod validate;

// Client side: the overlay's form, state machine, local store and API client
pub mod overlay;

pub use crate::api::{router, AppState};
pub use crate::config::Config;

use anyhow::Context;
use axum::Router;
use tracing::info;

/// A ready-to-serve router plus the state it was built from (the binary needs
/// the state again at shutdown to close the pool).
pub struct App {
    pub router: Router,
    pub state: AppState,
}

/// Connect the configured storage backend and assemble the full router.
pub async fn app(cfg: &Config) -> anyhow::Result<App> {
    let store = storage::connect(cfg.storage, &cfg.database)
        .await
        .with_context(|| format!("connecting {} storage", cfg.storage))?;
    let state = AppState::new(store, cfg);

    let mut router = api::router(state.clone());
    if cfg.metrics_enabled {
        let m = metrics::Metrics::init()?;
        router = router.merge(m.router());
        info!("metrics exposed on /metrics");
    }

    Ok(App { router, state })
}
