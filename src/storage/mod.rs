// src/storage/mod.rs
//! Storage abstraction for submitted sources.
//!
//! The HTTP layer only sees [`SourceStore`]; which backend sits behind it is a
//! configuration choice (`STORAGE_BACKEND`).

pub mod discard;
pub mod memory;
pub mod mysql;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::model::{NewSource, SourceRow};

pub use discard::DiscardStore;
pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Accepts submissions and drops them. Demo mode only.
    Discard,
    Memory,
    MySql,
    Postgres,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Discard => "discard",
            StorageKind::Memory => "memory",
            StorageKind::MySql => "mysql",
            StorageKind::Postgres => "postgres",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            StorageKind::MySql => Some(3306),
            StorageKind::Postgres => Some(5432),
            _ => None,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" | "none" | "noop" => Ok(StorageKind::Discard),
            "memory" | "mem" => Ok(StorageKind::Memory),
            "mysql" | "mariadb" => Ok(StorageKind::MySql),
            "postgres" | "postgresql" | "pg" => Ok(StorageKind::Postgres),
            other => anyhow::bail!("unknown storage backend '{other}'"),
        }
    }
}

/// Why a backend could not serve the request right now. These map to 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    ConnectionLimit,
    ConnectionLost,
    AccessDenied,
}

impl Unavailable {
    /// Client-facing message for the 503 body.
    pub fn message(&self) -> &'static str {
        match self {
            Unavailable::ConnectionLimit => {
                "Database connection limit reached. Please try again later."
            }
            Unavailable::ConnectionLost => "Database connection was lost. Please try again.",
            Unavailable::AccessDenied => "Database access denied. Please contact support.",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Unavailable::ConnectionLimit => "CONNECTION_LIMIT",
            Unavailable::ConnectionLost => "CONNECTION_LOST",
            Unavailable::AccessDenied => "ACCESS_DENIED",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {}", .kind.message())]
    Unavailable {
        kind: Unavailable,
        #[source]
        source: sqlx::Error,
    },
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("storage error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    /// Short machine-readable code for logs: a driver SQLSTATE when there is one.
    pub fn code(&self) -> String {
        match self {
            StoreError::Unavailable { kind, source } => {
                sql_state(source).unwrap_or_else(|| kind.code().to_string())
            }
            StoreError::Database(e) => sql_state(e).unwrap_or_else(|| "DATABASE".to_string()),
            StoreError::Internal(_) => "INTERNAL".to_string(),
        }
    }
}

fn sql_state(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn classify(e: &sqlx::Error) -> Option<Unavailable> {
    match e {
        sqlx::Error::PoolTimedOut => Some(Unavailable::ConnectionLimit),
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Some(Unavailable::ConnectionLost),
        sqlx::Error::Database(db) => {
            if let Some(my) = db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                match my.number() {
                    1040 => return Some(Unavailable::ConnectionLimit),
                    1045 => return Some(Unavailable::AccessDenied),
                    _ => {}
                }
            }
            let state = db.code()?;
            classify_sql_state(&state)
        }
        _ => None,
    }
}

fn classify_sql_state(state: &str) -> Option<Unavailable> {
    match state {
        "08004" | "53300" => Some(Unavailable::ConnectionLimit),
        "57P03" => Some(Unavailable::ConnectionLost),
        s if s.starts_with("08") => Some(Unavailable::ConnectionLost),
        s if s.starts_with("28") => Some(Unavailable::AccessDenied),
        _ => None,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match classify(&e) {
            Some(kind) => StoreError::Unavailable { kind, source: e },
            None => StoreError::Database(e),
        }
    }
}

#[async_trait]
pub trait SourceStore: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// False for the discard backend: inserts are acknowledged but not kept.
    fn persists(&self) -> bool {
        true
    }

    /// Insert one row with a server-assigned `created_at`; returns the new id.
    async fn insert(&self, src: NewSource) -> Result<i64, StoreError>;

    /// All rows for `video_id`, newest first.
    async fn list(&self, video_id: &str) -> Result<Vec<SourceRow>, StoreError>;

    /// Round-trip to the backend to prove it is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Release pooled connections. Called once during shutdown.
    async fn close(&self) {}
}

pub type SharedStore = Arc<dyn SourceStore>;

/// Roll back and log instead of propagating; the caller already has the error
/// that caused the rollback.
pub(crate) async fn rollback_logged<DB: sqlx::Database>(tx: sqlx::Transaction<'_, DB>) {
    if let Err(e) = tx.rollback().await {
        error!(target: "storage", error = %e, "error rolling back transaction");
    }
}

/// Build the configured backend. Relational backends connect, bootstrap the
/// schema and verify a connection before returning.
pub async fn connect(kind: StorageKind, db: &DatabaseConfig) -> Result<SharedStore, StoreError> {
    let store: SharedStore = match kind {
        StorageKind::Discard => {
            warn!(
                target: "storage",
                "STORAGE_BACKEND=discard: submissions are acknowledged but NOT stored"
            );
            Arc::new(DiscardStore::new())
        }
        StorageKind::Memory => Arc::new(MemoryStore::new()),
        StorageKind::MySql => {
            let s = MySqlStore::connect(db).await?;
            s.ensure_schema().await?;
            Arc::new(s)
        }
        StorageKind::Postgres => {
            let s = PgStore::connect(db).await?;
            s.ensure_schema().await?;
            Arc::new(s)
        }
    };

    store.ping().await?;
    info!(target: "storage", backend = %kind, "storage ready");
    Ok(store)
}
