// src/storage/postgres.rs
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::info;

use super::{rollback_logged, SourceStore, StorageKind, StoreError};
use crate::config::DatabaseConfig;
use crate::model::{NewSource, SourceRow};

const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS sources (
    id BIGSERIAL PRIMARY KEY,
    video_id VARCHAR(11) NOT NULL,
    title VARCHAR(255) NOT NULL,
    author VARCHAR(100) NOT NULL,
    url VARCHAR(2048) NOT NULL,
    timestamp_from VARCHAR(10),
    timestamp_to VARCHAR(10),
    description TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_sources_video_id ON sources (video_id)",
    "CREATE INDEX IF NOT EXISTS idx_sources_created_at ON sources (created_at)",
];

const INSERT: &str = r#"
INSERT INTO sources (
    video_id, title, author, url, timestamp_from,
    timestamp_to, description, created_at, updated_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
RETURNING id
"#;

const SELECT_BY_VIDEO: &str = r#"
SELECT id, video_id, title, author, url, timestamp_from, timestamp_to,
       description, created_at, updated_at
FROM sources
WHERE video_id = $1
ORDER BY created_at DESC, id DESC
"#;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut opts = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.name);
        opts = match &cfg.ssl_ca {
            Some(ca) => opts.ssl_mode(PgSslMode::VerifyCa).ssl_root_cert(ca),
            None => opts.ssl_mode(PgSslMode::Prefer),
        };

        let pool = PgPoolOptions::new()
            .max_connections(cfg.pool_max)
            .acquire_timeout(cfg.connect_timeout)
            .idle_timeout(Some(cfg.idle_timeout))
            .connect_with(opts)
            .await?;

        info!(
            target: "storage",
            host = %cfg.host,
            port = cfg.port,
            pool_max = cfg.pool_max,
            tls_verified = cfg.ssl_ca.is_some(),
            "postgres pool created"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SourceStore for PgStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Postgres
    }

    async fn insert(&self, src: NewSource) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query_scalar::<_, i64>(INSERT)
            .bind(&src.video_id)
            .bind(&src.title)
            .bind(&src.author)
            .bind(&src.url)
            .bind(&src.timestamp_from)
            .bind(&src.timestamp_to)
            .bind(&src.description)
            .fetch_one(&mut *tx)
            .await;

        match res {
            Ok(id) => {
                tx.commit().await?;
                Ok(id)
            }
            Err(e) => {
                rollback_logged(tx).await;
                Err(e.into())
            }
        }
    }

    async fn list(&self, video_id: &str) -> Result<Vec<SourceRow>, StoreError> {
        let rows = sqlx::query_as::<_, SourceRow>(SELECT_BY_VIDEO)
            .bind(video_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        info!(target: "storage", "successfully connected to postgres");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(target: "storage", "postgres connections closed");
    }
}
