// src/storage/mysql.rs
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};
use sqlx::MySqlPool;
use tracing::info;

use super::{rollback_logged, SourceStore, StorageKind, StoreError};
use crate::config::DatabaseConfig;
use crate::model::{NewSource, SourceRow};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    video_id VARCHAR(11) NOT NULL,
    title VARCHAR(255) NOT NULL,
    author VARCHAR(100) NOT NULL,
    url VARCHAR(2048) NOT NULL,
    timestamp_from VARCHAR(10) NULL,
    timestamp_to VARCHAR(10) NULL,
    description TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    INDEX idx_sources_video_id (video_id),
    INDEX idx_sources_created_at (created_at)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

const INSERT: &str = r#"
INSERT INTO sources (
    video_id, title, author, url, timestamp_from,
    timestamp_to, description, created_at, updated_at
) VALUES (?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
"#;

const SELECT_BY_VIDEO: &str = r#"
SELECT id, video_id, title, author, url, timestamp_from, timestamp_to,
       description, created_at, updated_at
FROM sources
WHERE video_id = ?
ORDER BY created_at DESC, id DESC
"#;

#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut opts = MySqlConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.name);
        opts = match &cfg.ssl_ca {
            Some(ca) => opts.ssl_mode(MySqlSslMode::VerifyCa).ssl_ca(ca),
            None => opts.ssl_mode(MySqlSslMode::Preferred),
        };

        let pool = MySqlPoolOptions::new()
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
            "mysql pool created"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SourceStore for MySqlStore {
    fn kind(&self) -> StorageKind {
        StorageKind::MySql
    }

    async fn insert(&self, src: NewSource) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(INSERT)
            .bind(&src.video_id)
            .bind(&src.title)
            .bind(&src.author)
            .bind(&src.url)
            .bind(&src.timestamp_from)
            .bind(&src.timestamp_to)
            .bind(&src.description)
            .execute(&mut *tx)
            .await;

        match res {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.last_insert_id() as i64)
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
        let conn = self.pool.acquire().await?;
        drop(conn);
        info!(target: "storage", "successfully connected to mysql");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(target: "storage", "mysql connections closed");
    }
}
