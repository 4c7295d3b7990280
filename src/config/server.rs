// src/config/server.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::StorageKind;

pub const ENV_CONFIG_PATH: &str = "SAUCE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/sauce.toml";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_WINDOW_MS: u64 = 900_000;
const DEFAULT_RATE_MAX: u32 = 100;
const DEFAULT_POOL_MAX: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// CA bundle; when set, TLS with certificate verification is required.
    pub ssl_ca: Option<PathBuf>,
    pub pool_max: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("ssl_ca", &self.ssl_ca)
            .field("pool_max", &self.pool_max)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Exact origins allowed to call the API from a browser. `*` allows any.
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageKind,
    pub database: DatabaseConfig,
    pub log_level: String,
    pub log_format: LogFormat,
    pub region: Option<String>,
    pub metrics_enabled: bool,
    /// Key the rate limiter on the first `X-Forwarded-For` hop (behind a load balancer).
    pub trust_proxy: bool,
}

/* ----------------------------
Optional TOML layer
---------------------------- */

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
    pub storage: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub region: Option<String>,
    pub metrics_enabled: Option<bool>,
    pub trust_proxy: Option<bool>,
    #[serde(default)]
    pub rate_limit: FileRateLimit,
    #[serde(default)]
    pub database: FileDatabase,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileRateLimit {
    pub window_ms: Option<u64>,
    pub max_requests: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileDatabase {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub ssl_ca: Option<PathBuf>,
    pub pool_max: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// 1) $SAUCE_CONFIG_PATH (must exist)
    /// 2) config/sauce.toml
    /// 3) nothing (env + defaults only)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }
}

/* ----------------------------
Resolution: env > file > defaults
---------------------------- */

fn parse_env<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    match raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {name}='{s}': {e}")),
    }
}

fn parse_flag(raw: Option<String>) -> Option<bool> {
    raw.map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "compact" | "pretty" | "text" => Ok(LogFormat::Compact),
        other => bail!("invalid LOG_FORMAT='{other}' (expected json|compact)"),
    }
}

impl Config {
    /// Load `.env`-populated process env on top of the optional TOML file.
    pub fn load() -> Result<Self> {
        let file = FileConfig::load_default()?;
        Self::resolve(file, |k| std::env::var(k).ok())
    }

    /// Pure resolution step; `env` is a lookup so tests need not touch the process env.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_env::<u16>("PORT", env("PORT"))?
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);

        let allowed_origins = match env("ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw),
            None => file
                .allowed_origins
                .map(|v| parse_origins(&v.join(",")))
                .unwrap_or_default(),
        };

        let window_ms = parse_env::<u64>("RATE_LIMIT_WINDOW_MS", env("RATE_LIMIT_WINDOW_MS"))?
            .or(file.rate_limit.window_ms)
            .unwrap_or(DEFAULT_RATE_WINDOW_MS);
        let max_requests =
            parse_env::<u32>("RATE_LIMIT_MAX_REQUESTS", env("RATE_LIMIT_MAX_REQUESTS"))?
                .or(file.rate_limit.max_requests)
                .unwrap_or(DEFAULT_RATE_MAX);
        if window_ms == 0 || max_requests == 0 {
            bail!("rate limit window and max requests must both be > 0");
        }

        let storage: StorageKind = match env("STORAGE_BACKEND").or(file.storage) {
            Some(s) => s.parse().context("STORAGE_BACKEND")?,
            None => StorageKind::Memory,
        };

        let fdb = file.database;
        let db_port = parse_env::<u16>("DB_PORT", env("DB_PORT"))?
            .or(fdb.port)
            .or(storage.default_port())
            .unwrap_or(0);
        let database = DatabaseConfig {
            host: env("DB_HOST").or(fdb.host).unwrap_or_default(),
            port: db_port,
            user: env("DB_USER").or(fdb.user).unwrap_or_default(),
            password: env("DB_PASSWORD").or(fdb.password).unwrap_or_default(),
            name: env("DB_NAME").or(fdb.name).unwrap_or_default(),
            ssl_ca: env("SSL_CA")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .or(fdb.ssl_ca),
            pool_max: parse_env::<u32>("DB_POOL_MAX", env("DB_POOL_MAX"))?
                .or(fdb.pool_max)
                .unwrap_or(DEFAULT_POOL_MAX)
                .max(1),
            connect_timeout: Duration::from_millis(
                parse_env::<u64>("DB_CONNECT_TIMEOUT_MS", env("DB_CONNECT_TIMEOUT_MS"))?
                    .or(fdb.connect_timeout_ms)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
            idle_timeout: Duration::from_millis(
                fdb.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS),
            ),
        };

        if matches!(storage, StorageKind::MySql | StorageKind::Postgres) {
            for (name, value) in [
                ("DB_HOST", &database.host),
                ("DB_USER", &database.user),
                ("DB_NAME", &database.name),
            ] {
                if value.trim().is_empty() {
                    bail!("{name} is required for STORAGE_BACKEND={storage}");
                }
            }
        }

        let log_level = env("LOG_LEVEL")
            .or(file.log_level)
            .or_else(|| env("RUST_LOG"))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        let log_format = match env("LOG_FORMAT").or(file.log_format) {
            Some(s) => parse_log_format(&s)?,
            None => LogFormat::Json,
        };

        let region = env("AWS_REGION")
            .or(file.region)
            .filter(|s| !s.trim().is_empty());
        let metrics_enabled = parse_flag(env("METRICS_ENABLED"))
            .or(file.metrics_enabled)
            .unwrap_or(false);
        let trust_proxy = parse_flag(env("TRUST_PROXY"))
            .or(file.trust_proxy)
            .unwrap_or(false);

        Ok(Self {
            port,
            allowed_origins,
            rate_limit: RateLimitConfig {
                window: Duration::from_millis(window_ms),
                max_requests,
            },
            storage,
            database,
            log_level,
            log_format,
            region,
            metrics_enabled,
            trust_proxy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env_or_file() {
        let cfg = Config::resolve(FileConfig::default(), env_of(&[])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.storage, StorageKind::Memory);
        assert_eq!(cfg.rate_limit.window, Duration::from_millis(900_000));
        assert_eq!(cfg.rate_limit.max_requests, 100);
        assert!(cfg.allowed_origins.is_empty());
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert!(!cfg.metrics_enabled);
    }

    #[test]
    fn env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
port = 8080
allowed_origins = ["https://a.example"]
[rate_limit]
max_requests = 5
"#,
        )
        .unwrap();
        let cfg = Config::resolve(
            file,
            env_of(&[
                ("PORT", "9090"),
                ("ALLOWED_ORIGINS", " https://www.youtube.com/ , ,moz-extension://abc"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.rate_limit.max_requests, 5);
        assert_eq!(
            cfg.allowed_origins,
            vec!["https://www.youtube.com", "moz-extension://abc"]
        );
    }

    #[test]
    fn relational_backend_needs_connection_details() {
        let err = Config::resolve(
            FileConfig::default(),
            env_of(&[("STORAGE_BACKEND", "postgres"), ("DB_HOST", "db")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("DB_USER"), "{err}");

        let cfg = Config::resolve(
            FileConfig::default(),
            env_of(&[
                ("STORAGE_BACKEND", "mysql"),
                ("DB_HOST", "db"),
                ("DB_USER", "u"),
                ("DB_NAME", "sauce"),
                ("DB_PASSWORD", "hunter2"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.database.port, 3306);
        assert!(!format!("{:?}", cfg.database).contains("hunter2"));
    }

    #[test]
    fn rejects_garbage_numbers() {
        assert!(Config::resolve(FileConfig::default(), env_of(&[("PORT", "http")])).is_err());
        assert!(Config::resolve(
            FileConfig::default(),
            env_of(&[("RATE_LIMIT_MAX_REQUESTS", "0")])
        )
        .is_err());
    }
}
