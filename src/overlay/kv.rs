// src/overlay/kv.rs
//! Local key-value storage: video id → full list of source records.
//! Only whole-value get/set is assumed, so callers do read-modify-write.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::model::SourceRecord;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Records under `key`, or an empty list when the key was never set.
    async fn get(&self, key: &str) -> Result<Vec<SourceRecord>, KvError>;

    /// Replace the whole value under `key`.
    async fn set(&self, key: &str, value: Vec<SourceRecord>) -> Result<(), KvError>;
}

#[derive(Debug, Default)]
pub struct MemoryKv {
    map: Mutex<HashMap<String, Vec<SourceRecord>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Vec<SourceRecord>, KvError> {
        let g = self.map.lock().map_err(|_| KvError::Poisoned)?;
        Ok(g.get(key).cloned().unwrap_or_default())
    }

    async fn set(&self, key: &str, value: Vec<SourceRecord>) -> Result<(), KvError> {
        let mut g = self.map.lock().map_err(|_| KvError::Poisoned)?;
        g.insert(key.to_string(), value);
        Ok(())
    }
}

/// A single JSON object on disk, `{ "<videoId>": [records...] }`.
/// Writes go to a sibling temp file and are renamed into place.
#[derive(Debug)]
pub struct JsonFileKv {
    path: PathBuf,
    // serializes read-modify-write of the file within this process
    write_lock: tokio::sync::Mutex<()>,
}

type Snapshot = HashMap<String, Vec<SourceRecord>>;

impl JsonFileKv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Snapshot, KvError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Snapshot::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKv {
    async fn get(&self, key: &str) -> Result<Vec<SourceRecord>, KvError> {
        let mut all = self.read_all().await?;
        Ok(all.remove(key).unwrap_or_default())
    }

    async fn set(&self, key: &str, value: Vec<SourceRecord>) -> Result<(), KvError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&all)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
