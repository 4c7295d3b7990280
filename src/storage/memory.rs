// src/storage/memory.rs
//! In-process table. Used by tests and local development; data is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use super::{SourceStore, StorageKind, StoreError};
use crate::model::{NewSource, SourceRow};

#[derive(Debug)]
struct Inner {
    rows: Vec<SourceRow>,
    next_id: i64,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Internal("memory store mutex poisoned".to_string())
}

#[async_trait]
impl SourceStore for MemoryStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    async fn insert(&self, src: NewSource) -> Result<i64, StoreError> {
        let mut g = self.inner.lock().map_err(|_| poisoned())?;
        let id = g.next_id;
        g.next_id += 1;
        g.rows.push(SourceRow::from_new(id, src, Utc::now()));
        Ok(id)
    }

    async fn list(&self, video_id: &str) -> Result<Vec<SourceRow>, StoreError> {
        let g = self.inner.lock().map_err(|_| poisoned())?;
        // Rows are appended in id order, so reverse iteration is newest first.
        Ok(g.rows
            .iter()
            .rev()
            .filter(|r| r.video_id == video_id)
            .cloned()
            .collect())
    }
}
