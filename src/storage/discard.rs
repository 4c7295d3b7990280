// src/storage/discard.rs
//! Demo backend: acknowledges submissions with fresh ids and keeps nothing.
//! The API reports `"persisted": false` for these.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::warn;

use super::{SourceStore, StorageKind, StoreError};
use crate::model::{NewSource, SourceRow};

#[derive(Debug, Default)]
pub struct DiscardStore {
    issued: AtomicI64,
}

impl DiscardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceStore for DiscardStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Discard
    }

    fn persists(&self) -> bool {
        false
    }

    async fn insert(&self, src: NewSource) -> Result<i64, StoreError> {
        let id = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            target: "storage",
            video_id = %src.video_id,
            source_id = id,
            "discard backend: submission dropped"
        );
        Ok(id)
    }

    async fn list(&self, _video_id: &str) -> Result<Vec<SourceRow>, StoreError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_but_keeps_nothing() {
        let s = DiscardStore::new();
        let src = NewSource {
            video_id: "dQw4w9WgXcQ".into(),
            title: "t".into(),
            author: "a".into(),
            url: "https://archive.is/x".into(),
            timestamp_from: None,
            timestamp_to: None,
            description: "d".into(),
        };
        assert_eq!(s.insert(src.clone()).await.unwrap(), 1);
        assert_eq!(s.insert(src).await.unwrap(), 2);
        assert!(s.list("dQw4w9WgXcQ").await.unwrap().is_empty());
        assert!(!s.persists());
    }
}
