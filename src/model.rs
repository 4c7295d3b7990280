// src/model.rs
//! Shared data types: the client-side source record, the API request body,
//! the validated insert payload and the stored row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One citation as kept in the overlay's local key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub url: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_to: Option<String>,
    // older stored lists used `timestamp`
    #[serde(alias = "timestamp")]
    pub submit_time: DateTime<Utc>,
}

/// Body of `POST /api/sources`. Everything is optional at the serde level so
/// that missing fields surface as field errors, not as a JSON rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSource {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_to: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A submission that passed request validation; trimmed and ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSource {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub timestamp_from: Option<String>,
    pub timestamp_to: Option<String>,
    pub description: String,
}

/// A row of the `sources` table, serialized with its column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceRow {
    pub id: i64,
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub timestamp_from: Option<String>,
    pub timestamp_to: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceRow {
    pub fn from_new(id: i64, src: NewSource, now: DateTime<Utc>) -> Self {
        Self {
            id,
            video_id: src.video_id,
            title: src.title,
            author: src.author,
            url: src.url,
            timestamp_from: src.timestamp_from,
            timestamp_to: src.timestamp_to,
            description: src.description,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reads_legacy_timestamp_field() {
        let json = r#"{"url":"https://archive.is/x","description":"mirror","timestamp":"2024-03-01T10:00:00Z"}"#;
        let r: SourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.url, "https://archive.is/x");
        assert!(r.timestamp_from.is_none());

        let out = serde_json::to_value(&r).unwrap();
        assert!(out.get("submitTime").is_some());
        assert!(out.get("timestampFrom").is_none());
    }

    #[test]
    fn submit_body_tolerates_missing_fields() {
        let b: SubmitSource = serde_json::from_str(r#"{"videoId":"abc"}"#).unwrap();
        assert_eq!(b.video_id.as_deref(), Some("abc"));
        assert!(b.title.is_none());
    }
}
