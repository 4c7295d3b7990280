// src/overlay/client.rs
//! Thin reqwest client for the sources API.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::model::{SourceRecord, SourceRow, SubmitSource};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    InvalidBase(String),
    #[error("request rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitReceipt {
    source_id: i64,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Self::with_client(http, base)
    }

    pub fn with_client(http: Client, base: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base).map_err(|e| ClientError::InvalidBase(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBase(base.to_string()));
        }
        // keep a trailing slash so join() appends instead of replacing
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidBase(e.to_string()))
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ClientError::Rejected { status, body })
    }

    /// POST a submission; returns the new source id.
    pub async fn submit(&self, body: &SubmitSource) -> Result<i64, ClientError> {
        let url = self.endpoint("api/sources")?;
        let resp = self.http.post(url).json(body).send().await?;
        let receipt: SubmitReceipt = Self::check(resp).await?.json().await?;
        debug!(source_id = receipt.source_id, "source submitted");
        Ok(receipt.source_id)
    }

    pub async fn list(&self, video_id: &str) -> Result<Vec<SourceRow>, ClientError> {
        let mut url = self.endpoint("api/sources")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBase(self.base.to_string()))?
            .push(video_id);
        let resp = self.http.get(url).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let resp = self.http.get(self.endpoint("health")?).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Request body for a locally collected record.
pub fn submission_for(
    video_id: &str,
    title: &str,
    author: &str,
    record: &SourceRecord,
) -> SubmitSource {
    SubmitSource {
        video_id: Some(video_id.to_string()),
        title: Some(title.to_string()),
        author: Some(author.to_string()),
        url: Some(record.url.clone()),
        timestamp_from: record.timestamp_from.clone(),
        timestamp_to: record.timestamp_to.clone(),
        description: Some(record.description.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_without_trailing_slash_keeps_prefix() {
        let c = ApiClient::new("http://localhost:3000/sauce").unwrap();
        assert_eq!(
            c.endpoint("api/sources").unwrap().as_str(),
            "http://localhost:3000/sauce/api/sources"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            ApiClient::new("mailto:someone@example.com"),
            Err(ClientError::InvalidBase(_))
        ));
        assert!(matches!(ApiClient::new("nope"), Err(ClientError::InvalidBase(_))));
    }
}
