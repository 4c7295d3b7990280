// src/validate.rs
//! Request validation for the sources API.
//!
//! Every string is trimmed before it is checked, and the trimmed value is what
//! gets stored. Each failing field contributes exactly one error (the first
//! rule it breaks), in body order.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;

use crate::model::{NewSource, SubmitSource};
use crate::timestamp;

pub const VIDEO_ID_LEN: usize = 11;
pub const MAX_TITLE: usize = 255;
pub const MAX_AUTHOR: usize = 100;
pub const MAX_URL: usize = 2048;
pub const MAX_DESCRIPTION: usize = 1000;

static RE_VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("video id regex"));

/// One rejected field, shaped for the 400 response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: &'static str,
    pub msg: String,
    pub location: &'static str,
}

impl FieldError {
    fn body(path: &'static str, msg: impl Into<String>) -> Self {
        Self {
            path,
            msg: msg.into(),
            location: "body",
        }
    }

    fn params(path: &'static str, msg: impl Into<String>) -> Self {
        Self {
            path,
            msg: msg.into(),
            location: "params",
        }
    }
}

pub fn is_video_id(s: &str) -> bool {
    RE_VIDEO_ID.is_match(s)
}

/// Validate the `{videoId}` path segment of `GET /api/sources/{videoId}`.
pub fn validate_video_id(raw: &str) -> Result<String, Vec<FieldError>> {
    let v = raw.trim();
    if is_video_id(v) {
        Ok(v.to_string())
    } else {
        Err(vec![FieldError::params("videoId", "Invalid YouTube video ID")])
    }
}

/// Loose URL check: http(s)/ftp, a dotted host, no whitespace.
/// A missing scheme is tolerated and read as `http://`.
pub fn is_well_formed_url(s: &str) -> bool {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    let candidate = if s.contains("://") {
        s.to_string()
    } else {
        format!("http://{s}")
    };
    let Ok(url) = Url::parse(&candidate) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https" | "ftp") {
        return false;
    }
    match url.host_str() {
        Some(host) => {
            let host = host.trim_end_matches('.');
            host.contains('.') && !host.starts_with('.') && !host.contains("..")
        }
        None => false,
    }
}

fn required<'a>(
    errors: &mut Vec<FieldError>,
    path: &'static str,
    value: Option<&'a str>,
    missing_msg: &str,
) -> Option<&'a str> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            errors.push(FieldError::body(path, missing_msg));
            None
        }
    }
}

/// `null` or a missing field is absent; any string present (even empty)
/// must match the loose pattern.
fn optional_timestamp(
    errors: &mut Vec<FieldError>,
    path: &'static str,
    value: Option<&str>,
) -> Option<String> {
    let v = value?.trim();
    if timestamp::matches_loose_pattern(v) {
        Some(v.to_string())
    } else {
        errors.push(FieldError::body(path, "Invalid timestamp format"));
        None
    }
}

/// Validate a submission body. On success the returned value is trimmed and
/// ready for storage; on failure every offending field is listed.
pub fn validate_submission(body: &SubmitSource) -> Result<NewSource, Vec<FieldError>> {
    let mut errors = Vec::new();

    let video_id = required(
        &mut errors,
        "videoId",
        body.video_id.as_deref(),
        "Video ID is required",
    );
    if let Some(v) = video_id {
        if !is_video_id(v) {
            errors.push(FieldError::body("videoId", "Invalid YouTube video ID"));
        }
    }

    let title = required(
        &mut errors,
        "title",
        body.title.as_deref(),
        "Video title is required",
    );
    if let Some(t) = title {
        if t.chars().count() > MAX_TITLE {
            errors.push(FieldError::body("title", "Title too long"));
        }
    }

    let author = required(
        &mut errors,
        "author",
        body.author.as_deref(),
        "Author is required",
    );
    if let Some(a) = author {
        if a.chars().count() > MAX_AUTHOR {
            errors.push(FieldError::body("author", "Author name too long"));
        }
    }

    let url = required(&mut errors, "url", body.url.as_deref(), "URL is required");
    if let Some(u) = url {
        if !is_well_formed_url(u) {
            errors.push(FieldError::body("url", "Invalid URL"));
        } else if u.chars().count() > MAX_URL {
            errors.push(FieldError::body("url", "URL too long"));
        }
    }

    let timestamp_from =
        optional_timestamp(&mut errors, "timestampFrom", body.timestamp_from.as_deref());
    let timestamp_to = optional_timestamp(&mut errors, "timestampTo", body.timestamp_to.as_deref());

    let description = required(
        &mut errors,
        "description",
        body.description.as_deref(),
        "Description is required",
    );
    if let Some(d) = description {
        if d.chars().count() > MAX_DESCRIPTION {
            errors.push(FieldError::body("description", "Description too long"));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // All required fields are present once `errors` is empty.
    match (video_id, title, author, url, description) {
        (Some(video_id), Some(title), Some(author), Some(url), Some(description)) => {
            Ok(NewSource {
                video_id: video_id.to_string(),
                title: title.to_string(),
                author: author.to_string(),
                url: url.to_string(),
                timestamp_from,
                timestamp_to,
                description: description.to_string(),
            })
        }
        _ => Err(vec![FieldError::body("body", "Incomplete submission")]),
    }
}
