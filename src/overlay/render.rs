// src/overlay/render.rs
//! HTML fragments for the dropdown. All user text is escaped; links that are
//! not plain http(s)/ftp URLs are rendered as text.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;

use crate::model::SourceRecord;
use crate::validate::is_well_formed_url;

pub const EMPTY_LIST: &str =
    r#"<p class="no-sources">No sources found. Be the first to add one!</p>"#;

/// Text for the count badge on the "Sources" button; empty when there are none.
pub fn count_label(count: usize) -> String {
    if count == 0 {
        String::new()
    } else {
        count.to_string()
    }
}

fn range_label(r: &SourceRecord) -> Option<String> {
    match (r.timestamp_from.as_deref(), r.timestamp_to.as_deref()) {
        (None, None) => None,
        (from, to) => Some(format!("{} - {}", from.unwrap_or("0:00"), to.unwrap_or("end"))),
    }
}

fn safe_href(url: &str) -> Option<&str> {
    let lower = url.to_ascii_lowercase();
    let explicit_web = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("ftp://");
    (explicit_web && is_well_formed_url(url)).then_some(url)
}

pub fn render_item(r: &SourceRecord) -> String {
    let mut out = String::from(r#"<div class="sauce-item">"#);
    let text = encode_text(&r.description);
    match safe_href(&r.url) {
        Some(href) => {
            let _ = write!(
                out,
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                encode_double_quoted_attribute(href),
                text
            );
        }
        None => {
            let _ = write!(
                out,
                r#"<span class="sauce-link">{}</span> <span class="sauce-url">{}</span>"#,
                text,
                encode_text(&r.url)
            );
        }
    }
    if let Some(range) = range_label(r) {
        let _ = write!(out, r#"<span class="sauce-range">{}</span>"#, encode_text(&range));
    }
    let _ = write!(
        out,
        r#"<span class="sauce-timestamp">{}</span></div>"#,
        r.submit_time.format("%Y-%m-%d")
    );
    out
}

/// Dropdown body for a record list, in the order given.
pub fn render_list(records: &[SourceRecord]) -> String {
    if records.is_empty() {
        return EMPTY_LIST.to_string();
    }
    records.iter().map(render_item).collect()
}
