// src/origin.rs
//! Origin allow-list. Browser requests carrying an `Origin` that is not on
//! the list get 403; requests without `Origin` (curl, health checks) pass.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::api::AppState;

#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allow_any: bool,
    origins: Vec<String>,
}

impl OriginPolicy {
    pub fn new(origins: &[String]) -> Self {
        let allow_any = origins.iter().any(|o| o == "*");
        Self {
            allow_any,
            origins: origins.iter().filter(|o| *o != "*").cloned().collect(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allow_any || self.origins.iter().any(|o| o == origin.trim_end_matches('/'))
    }

    /// CORS response headers for the allowed origins.
    pub fn cors_layer(&self) -> CorsLayer {
        let base = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
        if self.allow_any {
            return base.allow_origin(Any);
        }
        let values: Vec<HeaderValue> = self
            .origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        base.allow_origin(AllowOrigin::list(values))
    }
}

pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    match origin {
        Some(o) if !state.origins.is_allowed(&o) => {
            counter!("origin_rejected_total").increment(1);
            warn!(target: "api", origin = %o, path = %req.uri().path(), "origin not allowed");
            (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "Not allowed by CORS" })),
            )
                .into_response()
        }
        _ => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_with_trailing_slash_tolerance() {
        let p = OriginPolicy::new(&["https://www.youtube.com".to_string()]);
        assert!(p.is_allowed("https://www.youtube.com"));
        assert!(p.is_allowed("https://www.youtube.com/"));
        assert!(!p.is_allowed("https://evil.example"));
        assert!(!p.is_allowed("http://www.youtube.com"));
    }

    #[test]
    fn wildcard_and_empty() {
        assert!(OriginPolicy::new(&["*".to_string()]).is_allowed("https://x.example"));
        assert!(!OriginPolicy::new(&[]).is_allowed("https://x.example"));
    }
}
