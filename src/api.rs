// src/api.rs
//! HTTP surface: submit/list sources, liveness check, optional `/metrics`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info};

use crate::config::Config;
use crate::model::{SourceRow, SubmitSource};
use crate::origin::{self, OriginPolicy};
use crate::ratelimit::{self, ClientRateLimiter};
use crate::storage::{SharedStore, StoreError};
use crate::validate::{self, FieldError};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub limiter: Arc<ClientRateLimiter>,
    pub origins: Arc<OriginPolicy>,
    pub region: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: SharedStore, cfg: &Config) -> Self {
        Self {
            store,
            limiter: Arc::new(ClientRateLimiter::new(cfg.rate_limit, cfg.trust_proxy)),
            origins: Arc::new(OriginPolicy::new(&cfg.allowed_origins)),
            region: cfg.region.as_deref().map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = state.origins.cors_layer();

    let api = Router::new()
        .route("/api/sources", post(submit_source))
        .route("/api/sources/{video_id}", get(list_sources))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::enforce,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), origin::enforce))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/* ----------------------------
Handlers
---------------------------- */

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResp {
    pub message: &'static str,
    pub source_id: i64,
    pub persisted: bool,
}

async fn submit_source(
    State(state): State<AppState>,
    body: Result<Json<SubmitSource>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResp>), ApiError> {
    let Json(body) = body.map_err(|rej| {
        counter!("sources_rejected_total").increment(1);
        ApiError::Validation(vec![FieldError {
            path: "body",
            msg: rej.body_text(),
            location: "body",
        }])
    })?;

    let src = validate::validate_submission(&body).map_err(|errs| {
        counter!("sources_rejected_total").increment(1);
        ApiError::Validation(errs)
    })?;

    let video_id = src.video_id.clone();
    let id = state
        .store
        .insert(src)
        .await
        .map_err(|e| state.storage_failure(Op::Submit, &video_id, e))?;

    let persisted = state.store.persists();
    counter!("sources_submitted_total").increment(1);
    info!(
        target: "api",
        video_id = %video_id,
        source_id = id,
        backend = %state.store.kind(),
        persisted,
        region = state.region.as_deref(),
        "source submitted"
    );

    let message = if persisted {
        "Source submitted successfully"
    } else {
        "Source accepted but not stored (discard mode)"
    };
    Ok((
        StatusCode::CREATED,
        Json(SubmitResp {
            message,
            source_id: id,
            persisted,
        }),
    ))
}

async fn list_sources(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Vec<SourceRow>>, ApiError> {
    let video_id = validate::validate_video_id(&video_id).map_err(ApiError::Validation)?;

    let rows = state
        .store
        .list(&video_id)
        .await
        .map_err(|e| state.storage_failure(Op::Fetch, &video_id, e))?;

    counter!("sources_listed_total").increment(1);
    Ok(Json(rows))
}

impl AppState {
    fn storage_failure(&self, op: Op, video_id: &str, err: StoreError) -> ApiError {
        let retryable = err.is_retryable();
        counter!("storage_errors_total", "retryable" => retryable.to_string()).increment(1);
        error!(
            target: "api",
            op = op.as_str(),
            video_id = %video_id,
            code = %err.code(),
            retryable,
            backend = %self.store.kind(),
            region = self.region.as_deref(),
            error = %err,
            cause = ?std::error::Error::source(&err).map(|s| s.to_string()),
            "storage operation failed"
        );
        ApiError::Storage { op, err }
    }
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Submit,
    Fetch,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Op::Submit => "submit",
            Op::Fetch => "fetch",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Op::Submit => "An error occurred while submitting the source",
            Op::Fetch => "An error occurred while fetching sources",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request validation failed ({} field errors)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("{} failed: {err}", .op.as_str())]
    Storage {
        op: Op,
        #[source]
        err: StoreError,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::Storage {
                err: StoreError::Unavailable { kind, .. },
                ..
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": kind.message() })),
            )
                .into_response(),
            ApiError::Storage { op, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": op.failure_message() })),
            )
                .into_response(),
        }
    }
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(target: "api", panic = %detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn api_errors_keep_their_cause() {
        let e = ApiError::Storage {
            op: Op::Fetch,
            err: StoreError::Internal("pool closed".into()),
        };
        assert_eq!(e.to_string(), "fetch failed: storage error: pool closed");
        assert!(e.source().is_some());
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let v = ApiError::Validation(vec![FieldError {
            path: "videoId",
            msg: "Invalid YouTube video ID".into(),
            location: "params",
        }]);
        assert_eq!(v.to_string(), "request validation failed (1 field errors)");
        assert_eq!(v.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
