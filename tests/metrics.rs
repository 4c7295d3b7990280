// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use youtube_sauce::config::FileConfig;
use youtube_sauce::Config;

async fn build_app(metrics: bool) -> Router {
    let flag = if metrics { "1" } else { "0" };
    let cfg = Config::resolve(FileConfig::default(), |k| {
        (k == "METRICS_ENABLED").then(|| flag.to_string())
    })
    .expect("config");
    youtube_sauce::app(&cfg)
        .await
        .expect("app() should build Router in tests")
        .router
}

async fn text_of(resp: axum::response::Response) -> String {
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn metrics_endpoint_reports_submissions() {
    let app = build_app(true).await;

    let submit = Request::post("/api/sources")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"videoId":"dQw4w9WgXcQ","title":"t","author":"a","url":"https://archive.org/x","description":"d"}"#,
        ))
        .unwrap();
    let resp = app.clone().oneshot(submit).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let bad = Request::post("/api/sources")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"videoId":"nope"}"#))
        .unwrap();
    let resp = app.clone().oneshot(bad).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = text_of(resp).await;
    for needle in ["sources_submitted_total", "sources_rejected_total"] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}

#[tokio::test]
async fn metrics_route_absent_when_disabled() {
    let app = build_app(false).await;
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
