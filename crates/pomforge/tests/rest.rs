//! REST API integration tests with an in-memory site.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{html_with_links, FakeSite};
use pomforge::config::Settings;
use pomforge::rest::{router, AppState};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn post(site: FakeSite, dir: &TempDir, uri: &str, body: Value) -> (StatusCode, Value) {
    let settings = Settings {
        output_dir: dir.path().join("poms"),
        storage_state: dir.path().join("storageState.json"),
        content_wait_ms: 10,
        ..Settings::default()
    };
    let app = router(Arc::new(AppState {
        renderer: site.renderer(),
        settings,
    }));
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_analyze_writes_pom() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new().page(
        "https://site.test/account/settings",
        r#"<div id="root"><button data-testid="save">Save</button><input placeholder="Email"></div>"#,
    );

    let (status, body) = post(
        site,
        &dir,
        "/analyze",
        serde_json::json!({ "url": "https://site.test/account/settings" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["elements"], 2);
    let file = dir.path().join("poms/account--settings.ts");
    let pom = std::fs::read_to_string(&file).unwrap();
    assert!(pom.starts_with("// Locators for page: account--settings"));
    assert!(pom.contains("[data-testid=\"save\"]") || pom.contains("'Save'"));
}

#[tokio::test]
async fn test_analyze_output_is_relative_to_output_dir() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new().page(
        "https://site.test/login",
        r#"<div id="root"><button>Sign in</button></div>"#,
    );

    let (status, body) = post(
        site,
        &dir,
        "/analyze",
        serde_json::json!({ "url": "https://site.test/login", "output": "auth/login.ts" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(dir.path().join("poms/auth/login.ts").exists());
}

#[tokio::test]
async fn test_analyze_rejects_output_escaping_output_dir() {
    let dir = TempDir::new().unwrap();
    let outside = dir.path().join("outside.ts");
    for output in [outside.to_string_lossy().into_owned(), "../outside.ts".to_string()] {
        let site = FakeSite::new().page(
            "https://site.test/login",
            r#"<div id="root"><button>Sign in</button></div>"#,
        );
        let (status, body) = post(
            site,
            &dir,
            "/analyze",
            serde_json::json!({ "url": "https://site.test/login", "output": output }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{output}");
        assert!(body["error"].as_str().unwrap().contains("output"));
    }
    assert!(!outside.exists());
}

#[tokio::test]
async fn test_crawl_lists_pages() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page("https://site.test/", &html_with_links("Home", &["/a"]))
        .page("https://site.test/a", &html_with_links("A", &[]));

    let (status, body) = post(
        site,
        &dir,
        "/crawl",
        serde_json::json!({ "url": "https://site.test/" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["pages"],
        serde_json::json!(["https://site.test/", "https://site.test/a"])
    );
    assert_eq!(body["session"], "anonymous");
}

#[tokio::test]
async fn test_crawl_login_required_is_409() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page("https://site.test/", &html_with_links("Home", &["/signin"]))
        .page("https://site.test/signin", &html_with_links("Signin", &[]));

    let (status, body) = post(
        site,
        &dir,
        "/crawl",
        serde_json::json!({ "url": "https://site.test/" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "crawl failed");
    assert!(body["details"].as_str().unwrap().contains("/signin"));
}
