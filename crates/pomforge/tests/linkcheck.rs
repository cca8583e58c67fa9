//! Link checker integration tests against a mocked HTTP site.

use pomforge::error::classify;
use pomforge::linkcheck::report::{ERROR_LOG_FILE, OUTPUT_FILE};
use pomforge::linkcheck::{check_page, check_site, CheckConfig, FailurePolicy, ResourceKind};
use pomforge::PomforgeError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{body}</body></html>"))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn config(dir: &TempDir) -> CheckConfig {
    CheckConfig {
        report_dir: dir.path().to_path_buf(),
        probe_timeout_ms: 2_000,
        page_timeout_ms: 2_000,
        ..CheckConfig::default()
    }
}

#[tokio::test]
async fn test_single_page_reports_404_and_fake_image() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<a href="/ok">ok</a><a href="/missing">missing</a><img src="/banner.png">"#),
    )
    .await;
    mount(&server, "/ok", html("fine")).await;
    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount(&server, "/banner.png", html("not an image")).await;

    let dir = TempDir::new().unwrap();
    let report = check_page(&format!("{}/", server.uri()), &config(&dir))
        .await
        .unwrap();

    assert_eq!(report.total_links, 2);
    assert_eq!(report.total_images, 1);
    let broken: Vec<(&str, ResourceKind)> = report
        .broken
        .iter()
        .map(|b| (b.url.rsplit('/').next().unwrap_or_default(), b.kind))
        .collect();
    assert_eq!(broken.len(), 2);
    assert!(broken.contains(&("missing", ResourceKind::Link)));
    assert!(broken.contains(&("banner.png", ResourceKind::Image)));

    let output = std::fs::read_to_string(dir.path().join(OUTPUT_FILE)).unwrap();
    assert!(output.contains("Broken link"));
    assert!(output.contains("Broken image"));
    assert!(output.contains("Failed pages: 0"));
    assert!(!dir.path().join(ERROR_LOG_FILE).exists());
}

async fn small_site() -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<a href="/about">about</a><a href="/gone">gone</a><img src="/logo.png">"#),
    )
    .await;
    mount(&server, "/about", html(r#"<a href="/">home</a>"#)).await;
    mount(&server, "/gone", ResponseTemplate::new(500)).await;
    mount(
        &server,
        "/logo.png",
        ResponseTemplate::new(200).insert_header("content-type", "image/png"),
    )
    .await;
    server
}

#[tokio::test]
async fn test_full_scan_continues_past_failed_pages() {
    let server = small_site().await;
    let dir = TempDir::new().unwrap();

    let report = check_site(&server.uri(), &config(&dir)).await.unwrap();

    assert_eq!(report.pages_scanned, 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].url.ends_with("/gone"));
    assert_eq!(report.broken_links().count(), 1);
    assert_eq!(report.broken_images().count(), 0);

    let output = std::fs::read_to_string(dir.path().join(OUTPUT_FILE)).unwrap();
    assert!(output.contains("Failed pages: 1"));
    let errors = std::fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
    assert!(errors.contains("=== Error on page:"));
    assert!(errors.contains("/gone"));
}

#[tokio::test]
async fn test_fail_fast_flushes_and_aborts() {
    let server = small_site().await;
    let dir = TempDir::new().unwrap();
    let cfg = CheckConfig {
        policy: FailurePolicy::Stop,
        ..config(&dir)
    };

    let err = check_site(&server.uri(), &cfg).await.unwrap_err();

    assert!(matches!(
        classify(&err),
        Some(PomforgeError::PageFetch {
            status: Some(500),
            ..
        })
    ));
    assert!(dir.path().join(OUTPUT_FILE).exists());
    assert!(dir.path().join(ERROR_LOG_FILE).exists());
}

#[tokio::test]
async fn test_rejects_non_http_urls() {
    let dir = TempDir::new().unwrap();
    let err = check_page("file:///etc/passwd", &config(&dir)).await.unwrap_err();
    assert!(matches!(classify(&err), Some(PomforgeError::InvalidUrl(_))));
}
