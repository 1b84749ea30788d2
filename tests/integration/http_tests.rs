//! End-to-end tests over HTTP
//!
//! These tests use wiremock to stand up a small site, then run the real
//! client, login and renderer against it.

use link_ledger::config::{parse_config, AuthConfig, Config, UserAgentConfig};
use link_ledger::crawler::{
    build_http_client, crawl, login, HttpRenderer, Orchestrator, Renderer, VisitStatus,
};
use link_ledger::output::{CsvReportSink, ReportSink};
use link_ledger::url::CrawlRules;
use link_ledger::CrawlError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

fn renderer() -> Arc<HttpRenderer> {
    let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5))
        .expect("Failed to build client");
    Arc::new(HttpRenderer::new(client, 4))
}

fn test_config(base_url: &str, output_dir: &std::path::Path, with_auth: bool) -> Config {
    let auth = if with_auth {
        format!(
            r#"
            [auth]
            login-url = "{base}/login"
            username = "alice@site.test"
            password = "s3cret"
            failure-marker = "Invalid credentials"
            "#,
            base = base_url
        )
    } else {
        String::new()
    };

    let toml = format!(
        r#"
        [crawler]
        start-url = "{base}/"
        workers = 3
        page-timeout-secs = 5

        [output]
        directory = "{out}"

        {auth}
        "#,
        base = base_url,
        out = output_dir.display(),
        auth = auth
    );

    parse_config(&toml, |_| None).expect("Failed to parse test config")
}

#[tokio::test]
async fn test_http_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/about">About</a>
                <a href="/missing">Missing</a>
                <a href="https://external.test/page">External</a>
                <img src="/logo.png">
                <img src="/gone.png">
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(r#"<a href="/">Home</a><img src="/logo.png">"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // /missing and /gone.png fall through to wiremock's 404.

    let rules = CrawlRules::new(&format!("{}/", base_url), &[r"^.*?/logout"]).unwrap();
    let report = Orchestrator::new(rules, renderer())
        .with_workers(3)
        .run()
        .await
        .expect("Crawl failed");

    let url = |p: &str| format!("{}{}", base_url, p);

    let start = report.record(&url("/")).expect("start page recorded");
    assert_eq!(start.status, VisitStatus::Ok);
    assert_eq!(start.anchor_links, 3);
    assert_eq!(start.image_links, 2);
    assert!(start.load_time > Duration::ZERO);

    assert_eq!(report.record(&url("/about")).unwrap().status, VisitStatus::Ok);
    assert_eq!(report.record(&url("/logo.png")).unwrap().status, VisitStatus::Ok);
    assert_eq!(report.record(&url("/missing")).unwrap().status, VisitStatus::Broken);
    assert_eq!(report.record(&url("/gone.png")).unwrap().status, VisitStatus::Broken);
    assert_eq!(
        report.record("https://external.test/page").unwrap().status,
        VisitStatus::Skipped
    );

    assert_eq!(report.broken.len(), 2);
    assert_eq!(report.skipped.len(), 1);
}

#[tokio::test]
async fn test_renderer_reports_status_and_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new/"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/"))
        .respond_with(html(r#"<a href="child">child</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF".to_vec(), "application/pdf"))
        .mount(&mock_server)
        .await;

    let renderer = renderer();

    let page = renderer
        .render(&url::Url::parse(&format!("{}/old", base_url)).unwrap())
        .await
        .unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.final_url.path(), "/new/");
    assert!(page.html.contains("child"));

    let pdf = renderer
        .render(&url::Url::parse(&format!("{}/file.pdf", base_url)).unwrap())
        .await
        .unwrap();
    assert_eq!(pdf.status, 200);
    assert!(pdf.html.is_empty());

    let status = renderer
        .probe(&url::Url::parse(&format!("{}/nope.png", base_url)).unwrap())
        .await
        .unwrap();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/app/"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/app/"))
        .respond_with(html(r#"<a href="settings">Settings</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/app/settings"))
        .respond_with(html("<p>settings</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let rules = CrawlRules::new(&format!("{}/", base_url), &[] as &[&str]).unwrap();
    let report = Orchestrator::new(rules, renderer()).run().await.unwrap();

    assert_eq!(
        report
            .record(&format!("{}/app/settings", base_url))
            .unwrap()
            .status,
        VisitStatus::Ok
    );
}

#[tokio::test]
async fn test_login_then_crawl_with_session_cookie() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let out = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html(
            r#"<form action="/session" method="post">
                 <input type="hidden" name="csrf" value="tok123">
                 <input type="email" name="username">
                 <input type="password" name="password">
               </form>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_string_contains("csrf=tok123"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(
            html("<p>Welcome back</p>").insert_header("set-cookie", "session=abc; Path=/"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "session=abc"))
        .respond_with(html(r#"<a href="/reports">Reports</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .and(header("cookie", "session=abc"))
        .respond_with(html("<p>reports</p>"))
        .mount(&mock_server)
        .await;

    let config = test_config(&base_url, out.path(), true);
    let report = crawl(&config).await.expect("Crawl failed");

    assert_eq!(
        report.record(&format!("{}/", base_url)).unwrap().status,
        VisitStatus::Ok
    );
    assert_eq!(
        report
            .record(&format!("{}/reports", base_url))
            .unwrap()
            .status,
        VisitStatus::Ok
    );
    assert!(report.broken.is_empty());

    let paths = CsvReportSink::new(&config.output)
        .write_report(&report)
        .expect("Failed to write reports");
    let visited = std::fs::read_to_string(&paths[0]).unwrap();
    assert!(visited.starts_with("URL,Anchor Links,Image Links,Load Time (seconds)\n"));
    assert!(visited.contains(&format!("{}/reports,0,0,", base_url)));
}

#[tokio::test]
async fn test_login_failure_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let out = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html(
            r#"<form method="post"><input name="username"><input type="password" name="password"></form>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(html("<p>Invalid credentials</p>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>should never be reached</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&base_url, out.path(), true);
    let result = crawl(&config).await;

    assert!(matches!(result, Err(CrawlError::Auth(_))));
}

#[tokio::test]
async fn test_login_page_error_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let out = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = test_config(&base_url, out.path(), true);
    assert!(matches!(crawl(&config).await, Err(CrawlError::Auth(_))));
}

#[tokio::test]
async fn test_anonymous_crawl_without_auth_section() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let out = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/logout">Log out</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(html("<p>bye</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&base_url, out.path(), false);
    let report = crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.skipped.len(), 1);
}

#[tokio::test]
async fn test_login_page_at_site_root() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<form method="post"><input name="username"><input type="password" name="password"></form>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(html("<p>Welcome back</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5))
        .expect("Failed to build client");
    let auth = AuthConfig {
        login_url: format!("{}/", base_url),
        username_field: "username".to_string(),
        password_field: "password".to_string(),
        username: "alice@site.test".to_string(),
        password: "s3cret".to_string(),
        extra_fields: Default::default(),
        failure_marker: Some("Invalid credentials".to_string()),
    };

    login(&client, &auth).await.expect("Login at the site root failed");
}
