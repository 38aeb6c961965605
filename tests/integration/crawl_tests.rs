//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive full crawl
//! sessions through the public `Crawler` handle.

use std::time::Duration;
use sumi_trawl::config::Config;
use sumi_trawl::crawler::{CrawlRequest, Crawler};
use sumi_trawl::state::{ErrorClass, PageOutcome};
use sumi_trawl::{SessionError, SessionStatus};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound on any single session in these tests
const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a test configuration with no delay and no files written
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.delay_seconds = 0.0;
    config.fetcher.timeout_seconds = 5;
    config.output.write_results = false;
    config
}

/// A 200 response carrying UTF-8 HTML
fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(body.as_bytes().to_vec())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

/// Waits for the session to finish, failing the test if it hangs
async fn finish(crawler: &Crawler) -> SessionStatus {
    tokio::time::timeout(SESSION_TIMEOUT, crawler.wait())
        .await
        .expect("crawl session did not finish in time")
}

fn request(seed: &str, max_pages: usize, same_origin_only: bool) -> CrawlRequest {
    CrawlRequest {
        seed: seed.to_string(),
        max_pages,
        delay_seconds: 0.0,
        same_origin_only,
    }
}

#[tokio::test]
async fn test_same_origin_policy() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><head><title>A</title></head><body>
            <a href="/b">Page B</a>
            <a href="{}/x">Elsewhere</a>
            </body></html>"#,
            other.uri()
        ),
    )
    .await;
    mount_page(&server, "/b", "<html><title>B</title></html>").await;

    // The other origin must never be contacted
    Mock::given(method("GET"))
        .respond_with(html_page("<title>X</title>"))
        .expect(0)
        .mount(&other)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", base), 10, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let results = crawler.results();
    let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/b", base), format!("{}/", base)]);

    // Both links are recorded on the seed page even though only one is followed
    let seed = &results[1];
    assert_eq!(seed.links.len(), 2);
    assert_eq!(seed.links[0].url, format!("{}/b", base));
    assert_eq!(seed.links[0].anchor_text, "Page B");

    let stats = crawler.stats();
    assert_eq!(stats.pages_crawled, 2);
    assert_eq!(stats.total_links, 2);
    assert_eq!(stats.total_errors(), 0);
}

#[tokio::test]
async fn test_offsite_links_followed_when_allowed() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;

    mount_page(
        &server,
        "/",
        &format!(r#"<a href="{}/x">Elsewhere</a>"#, other.uri()),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html_page("<title>X</title>"))
        .expect(1)
        .mount(&other)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler
        .start_with(request(&format!("{}/", server.uri()), 10, false))
        .unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);
    assert_eq!(crawler.stats().pages_crawled, 2);
    assert_eq!(crawler.results()[0].title, "X");
}

#[tokio::test]
async fn test_max_pages_bound() {
    let server = MockServer::start().await;

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{}">Page {}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &format!("<html><body>{}</body></html>", links)).await;

    Mock::given(method("GET"))
        .respond_with(html_page("<title>Leaf</title>"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 3, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let status = crawler.status();
    assert_eq!(status.stats.pages_crawled, 3);
    assert_eq!(status.current_message, "Completed: 3 pages");
    assert_eq!(crawler.results().len(), 3);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_no_url_fetched_twice() {
    let server = MockServer::start().await;

    // Pages link back to each other, to themselves and to fragment variants
    let body = r##"
        <a href="/">Home</a>
        <a href="/#top">Home top</a>
        <a href="/a">A</a>
        <a href="/a#section">A section</a>
        <a href="/b">B</a>
    "##;

    for route in ["/", "/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html_page(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 10, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let mut urls: Vec<_> = crawler.results().into_iter().map(|r| r.url).collect();
    let total = urls.len();
    urls.sort();
    urls.dedup();

    assert_eq!(total, 3);
    assert_eq!(urls.len(), 3);
}

#[tokio::test]
async fn test_breadth_first_and_most_recent_first() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", r#"<a href="/a/deep">Deep</a>"#).await;
    mount_page(&server, "/b", "<title>B</title>").await;
    mount_page(&server, "/a/deep", "<title>Deep</title>").await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", base), 10, 0.0).unwrap();
    finish(&crawler).await;

    let urls: Vec<_> = crawler.results().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/a/deep", base),
            format!("{}/b", base),
            format!("{}/a", base),
            format!("{}/", base),
        ]
    );
}

#[tokio::test]
async fn test_invalid_gbk_bytes_still_succeed() {
    let server = MockServer::start().await;

    let mut body = b"<html><head><title>Mixed</title></head><body><p>".to_vec();
    // 0x81 0x7F is not a valid GBK sequence
    body.extend_from_slice(&[0x81, 0x7F, 0xFF, 0xFE]);
    body.extend_from_slice(b" trailing paragraph text</p></body></html>");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", "text/html; charset=gbk"),
        )
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 1, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let results = crawler.results();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    assert_eq!(results[0].title, "Mixed");
    assert_eq!(crawler.stats().other_errors, 0);
}

#[tokio::test]
async fn test_gbk_page_decoded() {
    let server = MockServer::start().await;

    let mut body = b"<html><head><title>".to_vec();
    // "中文" in GBK
    body.extend_from_slice(&[0xD6, 0xD0, 0xCE, 0xC4]);
    body.extend_from_slice(b"</title></head></html>");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("content-type", "text/html; charset=GBK"),
        )
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 1, 0.0).unwrap();
    finish(&crawler).await;

    let record = &crawler.results()[0];
    assert_eq!(record.title, "中文");
    assert_eq!(
        record.outcome,
        PageOutcome::Success {
            encoding: "GBK".to_string(),
            lossy_decode: false,
        }
    );
}

#[tokio::test]
async fn test_title_whitespace_trimmed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><head><title>  Hello   </title></head><body></body></html>",
    )
    .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 1, 0.0).unwrap();
    finish(&crawler).await;

    assert_eq!(crawler.results()[0].title, "Hello");
}

#[tokio::test]
async fn test_page_content_extracted() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head>
            <title>Content</title>
            <meta name="description" content="A test page">
            <script>document.write('<a href="/hidden">hidden</a>');</script>
            <style>.banner { display: none; }</style>
        </head><body>
            <h1>Welcome</h1>
            <p>This paragraph is long enough to be kept.</p>
            <p>Tiny</p>
            <img src="/logo.png" alt="Logo">
        </body></html>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html_page("<title>Hidden</title>"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 5, 0.0).unwrap();
    finish(&crawler).await;

    let results = crawler.results();
    assert_eq!(results.len(), 1);

    let record = &results[0];
    assert!(record.links.is_empty());
    assert_eq!(record.meta_tags["description"], "A test page");
    assert_eq!(record.headings, vec!["Welcome"]);
    assert_eq!(
        record.text_fragments,
        vec!["This paragraph is long enough to be kept."]
    );
    assert_eq!(record.images.len(), 1);
    assert_eq!(record.images[0].src, "/logo.png");
    assert_eq!(record.images[0].alt, "Logo");
    assert_eq!(
        record.text_preview(),
        "This paragraph is long enough to be kept."
    );
    assert_eq!(crawler.stats().total_images, 1);
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/"))
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", r#"<a href="page">Relative</a>"#).await;
    mount_page(&server, "/docs/page", "<title>Docs page</title>").await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/start", base), 5, 0.0).unwrap();
    finish(&crawler).await;

    let results = crawler.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, format!("{}/docs/page", base));
    assert_eq!(results[0].title, "Docs page");
    assert_eq!(results[1].url, format!("{}/start", base));
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<title>Slow</title>").set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&seed, 1, 0.0).unwrap();

    let err = crawler.start("http://other.test/", 1, 0.0).unwrap_err();
    assert!(matches!(err, SessionError::AlreadyRunning));

    let status = crawler.status();
    assert!(status.running);
    assert_eq!(status.current_target.as_deref(), Some(seed.as_str()));

    assert_eq!(finish(&crawler).await, SessionStatus::Done);
    assert_eq!(crawler.results().len(), 1);
    assert_eq!(crawler.results()[0].url, seed);
}

#[tokio::test]
async fn test_clear() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(r#"<a href="/a">A</a>"#).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    mount_page(&server, "/a", "<title>A</title>").await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 5, 0.0).unwrap();

    // Rejected while running
    assert!(matches!(
        crawler.clear(),
        Err(SessionError::ClearWhileRunning)
    ));

    finish(&crawler).await;
    assert_eq!(crawler.results().len(), 2);

    crawler.clear().unwrap();

    let status = crawler.status();
    assert!(crawler.results().is_empty());
    assert!(status.stats.is_empty());
    assert_eq!(status.state, SessionStatus::Idle);
    assert_eq!(status.current_message, "Ready");
}

#[tokio::test]
async fn test_restart_after_finish_resets_stats() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<title>Only</title>").await;

    let seed = format!("{}/", server.uri());
    let crawler = Crawler::new(create_test_config()).unwrap();

    crawler.start(&seed, 1, 0.0).unwrap();
    finish(&crawler).await;
    crawler.start(&seed, 1, 0.0).unwrap();
    finish(&crawler).await;

    // Statistics belong to the latest session; records accumulate until cleared
    assert_eq!(crawler.stats().pages_crawled, 1);
    assert_eq!(crawler.results().len(), 2);
}

#[tokio::test]
async fn test_seed_without_scheme() {
    let crawler = Crawler::new(create_test_config()).unwrap();

    let err = crawler.start("example.com/index.html", 5, 0.0).unwrap_err();
    assert!(matches!(err, SessionError::InvalidSeed(_)));

    let status = crawler.status();
    assert!(!status.running);
    assert_eq!(status.state, SessionStatus::Error);
    assert_eq!(status.stats.pages_crawled, 0);
    assert!(crawler.results().is_empty());
}

#[tokio::test]
async fn test_http_errors_do_not_abort() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/missing">Missing</a><a href="/broken">Broken</a><a href="/ok">OK</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<title>OK</title>").await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 10, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let stats = crawler.stats();
    assert_eq!(stats.pages_crawled, 4);
    assert_eq!(stats.http_errors, 2);

    let results = crawler.results();
    let missing = results
        .iter()
        .find(|r| r.url.ends_with("/missing"))
        .unwrap();
    assert_eq!(missing.error_class(), Some(ErrorClass::Http));
    assert!(matches!(
        &missing.outcome,
        PageOutcome::Failed { error, .. } if error.contains("404")
    ));
}

#[tokio::test]
async fn test_seed_http_error_ends_in_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler.start(&format!("{}/", server.uri()), 5, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Error);

    let status = crawler.status();
    assert!(status.current_message.starts_with("Error: "));
    assert_eq!(status.stats.http_errors, 1);
    assert_eq!(crawler.results().len(), 1);
}

#[tokio::test]
async fn test_transport_error_counted() {
    let server = MockServer::start().await;

    // Nothing listens on port 1
    mount_page(&server, "/", r#"<a href="http://127.0.0.1:1/x">Dead</a>"#).await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler
        .start_with(request(&format!("{}/", server.uri()), 5, false))
        .unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let stats = crawler.stats();
    assert_eq!(stats.pages_crawled, 2);
    assert_eq!(stats.url_errors, 1);
    assert_eq!(
        crawler.results()[0].error_class(),
        Some(ErrorClass::Transport)
    );
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/big">Big</a>"#).await;
    let big = format!("<title>Big</title><p>{}</p>", "x".repeat(4096));
    mount_page(&server, "/big", &big).await;

    let mut config = create_test_config();
    config.fetcher.max_body_bytes = 1024;

    let crawler = Crawler::new(config).unwrap();
    crawler.start(&format!("{}/", server.uri()), 5, 0.0).unwrap();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let stats = crawler.stats();
    assert_eq!(stats.pages_crawled, 2);
    assert_eq!(stats.other_errors, 1);

    let results = crawler.results();
    assert_eq!(results[0].error_class(), Some(ErrorClass::Other));
    assert!(matches!(
        &results[0].outcome,
        PageOutcome::Failed { error, .. } if error.contains("exceeds 1024 bytes")
    ));
    assert!(results[1].is_success());
}

#[tokio::test]
async fn test_stop_halts_crawl() {
    let server = MockServer::start().await;

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">Page {}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    Mock::given(method("GET"))
        .respond_with(html_page("<title>Leaf</title>"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler
        .start(&format!("{}/", server.uri()), 21, 0.5)
        .unwrap();

    // Wait for the seed record, then stop during the politeness delay
    tokio::time::timeout(SESSION_TIMEOUT, async {
        while crawler.results().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    crawler.stop();

    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    let status = crawler.status();
    assert_eq!(status.current_message, "Stopped");
    assert!(!status.running);
    assert!(crawler.results().len() < 21);
}

#[tokio::test]
async fn test_stop_reaches_session_while_waiting() {
    let server = MockServer::start().await;

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">Page {}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    Mock::given(method("GET"))
        .respond_with(html_page("<title>Leaf</title>"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    crawler
        .start(&format!("{}/", server.uri()), 21, 0.3)
        .unwrap();

    // Another task is already blocked on the worker when the stop arrives
    let waiter = crawler.clone();
    let pending = tokio::spawn(async move { waiter.wait().await });

    tokio::time::timeout(SESSION_TIMEOUT, async {
        while crawler.results().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    crawler.stop();

    let final_state = tokio::time::timeout(SESSION_TIMEOUT, pending)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(final_state, SessionStatus::Done);

    let status = crawler.status();
    assert_eq!(status.current_message, "Stopped");
    assert!(crawler.results().len() < 21);
}

#[tokio::test]
async fn test_report_and_assets_written() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <a href="/next">Next</a>
            <img src="/logo.png" alt="Logo">
            <img src="data:image/gif;base64,R0lGOD">
        </body></html>"#,
    )
    .await;
    mount_page(&server, "/next", "<title>Next</title>").await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4E, 0x47]))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.output.output_dir = dir.path().to_path_buf();
    config.output.write_results = true;
    config.output.save_pages = true;
    config.output.download_images = true;

    let crawler = Crawler::new(config).unwrap();
    crawler.start(&format!("{}/", base), 5, 0.0).unwrap();
    assert_eq!(finish(&crawler).await, SessionStatus::Done);

    // Report: crawl order, statistics, base URL
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("results.json")).unwrap())
            .unwrap();
    assert_eq!(report["baseUrl"], format!("{}/", base));
    assert_eq!(report["statistics"]["pagesCrawled"], 2);
    assert_eq!(report["statistics"]["imagesDownloaded"], 1);
    assert_eq!(report["pages"][0]["url"], format!("{}/", base));
    assert_eq!(report["pages"][0]["status"], "success");
    assert_eq!(report["pages"][0]["savedFile"], "page_001.html");
    assert_eq!(report["pages"][1]["url"], format!("{}/next", base));
    assert!(report["elapsedSeconds"].is_number());

    // Saved pages
    let saved = std::fs::read_to_string(dir.path().join("pages").join("page_001.html")).unwrap();
    assert!(saved.starts_with(&format!("<!-- URL: {}/ -->", base)));
    assert!(dir.path().join("pages").join("page_002.html").exists());

    // Downloaded images
    let images: Vec<_> = std::fs::read_dir(dir.path().join("images"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(images.len(), 1);
    assert!(images[0].ends_with(".png"));

    let seed = crawler
        .results()
        .into_iter()
        .find(|r| r.title == "Home")
        .unwrap();
    assert_eq!(seed.downloaded_images, images);
}
