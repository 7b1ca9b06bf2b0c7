//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full mirroring cycle end-to-end.

use futures::future::BoxFuture;
use site_mirror::config::{Config, CrawlSettings};
use site_mirror::crawler::extract_css_references;
use site_mirror::logging::{RecordingLogger, Severity};
use site_mirror::storage::{DiskStore, FileStore, StorageResult};
use site_mirror::{Coordinator, MirrorError, RunSummary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates test settings for the given base URL and output root
fn create_test_settings(base_url: &str, output: &Path, workers: usize) -> CrawlSettings {
    let mut config = Config::default();
    config.site.base_url = Some(base_url.to_string());
    config.output.directory = output.to_path_buf();
    config.crawler.workers = workers;
    config.http.request_timeout = 5;
    CrawlSettings::from_config(&config).expect("test settings should be valid")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn run_with(
    settings: CrawlSettings,
    store: Arc<dyn FileStore>,
) -> (RunSummary, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::new());
    let coordinator =
        Coordinator::new(settings, logger.clone(), store).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Run should complete");
    (summary, logger)
}

#[tokio::test]
async fn test_mirror_single_domain() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/about">About</a> <a href="https://other.test/">Elsewhere</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>No further links</p>"))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, logger) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.downloads, 2);
    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    assert!(output.path().join("index.html").is_file());
    assert!(output.path().join("about").is_file());

    // The cross-domain link is dropped, never fetched
    assert_eq!(logger.count_matching(Severity::Insignificant, "other.test"), 1);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_auxiliary_resources_are_fetched_not_followed() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<img src="/img/logo.png"><script src="/js/app.js"></script>
               <a href="/files/report.pdf">Report</a>"#,
        ))
        .mount(&mock_server)
        .await;

    // Auxiliary bodies look like HTML but must not be parsed
    for resource in ["/img/logo.png", "/js/app.js", "/files/report.pdf"] {
        Mock::given(method("GET"))
            .and(path(resource))
            .respond_with(html(r#"<a href="/never">never</a>"#))
            .mount(&mock_server)
            .await;
    }

    let settings = create_test_settings(&mock_server.uri(), output.path(), 4);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.downloads, 4);
    assert!(output.path().join("img").join("logo.png").is_file());
    assert!(output.path().join("js").join("app.js").is_file());
    assert!(output.path().join("files").join("report.pdf").is_file());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/never"));
}

#[tokio::test]
async fn test_stylesheet_query_variants_get_distinct_files() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<link rel="stylesheet" href="/css/site.css">"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "a { background: url('img.png?v=1'); }\r\nb { background: url('img.png?v=2'); }\nc { background: url(plain.gif); }\n",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/img.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNG".to_vec()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/plain.gif"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"GIF".to_vec()))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);

    let css_dir = output.path().join("css");
    let stylesheet = std::fs::read_to_string(css_dir.join("site.css")).unwrap();

    // Line endings survive the rewrite
    assert_eq!(stylesheet.matches("\r\n").count(), 1);
    assert_eq!(stylesheet.matches('\n').count(), 3);

    let references: Vec<String> = stylesheet
        .lines()
        .flat_map(|line| extract_css_references(line))
        .map(|r| r.raw)
        .collect();
    assert_eq!(references.len(), 3);

    let first = references[0].split('?').next().unwrap().to_string();
    let second = references[1].split('?').next().unwrap().to_string();
    assert_ne!(first, second);
    assert!(first.starts_with("img_") && first.ends_with(".png"));
    assert!(references[0].ends_with("?v=1"));
    assert!(references[1].ends_with("?v=2"));
    assert_eq!(references[2], "plain.gif");

    assert!(css_dir.join(&first).is_file());
    assert!(css_dir.join(&second).is_file());
    assert!(css_dir.join("plain.gif").is_file());

    // Both query variants were fetched
    let requests = mock_server.received_requests().await.unwrap();
    let image_requests = requests
        .iter()
        .filter(|r| r.url.path() == "/css/img.png")
        .count();
    assert_eq!(image_requests, 2);
}

/// Records when each request arrives and delays every response
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    root_body: String,
    delay: Duration,
}

impl Respond for ArrivalRecorder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());

        let body = if request.url.path() == "/" {
            self.root_body.clone()
        } else {
            "<html><body>leaf</body></html>".to_string()
        };

        ResponseTemplate::new(200)
            .set_body_string(body)
            .set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_rounds_are_bounded_by_worker_count() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let delay = Duration::from_millis(400);

    let links: String = (0..7)
        .map(|i| format!(r#"<a href="/page{}">{}</a>"#, i, i))
        .collect();

    Mock::given(method("GET"))
        .respond_with(ArrivalRecorder {
            arrivals: Arc::clone(&arrivals),
            root_body: format!("<html><body>{}</body></html>", links),
            delay,
        })
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 3);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.downloads, 8);
    assert_eq!(summary.rounds, 4);

    // Group arrivals separated by less than half the response delay
    let arrivals = arrivals.lock().unwrap().clone();
    let mut clusters: Vec<usize> = Vec::new();
    let mut previous: Option<Instant> = None;
    for arrival in arrivals {
        match previous {
            Some(p) if arrival.duration_since(p) < delay / 2 => {
                if let Some(last) = clusters.last_mut() {
                    *last += 1;
                }
            }
            _ => clusters.push(1),
        }
        previous = Some(arrival);
    }

    assert_eq!(clusters, vec![1, 3, 3, 1]);
}

#[tokio::test]
async fn test_timeout_without_retry_records_one_error() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut settings = create_test_settings(&mock_server.uri(), output.path(), 1);
    settings.request_timeout_secs = 1;
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.downloads, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("timed out"));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_timeout_with_retry_requeues_until_ceiling() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut settings = create_test_settings(&mock_server.uri(), output.path(), 1);
    settings.request_timeout_secs = 1;
    settings.retry_on_timeout = true;
    settings.max_timeout_retries = Some(2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    // One original attempt plus two requeues
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    let requeues = summary.warnings.iter().filter(|w| w.contains("requeued")).count();
    assert_eq!(requeues, 2);

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("giving up after 3 attempts"));
}

/// File store that counts writes per destination
#[derive(Default)]
struct CountingStore {
    inner: DiskStore,
    saves: Mutex<HashMap<PathBuf, usize>>,
}

impl FileStore for CountingStore {
    fn save_file<'a>(
        &'a self,
        contents: Vec<u8>,
        destination: &'a Path,
    ) -> BoxFuture<'a, StorageResult<()>> {
        *self
            .saves
            .lock()
            .unwrap()
            .entry(destination.to_path_buf())
            .or_insert(0) += 1;
        self.inner.save_file(contents, destination)
    }

    fn ensure_root<'a>(&'a self, root: &'a Path) -> BoxFuture<'a, StorageResult<()>> {
        self.inner.ensure_root(root)
    }
}

#[tokio::test]
async fn test_same_destination_written_once() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/dup/file.txt">one</a> <a href="/dup//file.txt">two</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("same content"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(CountingStore::default());
    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, store.clone()).await;

    // Both URLs were fetched but only one write reached the store
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    let destination = output.path().join("dup").join("file.txt");
    let saves = store.saves.lock().unwrap();
    assert_eq!(saves.get(&destination), Some(&1));
    assert!(saves.values().all(|count| *count == 1));

    assert_eq!(summary.downloads, 2);
    let duplicates = summary.warnings.iter().filter(|w| w.contains("already written")).count();
    assert_eq!(duplicates, 1);
}

#[tokio::test]
async fn test_http_error_is_recorded() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/missing">gone</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.downloads, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("HTTP 404"));
    assert!(!output.path().join("missing").exists());
}

#[tokio::test]
async fn test_off_domain_redirect_is_not_followed() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/go">go</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://other.test/landing"),
        )
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.downloads, 1);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].contains("other.test"));
}

#[tokio::test]
async fn test_unwritable_output_root_fails_fast() {
    let mock_server = MockServer::start().await;
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let output = blocker.path().join("mirror");

    let settings = create_test_settings(&mock_server.uri(), &output, 1);
    let coordinator = Coordinator::new(
        settings,
        Arc::new(RecordingLogger::new()),
        Arc::new(DiskStore::new()),
    )
    .unwrap();

    let result = coordinator.run().await;
    assert!(matches!(result, Err(MirrorError::Storage(_))));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/guide">Guide</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/manual/"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/manual/"))
        .respond_with(html(r#"<a href="intro.html">Intro</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/manual/intro.html"))
        .respond_with(html("intro"))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    assert_eq!(summary.downloads, 3);
    assert!(output.path().join("manual").join("intro.html").is_file());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().any(|r| r.url.path() == "/manual/intro.html"));
    assert!(requests.iter().all(|r| r.url.path() != "/intro.html"));
}

#[tokio::test]
async fn test_stylesheet_rewrite_preserves_non_utf8_bytes() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<link rel="stylesheet" href="/css/site.css">"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(
            b"/* caf\xe9 */\na { background: url('i.png?v=1'); }\n".to_vec(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/i.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNG".to_vec()))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;
    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);

    let written = std::fs::read(output.path().join("css").join("site.css")).unwrap();
    assert!(written.starts_with(b"/* caf\xe9 */\na { background: url('i_"));
    assert!(written.ends_with(b".png?v=1'); }\n"));
}

/// Serves a page, its stylesheet, and an image whose first request stalls
struct StallingImage {
    image_requests: AtomicUsize,
    stall: Duration,
}

impl Respond for StallingImage {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        match request.url.path() {
            "/" => html(r#"<link rel="stylesheet" href="/css/site.css">"#),
            "/css/site.css" => ResponseTemplate::new(200)
                .set_body_string("a { background: url('img.png?v=1'); }\n"),
            "/css/img.png" => {
                let response = ResponseTemplate::new(200).set_body_bytes(b"PNG".to_vec());
                if self.image_requests.fetch_add(1, Ordering::SeqCst) == 0 {
                    response.set_delay(self.stall)
                } else {
                    response
                }
            }
            _ => ResponseTemplate::new(404),
        }
    }
}

#[tokio::test]
async fn test_retried_variant_keeps_derived_destination() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(StallingImage {
            image_requests: AtomicUsize::new(0),
            stall: Duration::from_secs(3),
        })
        .mount(&mock_server)
        .await;

    let mut settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    settings.request_timeout_secs = 1;
    settings.retry_on_timeout = true;
    settings.max_timeout_retries = Some(2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    let requeues = summary.warnings.iter().filter(|w| w.contains("requeued")).count();
    assert_eq!(requeues, 1);

    let css_dir = output.path().join("css");
    let stylesheet = std::fs::read_to_string(css_dir.join("site.css")).unwrap();
    let references: Vec<String> = extract_css_references(&stylesheet)
        .into_iter()
        .map(|r| r.raw)
        .collect();
    assert_eq!(references.len(), 1);

    // The retry landed under the name the stylesheet points at
    let derived = references[0].split('?').next().unwrap().to_string();
    assert!(derived.starts_with("img_") && derived.ends_with(".png"));
    assert_eq!(std::fs::read(css_dir.join(&derived)).unwrap(), b"PNG");
    assert!(!css_dir.join("img.png").exists());

    let requests = mock_server.received_requests().await.unwrap();
    let image_requests = requests
        .iter()
        .filter(|r| r.url.path() == "/css/img.png")
        .count();
    assert_eq!(image_requests, 2);
}

#[tokio::test]
async fn test_failed_variant_keeps_original_reference() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<link rel="stylesheet" href="/css/site.css">"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "a { background: url('gone.png?v=1'); }\nb { background: url('gone.png?v=1'); }\n",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/css/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), output.path(), 2);
    let (summary, _) = run_with(settings, Arc::new(DiskStore::new())).await;

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("HTTP 404"));

    let stylesheet =
        std::fs::read_to_string(output.path().join("css").join("site.css")).unwrap();
    assert_eq!(
        stylesheet,
        "a { background: url('gone.png?v=1'); }\nb { background: url('gone.png?v=1'); }\n"
    );

    let requests = mock_server.received_requests().await.unwrap();
    let image_requests = requests
        .iter()
        .filter(|r| r.url.path() == "/css/gone.png")
        .count();
    assert_eq!(image_requests, 1);
}
