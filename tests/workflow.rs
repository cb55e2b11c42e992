//! Integration tests for `FileTransformWorkflow` against a mock backend.
//!
//! Every test starts its own `wiremock` server; mocks declared with
//! `.expect(n)` are verified when the server is dropped, so "exactly one
//! request" and "no request at all" are asserted by the server itself.

use pdftools_client::{
    catalog, ClientConfig, ComparisonReport, ErrorKind, FileTransformWorkflow, ObjectUrlStore,
    Parameters, SelectedFile, Transport, ValidationError, WorkflowError, WorkflowObserver,
    WorkflowStatus,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MIB: usize = 1024 * 1024;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_for(server: &MockServer) -> ClientConfig {
    init_tracing();
    ClientConfig::builder()
        .base_url(server.uri())
        .timeout_secs(10)
        .build()
        .unwrap()
}

fn workflow(server: &MockServer, tool: &str) -> FileTransformWorkflow {
    let config = config_for(server);
    let tool = catalog::find(tool, &config).unwrap();
    FileTransformWorkflow::from_config(tool, config).unwrap()
}

fn pdf(name: &str, size: usize) -> SelectedFile {
    SelectedFile::from_bytes(name, "application/pdf", vec![b'%'; size])
}

fn pdf_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw("PDF", "application/pdf")
}

#[derive(Default)]
struct Recorder {
    statuses: Mutex<Vec<WorkflowStatus>>,
    discarded: Mutex<usize>,
}

impl WorkflowObserver for Recorder {
    fn on_status_change(&self, status: &WorkflowStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn on_discarded(&self, _tool: &str) {
        *self.discarded.lock().unwrap() += 1;
    }
}

// ── Selection ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn disallowed_mime_is_rejected_on_first_and_repeated_selection() {
    let server = MockServer::start().await;
    let wf = workflow(&server, "split");
    let png = SelectedFile::from_bytes("photo.png", "image/png", vec![0u8; 1024]);

    for _ in 0..2 {
        let err = wf.select_file(png.clone()).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFileType { .. }));
        let status = wf.status();
        let e = status.error().expect("status should be Error");
        assert_eq!(e.kind, ErrorKind::Validation);
        assert!(e.message.contains("unsupported file type"), "got: {}", e.message);
        assert!(wf.selection("file").is_empty());
    }
}

#[tokio::test]
async fn size_ceiling_is_inclusive_at_50_mib() {
    let server = MockServer::start().await;
    let wf = workflow(&server, "split");

    wf.select_file(pdf("exact.pdf", 50 * MIB)).unwrap();
    assert_eq!(wf.status(), WorkflowStatus::Idle);

    let err = wf.select_file(pdf("over.pdf", 50 * MIB + 1)).unwrap_err();
    assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    assert!(wf.status().error().unwrap().message.contains("file too large"));
    // Previous valid selection survives the rejection.
    assert_eq!(wf.selection("file")[0].name(), "exact.pdf");
}

#[tokio::test]
async fn merge_needs_at_least_two_files() {
    let server = MockServer::start().await;
    let wf = workflow(&server, "merge");
    let err = wf.select_files("files", vec![pdf("a.pdf", 10)]).unwrap_err();
    assert!(matches!(err, ValidationError::TooFewFiles { min: 2, got: 1, .. }));
}

#[tokio::test]
async fn rejected_selection_leaves_an_in_flight_submission_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response().set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let wf = Arc::new(workflow(&server, "repair"));
    wf.select_file(pdf("a.pdf", 64)).unwrap();

    let submitter = Arc::clone(&wf);
    let handle = tokio::spawn(async move { submitter.submit(&Parameters::new()).await });

    let mut rx = wf.subscribe();
    while !rx.borrow_and_update().is_loading() {
        rx.changed().await.unwrap();
    }
    let png = SelectedFile::from_bytes("photo.png", "image/png", vec![0u8; 64]);
    assert!(wf.select_file(png).is_err());
    assert!(wf.status().is_loading());
    assert_eq!(wf.selection("file")[0].name(), "a.pdf");

    let download = handle.await.unwrap().unwrap();
    assert_eq!(download.bytes.as_ref(), b"PDF");
    assert_eq!(wf.status(), WorkflowStatus::Success);
}

#[tokio::test]
async fn page_count_for_a_replaced_file_is_not_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/page-count"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true, "pageCount": 10}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wf = Arc::new(workflow(&server, "split"));
    wf.select_file(pdf("a.pdf", 256)).unwrap();

    let fetcher = Arc::clone(&wf);
    let handle = tokio::spawn(async move { fetcher.fetch_page_count().await });

    while server.received_requests().await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    wf.select_file(pdf("b.pdf", 512)).unwrap();

    assert_eq!(handle.await.unwrap().unwrap(), 10);
    assert_eq!(wf.page_count(), None);
}

// ── Submission ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_two_pdfs_sends_two_file_parts_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/merge"))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "merge");
    wf.select_files("files", vec![pdf("a.pdf", 1024), pdf("b.pdf", 1024)])
        .unwrap();

    let download = wf.submit(&Parameters::new()).await.unwrap();
    assert_eq!(wf.status(), WorkflowStatus::Success);
    assert_eq!(download.bytes.as_ref(), b"PDF");
    assert_eq!(download.filename, "merged.pdf");
    assert_eq!(wf.download().unwrap().url, download.url);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);
    assert_eq!(body.matches("name=\"files\"").count(), 2, "body: {body}");
    assert!(body.contains("filename=\"a.pdf\""));
    assert!(body.contains("filename=\"b.pdf\""));
}

#[tokio::test]
async fn upload_carries_the_file_with_a_known_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "repair");
    let content = b"%PDF-1.7 distinctive payload %%EOF".to_vec();
    wf.select_file(SelectedFile::from_bytes("a.pdf", "application/pdf", content.clone()))
        .unwrap();
    wf.submit(&Parameters::new()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let length: usize = request
        .headers
        .get("content-length")
        .expect("multipart body should have a known length")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(length, request.body.len());
    assert!(request
        .body
        .windows(content.len())
        .any(|w| w == content.as_slice()));
}

#[tokio::test]
async fn double_submit_sends_exactly_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response().set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "repair");
    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let params = Parameters::new();

    let (first, second) = futures::join!(wf.submit(&params), wf.submit(&params));
    assert!(first.is_ok());
    assert!(matches!(second, Err(WorkflowError::Busy)));
    assert_eq!(wf.status(), WorkflowStatus::Success);
}

#[tokio::test]
async fn reset_releases_result_and_next_submission_gets_a_new_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response())
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let store = ObjectUrlStore::new();
    let wf = FileTransformWorkflow::new(
        catalog::find("repair", &config).unwrap(),
        Transport::new(config).unwrap(),
        store.clone(),
    );

    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let first = wf.submit(&Parameters::new()).await.unwrap();
    assert_eq!(store.live_count(), 1);

    wf.reset();
    assert_eq!(store.live_count(), 0);
    assert!(store.resolve(&first.url).is_none());
    assert!(wf.download().is_none());
    assert_eq!(wf.status(), WorkflowStatus::Idle);

    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let second = wf.submit(&Parameters::new()).await.unwrap();
    assert_ne!(first.url, second.url);
    assert_eq!(store.live_count(), 1);

    drop(wf);
    assert_eq!(store.live_count(), 0);
}

#[tokio::test]
async fn resubmitting_supersedes_the_previous_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response())
        .mount(&server)
        .await;

    let wf = workflow(&server, "repair");
    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let first = wf.submit(&Parameters::new()).await.unwrap();
    let second = wf.submit(&Parameters::new()).await.unwrap();
    assert_ne!(first.url, second.url);
    assert!(wf.store().resolve(&first.url).is_none());
    assert_eq!(wf.store().live_count(), 1);
}

#[tokio::test]
async fn inverted_page_range_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(pdf_response())
        .expect(0)
        .mount(&server)
        .await;

    let wf = workflow(&server, "split");
    wf.select_file(pdf("ten-pages.pdf", 2048)).unwrap();
    wf.set_page_count(Some(10));

    let err = wf
        .submit(&Parameters::new().page_range(5, 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::InvalidPageRange { from: 5, to: 3 })
    ));
    assert_eq!(wf.status().error().unwrap().kind, ErrorKind::Validation);
}

#[tokio::test]
async fn fetched_page_count_bounds_the_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/page-count"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true, "pageCount": 10})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/split"))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "split");
    wf.select_file(pdf("report.pdf", 2048)).unwrap();
    assert_eq!(wf.fetch_page_count().await.unwrap(), 10);
    assert_eq!(wf.page_count(), Some(10));

    let err = wf
        .submit(&Parameters::new().page_range(3, 11))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::PageOutOfRange { page: 11, total: 10 })
    ));

    let download = wf.submit(&Parameters::new().page_range(3, 10)).await.unwrap();
    assert_eq!(download.filename, "split_report.pdf");

    let requests = server.received_requests().await.unwrap();
    let split = requests
        .iter()
        .find(|r| r.url.path() == "/split")
        .unwrap();
    let body = String::from_utf8_lossy(&split.body);
    assert!(body.contains("name=\"pages\""), "body: {body}");
    assert!(body.contains("3-10"));
}

// ── Error classification ─────────────────────────────────────────────────────

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "disk full"})))
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "repair");
    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let err = wf.submit(&Parameters::new()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    let status = wf.status();
    let e = status.error().unwrap();
    assert_eq!(e.kind, ErrorKind::Server);
    assert_eq!(e.message, "disk full");
    assert!(wf.download().is_none());
}

#[tokio::test]
async fn opaque_server_error_uses_generic_message_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compress"))
        .respond_with(ResponseTemplate::new(503).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&server)
        .await;

    let wf = workflow(&server, "compress");
    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let err = wf.submit(&Parameters::new()).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("503"), "got: {msg}");
}

#[tokio::test]
async fn tiny_error_body_on_success_status_is_an_application_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compress"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Error: ghostscript crashed"))
        .mount(&server)
        .await;

    let wf = workflow(&server, "compress");
    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let err = wf.submit(&Parameters::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(wf.status().error().unwrap().kind, ErrorKind::Application);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let config = ClientConfig::builder()
        .base_url("http://127.0.0.1:9")
        .connect_timeout_secs(2)
        .build()
        .unwrap();
    let wf = FileTransformWorkflow::from_config(catalog::find("repair", &config).unwrap(), config)
        .unwrap();
    wf.select_file(pdf("a.pdf", 64)).unwrap();

    let err = wf.submit(&Parameters::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    let status = wf.status();
    assert!(status.error().unwrap().message.contains("no response from server"));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(pdf_response().set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .timeout_secs(1)
        .build()
        .unwrap();
    let wf = FileTransformWorkflow::from_config(catalog::find("repair", &config).unwrap(), config)
        .unwrap();
    wf.select_file(pdf("a.pdf", 64)).unwrap();

    let err = wf.submit(&Parameters::new()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Timeout { secs: 1 }), "got: {err:?}");
    assert_eq!(err.kind(), ErrorKind::Network);
}

// ── Cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_during_flight_discards_the_late_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response().set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let wf = Arc::new(workflow(&server, "repair").with_observer(recorder.clone()));
    wf.select_file(pdf("a.pdf", 64)).unwrap();

    let submitter = Arc::clone(&wf);
    let handle = tokio::spawn(async move { submitter.submit(&Parameters::new()).await });

    let mut rx = wf.subscribe();
    while !rx.borrow_and_update().is_loading() {
        rx.changed().await.unwrap();
    }
    wf.reset();

    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, Err(WorkflowError::Cancelled)));
    assert_eq!(wf.status(), WorkflowStatus::Idle);
    assert!(wf.download().is_none());
    assert_eq!(wf.store().live_count(), 0);
    assert_eq!(*recorder.discarded.lock().unwrap(), 1);
    assert_eq!(
        *recorder.statuses.lock().unwrap(),
        vec![WorkflowStatus::Idle, WorkflowStatus::Loading, WorkflowStatus::Idle]
    );
}

#[tokio::test]
async fn new_selection_during_flight_supersedes_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repair-pdf"))
        .respond_with(pdf_response().set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let wf = Arc::new(workflow(&server, "repair"));
    wf.select_file(pdf("a.pdf", 64)).unwrap();

    let submitter = Arc::clone(&wf);
    let handle = tokio::spawn(async move { submitter.submit(&Parameters::new()).await });

    let mut rx = wf.subscribe();
    while !rx.borrow_and_update().is_loading() {
        rx.changed().await.unwrap();
    }
    wf.select_file(pdf("b.pdf", 64)).unwrap();

    assert!(matches!(handle.await.unwrap(), Err(WorkflowError::Cancelled)));
    assert_eq!(wf.status(), WorkflowStatus::Idle);
    assert_eq!(wf.selection("file")[0].name(), "b.pdf");
}

// ── Non-blob results ─────────────────────────────────────────────────────────

#[tokio::test]
async fn compare_returns_a_typed_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compare-pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "file1Pages": 2,
            "file2Pages": 3,
            "differences": ["-old line", "+new line"],
            "similarity": 91.2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "compare");
    wf.select_files("file1", vec![pdf("v1.pdf", 128)]).unwrap();
    wf.select_files("file2", vec![pdf("v2.pdf", 128)]).unwrap();

    let download = wf.submit(&Parameters::new()).await.unwrap();
    let report: ComparisonReport = download.json().unwrap();
    assert_eq!(report.file1_pages, 2);
    assert_eq!(report.file2_pages, 3);
    assert_eq!(report.differences.len(), 2);
}

#[tokio::test]
async fn ocr_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocr-pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello from the scanner"))
        .mount(&server)
        .await;

    let wf = workflow(&server, "ocr");
    wf.select_file(SelectedFile::from_bytes("scan.png", "image/png", vec![0u8; 512]))
        .unwrap();
    let download = wf.submit(&Parameters::new()).await.unwrap();
    assert_eq!(download.text(), "Hello from the scanner");
}

#[tokio::test]
async fn content_disposition_names_the_download() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/word-to-pdf"))
        .respond_with(
            pdf_response().insert_header("Content-Disposition", "attachment; filename=\"converted.pdf\""),
        )
        .mount(&server)
        .await;

    let wf = workflow(&server, "word-to-pdf");
    wf.select_file(SelectedFile::guessed("letter.docx", vec![0u8; 256]))
        .unwrap();
    let download = wf.submit(&Parameters::new()).await.unwrap();
    assert_eq!(download.filename, "converted.pdf");

    let dir = tempfile::tempdir().unwrap();
    let saved = download.save_to(dir.path()).await.unwrap();
    assert_eq!(saved, dir.path().join("converted.pdf"));
    assert_eq!(std::fs::read(saved).unwrap(), b"PDF");
}

#[tokio::test]
async fn lock_sends_password_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/encrypt-pdf"))
        .respond_with(pdf_response())
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "lock");
    wf.select_file(pdf("a.pdf", 64)).unwrap();

    let err = wf.submit(&Parameters::new()).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::MissingParameter { .. })
    ));

    wf.submit(&Parameters::new().password("s3cret")).await.unwrap();
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"password\""));
    assert!(body.contains("s3cret"));
}

#[tokio::test]
async fn edit_sends_options_and_optional_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/edit-pdf"))
        .respond_with(pdf_response())
        .expect(2)
        .mount(&server)
        .await;

    let wf = workflow(&server, "edit");
    wf.select_file(pdf("a.pdf", 64)).unwrap();
    let params = Parameters::new().set("options", serde_json::json!({"watermark": "DRAFT"}));

    let download = wf.submit(&params).await.unwrap();
    assert_eq!(download.filename, "edited.pdf");

    wf.select_files(
        "image",
        vec![SelectedFile::from_bytes("logo.png", "image/png", vec![0u8; 32])],
    )
    .unwrap();
    wf.submit(&params).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let without_image = String::from_utf8_lossy(&requests[0].body);
    assert!(without_image.contains("name=\"file\""));
    assert!(!without_image.contains("name=\"image\""));
    assert!(without_image.contains("name=\"options\""));
    assert!(without_image.contains(r#"{"watermark":"DRAFT"}"#), "body: {without_image}");

    let with_image = String::from_utf8_lossy(&requests[1].body);
    assert!(with_image.contains("name=\"image\""));
    assert!(with_image.contains("filename=\"logo.png\""));
}

#[tokio::test]
async fn convert_sends_target_format_and_names_the_result_after_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("DOCX", "application/octet-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, "convert");
    wf.select_file(pdf("report.pdf", 128)).unwrap();

    let err = wf
        .submit(&Parameters::new().set("target_format", "exe"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::InvalidParameter { .. })
    ));

    let download = wf
        .submit(&Parameters::new().set("target_format", "docx"))
        .await
        .unwrap();
    assert_eq!(download.filename, "converted_report.docx");
    assert_eq!(download.mime, "application/octet-stream");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("name=\"target_format\""));
    assert!(body.contains("docx"));
}
