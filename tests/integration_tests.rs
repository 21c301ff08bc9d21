//! Integration tests for the render-and-export workflow

use lopdf::Document;
use pagepress::session::Session;
use pagepress::{Error, PaperFormat, PdfExporter, Progress, RenderConfig, WaitCondition};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};

const POSTER: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Poster</title>
<style>
  html, body { margin: 0; padding: 0; }
  body { background: #ff0000; }
  h1 { font-family: sans-serif; }
</style>
</head>
<body>
<h1>Quarterly Poster</h1>
<p>This page should fill exactly one A4 sheet.</p>
</body>
</html>"#;

const SLOW_ASSET_DELAY: Duration = Duration::from_millis(1500);
const HANGING_ASSET_DELAY: Duration = Duration::from_secs(30);

static INIT: Once = Once::new();

/// Start a server whose images only arrive after a delay (or effectively never)
fn start_slow_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                std::thread::spawn(move || {
                    let response = match request.url() {
                        "/slow.png" => {
                            std::thread::sleep(SLOW_ASSET_DELAY);
                            Response::from_string("not really a png").with_header(
                                "Content-Type: image/png"
                                    .parse::<tiny_http::Header>()
                                    .unwrap(),
                            )
                        }
                        "/hang.png" => {
                            std::thread::sleep(HANGING_ASSET_DELAY);
                            Response::from_string("too late").with_status_code(200)
                        }
                        _ => Response::from_string("Not Found").with_status_code(404),
                    };
                    let _ = request.respond(response);
                });
            }
        });
        // Give the server time to start
        std::thread::sleep(Duration::from_millis(100));
    });

    "http://127.0.0.1:18090".to_string()
}

fn write_doc(dir: &Path, name: &str, html: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, html).unwrap();
    path
}

/// Document that requests `path` from the test server after its load event
fn late_image_doc(base_url: &str, path: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><body>late
<script>
window.addEventListener('load', function() {{
  var img = new Image();
  img.src = '{}{}';
  document.body.appendChild(img);
}});
</script></body></html>"#,
        base_url, path
    )
}

fn config_for(input: PathBuf, output: PathBuf) -> RenderConfig {
    RenderConfig {
        input,
        output,
        ..Default::default()
    }
}

fn page_size_points(doc: &Document) -> (f32, f32) {
    let (_, page_id) = doc.get_pages().into_iter().next().expect("pdf has no pages");
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let coord = |i: usize| media_box[i].as_float().unwrap();
    (coord(2) - coord(0), coord(3) - coord(1))
}

fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[test]
fn test_missing_input_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("poster.pdf");
    let config = config_for(dir.path().join("poster.html"), output.clone());

    let res = pagepress::render_to_pdf(config);
    assert!(matches!(res, Err(Error::InputNotFound(_))), "unexpected result: {:?}", res);
    assert!(!output.exists());
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_exports_single_a4_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "poster.html", POSTER);
    let output = dir.path().join("poster.pdf");

    let report = pagepress::render_to_pdf(config_for(input, output.clone())).expect("export failed");
    assert_eq!(report.output, output);

    let bytes = std::fs::read(&output).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(report.bytes, bytes.len());
    assert!(bytes.starts_with(b"%PDF-"));

    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    // A4 is 595 x 842 points
    let (w, h) = page_size_points(&doc);
    assert!((w - 595.0).abs() < 2.0, "width was {}", w);
    assert!((h - 842.0).abs() < 2.0, "height was {}", h);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_background_is_printed() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "poster.html", POSTER);
    let output = dir.path().join("poster.pdf");

    pagepress::render_to_pdf(config_for(input, output.clone())).expect("export failed");

    let doc = Document::load(&output).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let content = doc.get_page_content(page_id).unwrap();
    let content = String::from_utf8_lossy(&content);
    assert!(content.contains("1 0 0 rg"), "red background fill missing from page content");
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_second_run_overwrites_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "poster.html", POSTER);
    let output = dir.path().join("poster.pdf");

    pagepress::render_to_pdf(config_for(input.clone(), output.clone())).expect("first export failed");
    pagepress::render_to_pdf(config_for(input, output.clone())).expect("second export failed");

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
    assert!(names.contains(&"poster.pdf".to_string()));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_browser_process_is_gone_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "poster.html", POSTER);

    let report = pagepress::render_to_pdf(config_for(input, dir.path().join("out.pdf"))).expect("export failed");
    let pid = report.browser_pid.expect("browser pid not reported");
    assert!(!process_alive(pid), "browser process {} still running", pid);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_idle_wait_covers_slow_subresource() {
    let base_url = start_slow_server();
    let dir = tempfile::tempdir().unwrap();
    // Requested after the load event, so only the idle wait can cover it
    let input = write_doc(dir.path(), "slow.html", &late_image_doc(&base_url, "/slow.png"));

    let started = Instant::now();
    pagepress::render_to_pdf(config_for(input, dir.path().join("slow.pdf"))).expect("export failed");
    assert!(started.elapsed() >= SLOW_ASSET_DELAY);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_progress_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "poster.html", POSTER);
    let output = dir.path().join("poster.pdf");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut exporter = PdfExporter::new(RenderConfig {
        wait: WaitCondition::Load,
        paper: PaperFormat::Letter,
        ..config_for(input, output.clone())
    });
    exporter.on_progress(move |p| sink.lock().unwrap().push(p.clone()));
    exporter.run().expect("export failed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0], Progress::Launching);
    assert!(matches!(&seen[1], Progress::Loading { url } if url.starts_with("file://")));
    assert_eq!(seen[2], Progress::Loaded);
    assert_eq!(seen[3], Progress::Exporting);
    assert!(matches!(&seen[4], Progress::Saved { path, .. } if *path == output));
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_async_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "poster.html", POSTER);
    let output = dir.path().join("poster.pdf");

    let report = pagepress::async_api::export_pdf(config_for(input, output.clone()))
        .await
        .expect("export failed");
    assert!(output.exists());
    assert_eq!(report.paper, PaperFormat::A4);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_never_idle_document_times_out() {
    let base_url = start_slow_server();
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "hang.html", &late_image_doc(&base_url, "/hang.png"));
    let output = dir.path().join("hang.pdf");

    let started = Instant::now();
    let res = pagepress::render_to_pdf(RenderConfig {
        timeout: Duration::from_secs(2),
        ..config_for(input, output.clone())
    });
    assert!(matches!(res, Err(Error::Timeout(2000))), "unexpected result: {:?}", res);
    // one deadline covers navigation and the idle wait
    assert!(started.elapsed() < HANGING_ASSET_DELAY);
    assert!(!output.exists());
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_dropped_session_kills_browser() {
    let session = Session::launch(&RenderConfig::default()).expect("launch failed");
    let pid = session.process_id().expect("browser pid not available");
    assert!(process_alive(pid));

    // an early return in the workflow drops the session without close()
    drop(session);
    assert!(!process_alive(pid), "browser process {} still running", pid);
}
