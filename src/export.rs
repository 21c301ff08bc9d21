//! Render-and-export workflow over the Chrome DevTools Protocol

use crate::idle::{wait_for_idle, LifecycleSignal};
use crate::session::Session;
use crate::{Error, ExportReport, Progress, RenderConfig, Result, WaitCondition};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

type OnProgressHandler = Arc<dyn Fn(&Progress) + Send + Sync>;
type LifecycleListener = dyn headless_chrome::browser::tab::EventListener<Event> + Send + Sync;

/// Leading bytes of every PDF file
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Converts one local document into one PDF file.
///
/// The exporter owns its configuration and runs the workflow once per call
/// to [`PdfExporter::run`]: validate input, launch a session, load the
/// document, wait for it to settle, print, write, release the session.
pub struct PdfExporter {
    config: RenderConfig,
    on_progress: Option<OnProgressHandler>,
}

impl PdfExporter {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            on_progress: None,
        }
    }

    /// Register a callback invoked as each step of the run begins
    pub fn on_progress<F>(&mut self, cb: F)
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(cb));
    }

    fn emit(&self, progress: Progress) {
        if let Some(cb) = &self.on_progress {
            cb(&progress);
        }
    }

    /// Run the whole workflow and return a summary of the written file
    pub fn run(&self) -> Result<ExportReport> {
        let started = Instant::now();
        self.config.validate()?;
        let url = document_url(&self.config.input)?;

        self.emit(Progress::Launching);
        let session = Session::launch(&self.config)?;
        let browser_pid = session.process_id();
        // Navigation and the idle wait share one deadline.
        let deadline = deadline_after(Instant::now(), self.config.timeout)?;

        // Any early return below drops `session`, which releases the browser.
        self.load(&session, &url, deadline)?;
        self.emit(Progress::Loaded);

        self.emit(Progress::Exporting);
        let pdf = self.print(session.tab())?;

        // The PDF is in hand; a failed tab close must not fail the run.
        if let Err(e) = session.close() {
            warn!("{}", e);
        }
        write_atomically(&self.config.output, &pdf)?;
        info!("wrote {} bytes to {}", pdf.len(), self.config.output.display());
        self.emit(Progress::Saved {
            path: self.config.output.clone(),
            bytes: pdf.len(),
        });

        Ok(ExportReport {
            input: self.config.input.clone(),
            output: self.config.output.clone(),
            bytes: pdf.len(),
            paper: self.config.paper,
            browser_pid,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    fn load(&self, session: &Session, url: &str, deadline: Instant) -> Result<()> {
        let tab = session.tab();

        // Subscribe before navigating so the new document's `init` is seen.
        let (tx, rx) = mpsc::channel::<LifecycleSignal>();
        let listener = match self.config.wait {
            WaitCondition::NetworkIdle => {
                tab.call_method(Page::SetLifecycleEventsEnabled { enabled: true })
                    .map_err(|e| Error::Load(format!("Failed to enable lifecycle events: {}", e)))?;
                let main_frame = session.main_frame_id()?;
                let tx = Mutex::new(tx);
                let listener: Arc<LifecycleListener> = Arc::new(move |event: &Event| {
                    if let Event::PageLifecycleEvent(lifecycle) = event {
                        if let Ok(tx) = tx.lock() {
                            let _ = tx.send(LifecycleSignal::new(
                                lifecycle.params.frame_id.clone(),
                                lifecycle.params.name.clone(),
                            ));
                        }
                    }
                });
                let weak = tab
                    .add_event_listener(listener)
                    .map_err(|e| Error::Load(format!("Failed to subscribe to lifecycle events: {}", e)))?;
                Some((weak, main_frame))
            }
            WaitCondition::Load => None,
        };

        self.emit(Progress::Loading { url: url.to_string() });
        debug!("navigating to {}", url);
        tab.set_default_timeout(remaining_until(deadline, self.config.timeout)?);
        tab.navigate_to(url)
            .map_err(|e| Error::Load(format!("Navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| Error::Load(format!("Wait for navigation failed: {}", e)))?;

        if let Some((weak, main_frame)) = listener {
            let waited = wait_for_idle(&rx, &main_frame, deadline, self.config.timeout);
            let _ = tab.remove_event_listener(&weak);
            waited?;
            debug!("network idle");
        }

        if !self.config.settle.is_zero() {
            std::thread::sleep(self.config.settle);
        }
        Ok(())
    }

    fn print(&self, tab: &Arc<Tab>) -> Result<Vec<u8>> {
        let pdf = tab
            .print_to_pdf(Some(print_options(&self.config)))
            .map_err(|e| Error::Export(format!("printToPDF failed: {}", e)))?;

        if !pdf.starts_with(PDF_SIGNATURE) {
            return Err(Error::Export("browser returned data without a PDF signature".into()));
        }
        Ok(pdf)
    }
}

fn deadline_after(start: Instant, timeout: Duration) -> Result<Instant> {
    start
        .checked_add(timeout)
        .ok_or_else(|| Error::Config(format!("timeout of {}s is out of range", timeout.as_secs())))
}

/// Time left before `deadline`; `Timeout` once it has passed
fn remaining_until(deadline: Instant, budget: Duration) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::Timeout(budget.as_millis() as u64));
    }
    Ok(left)
}

/// Absolute `file://` URL for an existing local document
pub fn document_url(input: &Path) -> Result<String> {
    if !input.is_file() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    let absolute = input.canonicalize()?;
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|_| Error::Config(format!("cannot express {} as a file URL", absolute.display())))
}

/// `Page.printToPDF` parameters for the configured page
pub fn print_options(config: &RenderConfig) -> PrintToPdfOptions {
    let (width, height) = config.paper.inches();
    PrintToPdfOptions {
        landscape: Some(config.landscape),
        display_header_footer: Some(false),
        print_background: Some(config.print_background),
        scale: Some(config.scale),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(config.margins.top),
        margin_bottom: Some(config.margins.bottom),
        margin_left: Some(config.margins.left),
        margin_right: Some(config.margins.right),
        prefer_css_page_size: Some(config.prefer_css_page_size),
        ..Default::default()
    }
}

/// Write `bytes` next to `path` first, then move it into place
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = partial_path(path);
    std::fs::write(&tmp, bytes).map_err(|e| Error::Export(format!("Failed to write {}: {}", tmp.display(), e)))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::Export(format!("Failed to move PDF into {}: {}", path.display(), e)));
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
