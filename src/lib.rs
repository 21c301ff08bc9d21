//! pagepress
//!
//! Renders a local HTML document in headless Chrome and exports it as a
//! fixed-size PDF page over the Chrome DevTools Protocol.
//!
//! # Features
//!
//! - **Print-ready defaults**: A4 paper, zero margins, backgrounds included,
//!   2x device scale factor for crisp rasterized content
//! - **Quiescence wait**: export only after the document's network activity
//!   has gone idle, bounded by a deadline
//! - **Scoped session**: the browser process is released on every exit path
//!
//! # Example
//!
//! ```no_run
//! use pagepress::{PdfExporter, RenderConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RenderConfig {
//!     input: "poster.html".into(),
//!     output: "poster.pdf".into(),
//!     ..Default::default()
//! };
//!
//! let report = PdfExporter::new(config).run()?;
//! println!("wrote {} bytes to {}", report.bytes, report.output.display());
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod paper;
pub use paper::{Margins, PaperFormat};

pub mod idle;
pub mod session;

pub mod export;
pub use export::PdfExporter;

// Async-friendly entry point (worker-thread backed)
pub mod async_api;

/// Document name used when no input is given
pub const DEFAULT_INPUT_NAME: &str = "poster.html";

/// Longest accepted deadline for loading a document
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for one render-and-export run
///
/// The defaults reproduce the fixed print setup: A4 portrait, a viewport of
/// one A4 page at 96 CSS px/inch, a 2x device scale factor, backgrounds on,
/// and zero margins on every edge.
///
/// # Examples
///
/// ```
/// let cfg = pagepress::RenderConfig::default();
/// assert_eq!(cfg.paper, pagepress::PaperFormat::A4);
/// assert!(cfg.margins.is_zero());
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Local HTML document to render
    pub input: PathBuf,
    /// Where the PDF is written (overwritten if present)
    pub output: PathBuf,
    /// Viewport dimensions in CSS pixels
    ///
    /// Not re-derived when `paper` or `landscape` change; build through
    /// [`RenderConfig::for_paper`] to keep them in step.
    pub viewport: Viewport,
    /// Rendering density multiplier
    pub device_scale_factor: f64,
    /// Paper size of the exported page
    pub paper: PaperFormat,
    pub landscape: bool,
    /// Whether background graphics are printed
    pub print_background: bool,
    /// Let an `@page` rule in the document override `paper`
    pub prefer_css_page_size: bool,
    pub margins: Margins,
    /// Content scale passed to the PDF printer
    pub scale: f64,
    /// Condition that must hold before the export starts
    pub wait: WaitCondition,
    /// Extra delay after the wait condition is met
    pub settle: Duration,
    /// Deadline for navigation and the idle wait
    pub timeout: Duration,
    /// Explicit Chrome/Chromium binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let paper = PaperFormat::default();
        Self {
            input: PathBuf::from(DEFAULT_INPUT_NAME),
            output: default_output_for(Path::new(DEFAULT_INPUT_NAME)),
            viewport: paper.viewport(false),
            device_scale_factor: 2.0,
            paper,
            landscape: false,
            print_background: true,
            prefer_css_page_size: true,
            margins: Margins::zero(),
            scale: 1.0,
            wait: WaitCondition::default(),
            settle: Duration::ZERO,
            timeout: Duration::from_secs(30),
            chrome_path: None,
        }
    }
}

impl RenderConfig {
    /// Defaults for `paper` in the given orientation, with a matching viewport
    pub fn for_paper(paper: PaperFormat, landscape: bool) -> Self {
        Self {
            viewport: paper.viewport(landscape),
            paper,
            landscape,
            ..Default::default()
        }
    }

    /// Check values Chrome would otherwise reject mid-run
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::Config(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.device_scale_factor.is_nan() || self.device_scale_factor <= 0.0 {
            return Err(Error::Config(format!(
                "device scale factor must be positive, got {}",
                self.device_scale_factor
            )));
        }
        // Chrome accepts 0.1..=2.0 for Page.printToPDF
        if !(0.1..=2.0).contains(&self.scale) {
            return Err(Error::Config(format!("print scale must be within 0.1..=2.0, got {}", self.scale)));
        }
        let m = self.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| *v < 0.0) {
            return Err(Error::Config("margins must not be negative".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(Error::Config(format!(
                "timeout must be at most {}s, got {}s",
                MAX_TIMEOUT.as_secs(),
                self.timeout.as_secs()
            )));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        PaperFormat::default().viewport(false)
    }
}

/// When the page counts as ready for export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WaitCondition {
    /// The document's load event has fired
    Load,
    /// No network activity for Chrome's quiet window after load
    #[default]
    NetworkIdle,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitCondition::Load => f.write_str("load"),
            WaitCondition::NetworkIdle => f.write_str("network-idle"),
        }
    }
}

impl FromStr for WaitCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(WaitCondition::Load),
            "network-idle" | "networkidle" | "idle" => Ok(WaitCondition::NetworkIdle),
            other => Err(Error::Config(format!("unknown wait condition '{}'", other))),
        }
    }
}

/// Progress notification emitted while a run advances
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Launching,
    Loading { url: String },
    Loaded,
    Exporting,
    Saved { path: PathBuf, bytes: usize },
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Size of the written PDF
    pub bytes: usize,
    pub paper: PaperFormat,
    /// Process id of the browser that rendered the document
    pub browser_pid: Option<u32>,
    pub elapsed_ms: u128,
}

/// `<stem>.pdf` in the current working directory, wherever the input lives
pub fn default_output_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    let mut out = PathBuf::from(stem);
    out.set_extension("pdf");
    out
}

/// Default document, resolved next to the running executable
pub fn default_input() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::Config(format!("executable has no parent directory: {}", exe.display())))?;
    Ok(dir.join(DEFAULT_INPUT_NAME))
}

/// Run the render-and-export workflow with the given configuration
pub fn render_to_pdf(config: RenderConfig) -> Result<ExportReport> {
    PdfExporter::new(config).run()
}
