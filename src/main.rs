use anyhow::Context;
use clap::Parser;
use pagepress::{async_api, Margins, PaperFormat, Progress, RenderConfig, WaitCondition};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Render a local HTML document to a print-ready PDF with headless Chrome
#[derive(Parser, Debug)]
#[command(name = "pagepress", version, about)]
struct Cli {
    /// HTML document to render [default: poster.html next to this executable]
    input: Option<PathBuf>,

    /// Output PDF [default: <input stem>.pdf in the current directory,
    /// not next to the input]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Paper size (A3, A4, A5, Letter, Legal, Tabloid)
    #[arg(long, default_value_t = PaperFormat::A4)]
    paper: PaperFormat,

    #[arg(long)]
    landscape: bool,

    /// Rendering density multiplier
    #[arg(long, default_value_t = 2.0)]
    scale_factor: f64,

    /// Content scale applied when printing (0.1 to 2.0)
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Margin on every edge, in inches
    #[arg(long, default_value_t = 0.0)]
    margin: f64,

    /// Readiness condition before export: load or network-idle
    #[arg(long, default_value_t = WaitCondition::NetworkIdle)]
    wait: WaitCondition,

    /// Extra delay after the page is ready, in milliseconds
    #[arg(long, default_value_t = 0)]
    settle_ms: u64,

    /// Deadline for loading the document, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Chrome or Chromium binary to launch
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Leave background colors and images out of the PDF
    #[arg(long)]
    no_background: bool,

    /// Print the export report as JSON on success
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn render_config(&self) -> anyhow::Result<RenderConfig> {
        let input = match &self.input {
            Some(path) => path.clone(),
            None => pagepress::default_input().context("Failed to locate the default document")?,
        };
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| pagepress::default_output_for(&input));

        Ok(RenderConfig {
            input,
            output,
            device_scale_factor: self.scale_factor,
            print_background: !self.no_background,
            margins: Margins::uniform(self.margin),
            scale: self.scale,
            wait: self.wait,
            settle: Duration::from_millis(self.settle_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            chrome_path: self.chrome.clone(),
            ..RenderConfig::for_paper(self.paper, self.landscape)
        })
    }
}

fn init_logging(verbose: bool) {
    // Allow RUST_LOG overrides, fall back to flag-controlled level
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}

fn print_progress(progress: &Progress) {
    match progress {
        Progress::Launching => println!("Launching headless browser..."),
        Progress::Loading { url } => println!("Loading {}", url),
        Progress::Loaded => println!("Document loaded"),
        Progress::Exporting => println!("Exporting PDF..."),
        Progress::Saved { path, bytes } => println!("PDF saved to {} ({} bytes)", path.display(), bytes),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.render_config()?;
    println!("Converting {} to {}", config.input.display(), config.output.display());

    let quiet = cli.json;
    let report = async_api::export_pdf_with_progress(config, move |p| {
        if !quiet {
            print_progress(p)
        }
    })
    .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
