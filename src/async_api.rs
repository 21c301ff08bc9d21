use crate::{Error, ExportReport, PdfExporter, Progress, RenderConfig, Result};
use std::thread;
use tokio::sync::oneshot;

/// Run the workflow on a dedicated worker thread and await its result.
///
/// The CDP client blocks while it waits on the browser, so the run is kept
/// off the async runtime; the calling task is suspended until the worker
/// reports back.
pub async fn export_pdf(config: RenderConfig) -> Result<ExportReport> {
    run_on_worker(PdfExporter::new(config)).await
}

/// Like [`export_pdf`], forwarding progress notifications to `on_progress`.
pub async fn export_pdf_with_progress<F>(config: RenderConfig, on_progress: F) -> Result<ExportReport>
where
    F: Fn(&Progress) + Send + Sync + 'static,
{
    let mut exporter = PdfExporter::new(config);
    exporter.on_progress(on_progress);
    run_on_worker(exporter).await
}

async fn run_on_worker(exporter: PdfExporter) -> Result<ExportReport> {
    let (done_tx, done_rx) = oneshot::channel::<Result<ExportReport>>();

    thread::Builder::new()
        .name("pagepress-export".into())
        .spawn(move || {
            let _ = done_tx.send(exporter.run());
        })?;

    done_rx
        .await
        .map_err(|e| Error::Export(format!("Export worker exited without a result: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn missing_input_propagates_through_worker() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            input: dir.path().join("nope.html"),
            output: dir.path().join("nope.pdf"),
            ..Default::default()
        };
        let res = export_pdf(config).await;
        assert!(matches!(res, Err(Error::InputNotFound(_))));
        assert!(!dir.path().join("nope.pdf").exists());
    }

    #[tokio::test]
    async fn invalid_config_reports_no_progress() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();
        let config = RenderConfig {
            scale: 0.0,
            ..Default::default()
        };
        let res = export_pdf_with_progress(config, move |_| *sink.lock().unwrap() += 1).await;
        assert!(matches!(res, Err(Error::Config(_))));
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}
