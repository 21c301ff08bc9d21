//! Scoped browser session: one headless Chrome process and one tab
//!
//! A [`Session`] is released exactly once, either through [`Session::close`]
//! or, if the workflow bails out early, when the guard is dropped.

use crate::{Error, RenderConfig, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// Slack on top of the render deadline before Chrome's idle watchdog fires
const IDLE_BROWSER_SLACK: Duration = Duration::from_secs(30);

/// Extra Chrome switches for each run.
///
/// Sandboxing is turned off separately through `LaunchOptions::sandbox`;
/// these cover shared memory and GPU, which are commonly unavailable in
/// containers, plus throttling that can delay off-screen rendering.
pub fn launch_args(config: &RenderConfig) -> Vec<String> {
    vec![
        format!("--force-device-scale-factor={}", config.device_scale_factor),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--run-all-compositor-stages-before-draw".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--hide-scrollbars".to_string(),
    ]
}

/// How long Chrome may sit without CDP traffic before it shuts itself down
pub fn idle_browser_timeout(config: &RenderConfig) -> Duration {
    config.timeout.saturating_add(IDLE_BROWSER_SLACK)
}

/// Exclusive owner of a browser process and its single tab
pub struct Session {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl Session {
    /// Launch headless Chrome and open the tab the document renders in
    pub fn launch(config: &RenderConfig) -> Result<Self> {
        config.validate()?;
        let args = launch_args(config);
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .args(args.iter().map(|a| OsStr::new(a.as_str())).collect())
            .idle_browser_timeout(idle_browser_timeout(config))
            .build()
            .map_err(|e| Error::Launch(format!("Failed to build launch options: {}", e)))?;

        let browser =
            Browser::new(launch_options).map_err(|e| Error::Launch(format!("Failed to launch browser: {}", e)))?;
        debug!("browser launched (pid {:?})", browser.get_process_id());

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Launch(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.timeout);

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Id of the tab's top-level frame
    pub fn main_frame_id(&self) -> Result<String> {
        let tree = self
            .tab
            .call_method(Page::GetFrameTree(None))
            .map_err(|e| Error::Load(format!("Failed to read frame tree: {}", e)))?;
        Ok(tree.frame_tree.frame.id)
    }

    /// OS process id of the browser, if it is still held
    pub fn process_id(&self) -> Option<u32> {
        self.browser.as_ref().and_then(|b| b.get_process_id())
    }

    pub fn is_open(&self) -> bool {
        self.browser.is_some()
    }

    /// Close the tab and terminate the browser process
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = self.tab.close(false);
        // Dropping the browser kills and reaps the child process.
        drop(browser);
        debug!("browser session released");
        closed
            .map(|_| ())
            .map_err(|e| Error::Launch(format!("Failed to close tab: {}", e)))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.browser.is_some() {
            warn!("browser session dropped without close; releasing it now");
            if let Err(e) = self.release() {
                warn!("{}", e);
            }
        }
    }
}
