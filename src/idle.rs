//! Network quiescence detection
//!
//! Chrome reports page lifecycle milestones (`init`, `DOMContentLoaded`,
//! `load`, `networkAlmostIdle`, `networkIdle`, ...) once lifecycle events are
//! enabled on a tab. `networkIdle` fires after the frame has had no open
//! network connections for 500ms, which is the quiet window we export after.

use crate::{Error, Result};
use log::debug;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

pub const LIFECYCLE_INIT: &str = "init";
pub const LIFECYCLE_NETWORK_IDLE: &str = "networkIdle";

/// One `Page.lifecycleEvent`, reduced to the frame it belongs to and its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSignal {
    pub frame_id: String,
    pub name: String,
}

impl LifecycleSignal {
    pub fn new(frame_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            name: name.into(),
        }
    }
}

/// Tracks lifecycle events of the main frame for the document being
/// navigated to.
///
/// Signals are only honoured after an `init` for the new document, so a
/// `networkIdle` left over from `about:blank` cannot satisfy the wait.
/// Subframes report their own lifecycle; those are ignored.
#[derive(Debug)]
pub struct IdleTracker {
    main_frame: String,
    armed: bool,
    idle: bool,
}

impl IdleTracker {
    pub fn new(main_frame: impl Into<String>) -> Self {
        Self {
            main_frame: main_frame.into(),
            armed: false,
            idle: false,
        }
    }

    /// Feed one lifecycle event; returns whether the main frame is now idle
    pub fn observe(&mut self, signal: &LifecycleSignal) -> bool {
        if signal.frame_id != self.main_frame {
            return self.idle;
        }
        match signal.name.as_str() {
            LIFECYCLE_INIT => {
                self.armed = true;
                self.idle = false;
            }
            LIFECYCLE_NETWORK_IDLE if self.armed => self.idle = true,
            _ => {}
        }
        self.idle
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }
}

/// Block until the main frame reports network idle for a new document.
///
/// Fails with [`Error::Timeout`] (reporting `budget`) once `deadline` has
/// passed, or with [`Error::Load`] if the sending side hangs up first.
pub fn wait_for_idle(
    events: &Receiver<LifecycleSignal>,
    main_frame: &str,
    deadline: Instant,
    budget: Duration,
) -> Result<()> {
    let mut tracker = IdleTracker::new(main_frame);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(signal) => {
                debug!("lifecycle event: {} (frame {})", signal.name, signal.frame_id);
                if tracker.observe(&signal) {
                    return Ok(());
                }
            }
            Err(RecvTimeoutError::Timeout) => return Err(Error::Timeout(budget.as_millis() as u64)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Load("lifecycle event stream closed before the page went idle".into()))
            }
        }
    }
}
