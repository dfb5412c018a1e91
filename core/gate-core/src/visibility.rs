//! Delayed "main experience visible" flag.
//!
//! The auth overlay and the main experience are driven independently. Flipping
//! the flag in the same tick as a session transition lets both mount at once,
//! so each observation commits its value after a short delay instead.
//!
//! Only the most recent observation's commit is kept pending; an older one is
//! cancelled when a new observation arrives and every pending commit is
//! cancelled on drop, so no timer outlives its owner.

use std::sync::Arc;
use std::time::Duration;

use session_protocol::SessionTag;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::DEFAULT_VISIBILITY_DELAY_MS;
use crate::session::SessionState;

pub const VISIBILITY_DELAY: Duration = Duration::from_millis(DEFAULT_VISIBILITY_DELAY_MS);

/// Tags that show the main experience. Everything else keeps the splash.
pub fn is_experience_visible(tag: SessionTag) -> bool {
    matches!(tag, SessionTag::Authorised | SessionTag::Visiting)
}

pub struct VisibilityDebouncer {
    delay: Duration,
    flag: Arc<watch::Sender<bool>>,
    pending: Option<JoinHandle<()>>,
}

impl VisibilityDebouncer {
    pub fn new(delay: Duration) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            delay,
            flag: Arc::new(flag),
            pending: None,
        }
    }

    /// Schedules a commit of the visibility derived from `state`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe(&mut self, state: &SessionState) {
        let desired = is_experience_visible(state.tag);
        self.cancel_pending();

        let flag = Arc::clone(&self.flag);
        let delay = self.delay;
        let tag = state.tag;
        debug!(tag = %tag, desired, delay_ms = delay.as_millis() as u64, "Visibility commit scheduled");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let changed = flag.send_if_modified(|current| {
                if *current == desired {
                    return false;
                }
                *current = desired;
                true
            });
            if changed {
                info!(tag = %tag, visible = desired, "Main experience visibility changed");
            }
        }));
    }

    /// Cancels the outstanding commit, if any. The flag keeps its last value.
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                debug!("Superseded visibility commit cancelled");
            }
            handle.abort();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_visible(&self) -> bool {
        *self.flag.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }
}

impl Default for VisibilityDebouncer {
    fn default() -> Self {
        Self::new(VISIBILITY_DELAY)
    }
}

impl Drop for VisibilityDebouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
