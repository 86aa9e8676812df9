//! Transient message banner.
//!
//! Showing a message cancels any pending hide; success messages schedule a
//! new hide after the configured delay. A timer only hides the message it
//! was scheduled for (generation check), so a stale timer can never hide a
//! newer message. Error messages stay until replaced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Success,
    Error,
}

/// What the banner currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub tone: Tone,
    pub visible: bool,
}

#[derive(Debug, Default)]
struct BannerState {
    message: Message,
    generation: u64,
    hide_task: Option<AbortHandle>,
}

impl BannerState {
    fn cancel_pending_hide(&mut self) {
        if let Some(task) = self.hide_task.take() {
            task.abort();
        }
    }
}

impl Drop for BannerState {
    fn drop(&mut self) {
        self.cancel_pending_hide();
    }
}

#[derive(Debug, Clone)]
pub struct MessageBanner {
    state: Arc<Mutex<BannerState>>,
    hide_delay: Duration,
}

impl MessageBanner {
    pub fn new(hide_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BannerState::default())),
            hide_delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BannerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Message {
        self.lock().message.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.lock().message.visible
    }

    /// Green message that hides itself after the delay.
    pub fn show_success(&self, text: &str) {
        let mut state = self.lock();
        let generation = show(&mut state, text, Tone::Success);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let weak = Arc::downgrade(&self.state);
                let delay = self.hide_delay;
                let task = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    hide_if_current(&weak, generation);
                });
                state.hide_task = Some(task.abort_handle());
            }
            Err(_) => tracing::warn!("no tokio runtime; success message will not auto-hide"),
        }
    }

    /// Red message; stays until replaced or hidden.
    pub fn show_error(&self, text: &str) {
        let mut state = self.lock();
        show(&mut state, text, Tone::Error);
    }

    /// Idempotent.
    pub fn hide(&self) {
        let mut state = self.lock();
        state.cancel_pending_hide();
        state.message.visible = false;
    }
}

fn show(state: &mut BannerState, text: &str, tone: Tone) -> u64 {
    state.cancel_pending_hide();
    state.generation += 1;
    state.message = Message {
        text: text.to_string(),
        tone,
        visible: true,
    };
    state.generation
}

fn hide_if_current(state: &Weak<Mutex<BannerState>>, generation: u64) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if state.generation == generation {
        state.message.visible = false;
        state.hide_task = None;
    }
}
