//! Trailing-edge debounce for keystroke-driven lookups.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::trace;
use tokio::task::JoinHandle;

/// Runs only the last of a burst of calls, `window` after it was made.
///
/// Every `call` supersedes the pending one; a superseded call never runs.
/// Calls spaced further apart than `window` each run.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, generation: Arc::new(AtomicU64::new(0)) }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `f`, cancelling whatever was scheduled before.
    pub fn call<F, Fut>(&self, f: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if latest.load(Ordering::SeqCst) == generation {
                f().await;
            } else {
                trace!("debounced call {} superseded", generation);
            }
        })
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
