//! User-facing notices raised at action boundaries

use std::sync::Mutex;

use log::{error, info, warn};

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}

/// Sink for notices; the host decides how to show them.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the `log` facade.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(m) => info!("{}", m),
            Notice::Warning(m) => warn!("{}", m),
            Notice::Error(m) => error!("{}", m),
        }
    }
}

/// Keeps every notice in memory, in order.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the notices collected so far.
    pub fn take(&self) -> Vec<Notice> {
        self.notices.lock().map(|mut v| std::mem::take(&mut *v)).unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut v) = self.notices.lock() {
            v.push(notice);
        }
    }
}
