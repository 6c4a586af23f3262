//! User-visible notifications ("toasts"). Messages are shown as-is, so they
//! must never contain credentials.

use std::sync::{Mutex, PoisonError};
use tracing::{error, info};

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub level: Level,
    pub message: String,
}

/// Queue of pending toasts, also mirrored to the log.
#[derive(Debug, Default)]
pub struct Toasts {
    queue: Mutex<Vec<Toast>>,
}

impl Toasts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, message: &str) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Toast {
                level,
                message: message.to_string(),
            });
    }

    /// Removes and returns every pending toast.
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Toast> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for Toasts {
    fn success(&self, message: &str) {
        info!(toast = "success", "{message}");
        self.push(Level::Success, message);
    }

    fn error(&self, message: &str) {
        error!(toast = "error", "{message}");
        self.push(Level::Error, message);
    }
}
