use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Page navigation as seen by the session manager.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    fn push(&self, route: &str);
}

#[derive(Debug)]
struct History {
    current: String,
    visited: Vec<String>,
}

/// Navigator that tracks the current route and every push, used by the CLI and tests.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<History>,
}

impl MemoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(History {
                current: initial.into(),
                visited: Vec::new(),
            }),
        }
    }

    /// Routes pushed so far, oldest first.
    #[must_use]
    pub fn pushed(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visited
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_route(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn push(&self, route: &str) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = %history.current, to = route, "navigate");
        history.current = route.to_string();
        history.visited.push(route.to_string());
    }
}
