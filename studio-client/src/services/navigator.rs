use std::sync::{Mutex, PoisonError};

/// Moves the user to another destination, such as the subscription page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: &str);
}

/// Logs each navigation and remembers where it went.
#[derive(Default)]
pub struct LogNavigator {
    visited: Mutex<Vec<String>>,
}

impl LogNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for LogNavigator {
    fn navigate(&self, destination: &str) {
        tracing::info!(%destination, "Navigating");
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination.to_string());
    }
}
