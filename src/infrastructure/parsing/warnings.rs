//! Deduplicated warning log
//!
//! Upstream data repeats the same oddity across many grid cells. Each
//! distinct message is logged once per update cycle; [`WarningLog::reset`]
//! starts a new cycle.

use std::collections::HashSet;

use tracing::warn;

#[derive(Debug, Default)]
pub struct WarningLog {
    seen: HashSet<String>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` unless it was already logged in this cycle.
    /// Returns `true` if the message was new.
    pub fn warn(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.seen.contains(&message) {
            return false;
        }
        warn!("{}", message);
        self.seen.insert(message);
        true
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }

    pub fn contains(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
