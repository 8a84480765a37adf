use std::collections::VecDeque;

use tokio::sync::watch;

/// Number of status lines retained for diagnostics.
pub const STATUS_CAPACITY: usize = 20;

/// Bounded, observable log of human-readable tracker status lines.
#[derive(Debug)]
pub struct StatusLog {
    lines: VecDeque<String>,
    latest: watch::Sender<Option<String>>,
}

impl Default for StatusLog {
    fn default() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            lines: VecDeque::with_capacity(STATUS_CAPACITY),
            latest,
        }
    }
}

impl StatusLog {
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(status = %line, "location status");
        if self.lines.len() == STATUS_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line.clone());
        self.latest.send_replace(Some(line));
    }

    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Receiver that observes every new latest line.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.latest.subscribe()
    }
}
