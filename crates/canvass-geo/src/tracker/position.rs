//! The device positioning capability, modelled as a subscription that
//! yields events over a channel.

use std::time::Duration;

use canvass_core::Coordinate;
use tokio::sync::mpsc;

use crate::error::PositionError;

/// Options passed to the platform when a watch is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the platform may hand back. Zero forces a fresh fix.
    pub max_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(5),
            max_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Update(Coordinate),
    Error(PositionError),
}

/// A platform positioning capability.
pub trait PositionSource: Send + Sync {
    /// `false` when the platform exposes no positioning at all.
    fn is_available(&self) -> bool;

    /// Opens a continuous watch. Events arrive until the watch is cancelled
    /// or the platform closes its sending half.
    fn watch(&self, options: WatchOptions) -> PositionWatch;
}

/// Handle to an open position watch. Cancelling is idempotent and dropping
/// the handle cancels it.
#[derive(Debug)]
pub struct PositionWatch {
    events: mpsc::Receiver<PositionEvent>,
    active: bool,
}

impl PositionWatch {
    /// Creates a watch together with the sender a [`PositionSource`]
    /// implementation feeds.
    #[must_use]
    pub fn channel(buffer: usize) -> (mpsc::Sender<PositionEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            tx,
            Self {
                events: rx,
                active: true,
            },
        )
    }

    /// Waits for the next event. `None` once cancelled or once the source
    /// has hung up.
    pub async fn next(&mut self) -> Option<PositionEvent> {
        if !self.active {
            return None;
        }
        let event = self.events.recv().await;
        if event.is_none() {
            self.active = false;
        }
        event
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Closes the subscription. Returns `true` only for the call that
    /// actually released it.
    pub fn cancel(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.events.close();
        true
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_is_idempotent_and_closes_sender() {
        let (tx, mut watch) = PositionWatch::channel(4);
        assert!(watch.cancel());
        assert!(!watch.cancel());
        assert!(tx.is_closed());
        assert_eq!(watch.next().await, None);
    }

    #[tokio::test]
    async fn next_reports_hang_up() {
        let (tx, mut watch) = PositionWatch::channel(1);
        tx.send(PositionEvent::Error(PositionError::Timeout))
            .await
            .unwrap();
        drop(tx);
        assert_eq!(
            watch.next().await,
            Some(PositionEvent::Error(PositionError::Timeout))
        );
        assert_eq!(watch.next().await, None);
        assert!(!watch.is_active());
    }
}
