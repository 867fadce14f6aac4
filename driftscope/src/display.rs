// THEORY:
// The `display` module owns the one concurrently-shared record in the whole
// process: "the image pair currently being shown." The publisher wraps a
// `tokio::sync::watch` channel, so every publish swaps in a complete new
// snapshot — readers observe the previous record or the new one, never a torn
// mix — and every subscribed listener is woken without any polling interval.
//
// The watch channel holds exactly one slot. Rapid successive publishes coalesce
// to the latest value (last writer wins), and a slow listener never buffers
// more than the most recent snapshot.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::watch;

/// The process-wide record of the most recently processed image pair.
/// `index: None` is the initial "nothing shown yet" state; it never returns
/// once the first pair is published (resets only with the process).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub index: Option<usize>,
    pub timestamp_micros: u64,
    pub original: String,
    pub modified: String,
    pub filename: String,
}

impl DisplayState {
    pub fn is_showing(&self) -> bool {
        self.index.is_some()
    }
}

/// The single process-wide publisher. Owned by the server state and passed by
/// reference to every handler; never module-level global state.
#[derive(Debug)]
pub struct DisplayPublisher {
    tx: watch::Sender<DisplayState>,
}

impl DisplayPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DisplayState::default());
        Self { tx }
    }

    /// Replaces the whole display record atomically and wakes every listener.
    /// Timestamps are strictly monotonic: a publish landing within the same
    /// microsecond as the previous one is bumped past it.
    pub fn publish(&self, index: usize, original: String, modified: String, filename: String) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        self.tx.send_modify(|state| {
            let timestamp_micros = now.max(state.timestamp_micros + 1);
            *state = DisplayState {
                index: Some(index),
                timestamp_micros,
                original,
                modified,
                filename,
            };
        });
    }

    /// A complete snapshot of the current record.
    pub fn current(&self) -> DisplayState {
        self.tx.borrow().clone()
    }

    /// A receiver for one listener. Each receiver tracks its own read position,
    /// so every listener sees every distinct value, possibly coalesced.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.tx.subscribe()
    }
}

impl Default for DisplayPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_the_no_image_sentinel() {
        let publisher = DisplayPublisher::new();
        let state = publisher.current();
        assert_eq!(state.index, None);
        assert!(!state.is_showing());
    }

    #[test]
    fn publish_replaces_the_whole_record() {
        let publisher = DisplayPublisher::new();
        publisher.publish(2, "/o/c.png".into(), "/m/c.png".into(), "c.png".into());
        let state = publisher.current();
        assert_eq!(state.index, Some(2));
        assert_eq!(state.filename, "c.png");
        assert_eq!(state.original, "/o/c.png");
        assert_eq!(state.modified, "/m/c.png");
    }

    #[test]
    fn timestamps_are_strictly_monotonic() {
        let publisher = DisplayPublisher::new();
        publisher.publish(0, String::new(), String::new(), "a.png".into());
        let first = publisher.current().timestamp_micros;
        publisher.publish(1, String::new(), String::new(), "b.png".into());
        let second = publisher.current().timestamp_micros;
        assert!(second > first, "{second} not greater than {first}");
    }

    #[tokio::test]
    async fn each_listener_observes_changes_independently() {
        let publisher = DisplayPublisher::new();
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        publisher.publish(0, String::new(), String::new(), "a.png".into());
        first.changed().await.expect("first listener change");
        second.changed().await.expect("second listener change");
        assert_eq!(first.borrow_and_update().index, Some(0));
        assert_eq!(second.borrow_and_update().index, Some(0));

        // Two publishes in one window coalesce to the latest value.
        publisher.publish(1, String::new(), String::new(), "b.png".into());
        publisher.publish(2, String::new(), String::new(), "c.png".into());
        first.changed().await.expect("coalesced change");
        assert_eq!(first.borrow_and_update().index, Some(2));
    }
}
