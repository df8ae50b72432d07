//! External collaborators: the analytics transport and the crash reporter
//!
//! The tracker never talks to a vendor SDK directly. Hosts wrap theirs in
//! [`EventSink`] and, in debug builds, [`CrashReporter`].

use crate::types::{PageViewEvent, Properties};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Analytics transport accepting named events with properties
pub trait EventSink: Send + Sync {
    /// Whether the transport is currently accepting events
    fn is_enabled(&self) -> bool;

    /// Hand one event to the transport
    fn send(&self, name: &str, properties: &Properties);
}

/// Crash-reporting hook used to verify crash collection end to end
pub trait CrashReporter: Send + Sync {
    /// Deliberately crash the process through the reporter
    fn trigger_test_crash(&self);
}

/// Sink that is never enabled, so every event ends up in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

impl EventSink for DisabledSink {
    fn is_enabled(&self) -> bool {
        false
    }

    fn send(&self, name: &str, _properties: &Properties) {
        log::trace!("DisabledSink dropped event {name}");
    }
}

/// In-memory sink that keeps every event it receives
///
/// Can be switched on and off at runtime to mimic an SDK whose enabled flag
/// is controlled by the user.
#[derive(Debug)]
pub struct RecordingSink {
    enabled: AtomicBool,
    events: Mutex<Vec<PageViewEvent>>,
}

impl RecordingSink {
    /// Create an enabled recording sink
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Enable or disable the sink
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Copy of all events received so far
    pub fn events(&self) -> Vec<PageViewEvent> {
        self.events.lock().clone()
    }

    /// Remove and return all events received so far
    pub fn take(&self) -> Vec<PageViewEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of events received so far
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if no events were received
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn send(&self, name: &str, properties: &Properties) {
        self.events
            .lock()
            .push(PageViewEvent::new(name, properties.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_collects() {
        let sink = RecordingSink::new();
        assert!(sink.is_enabled());
        assert!(sink.is_empty());

        sink.send("Page View: Home", &Properties::new());
        assert_eq!(sink.len(), 1);

        let taken = sink.take();
        assert_eq!(taken[0].name, "Page View: Home");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_recording_sink_toggle() {
        let sink = RecordingSink::new();
        sink.set_enabled(false);
        assert!(!sink.is_enabled());
    }

    #[test]
    fn test_disabled_sink() {
        assert!(!DisabledSink.is_enabled());
    }
}
