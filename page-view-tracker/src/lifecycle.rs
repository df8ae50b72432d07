//! Lifecycle bridge
//!
//! Keeps the current page's timer consistent across app suspension: the page
//! is closed when the app enters the background and reopened, with the same
//! name and properties, when it comes back to the foreground.
//!
//! Subscriptions are exchanged on every transition so that exactly one of the
//! background/foreground handlers is armed at a time:
//!
//! ```text
//!   attach ──► [background, terminate]
//!   EnteredBackground   ──► [foreground, terminate]  + end_last_page_start
//!   WillEnterForeground ──► [background, terminate]  + start_last_page_end
//!   WillTerminate       ──► []
//! ```

use crate::tracker::PageTracker;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// OS notifications the bridge reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleSignal {
    /// The app moved to the background
    EnteredBackground,
    /// The app is about to return to the foreground
    WillEnterForeground,
    /// The app is about to be terminated
    WillTerminate,
}

impl fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleSignal::EnteredBackground => write!(f, "EnteredBackground"),
            LifecycleSignal::WillEnterForeground => write!(f, "WillEnterForeground"),
            LifecycleSignal::WillTerminate => write!(f, "WillTerminate"),
        }
    }
}

/// Handle for an active notification subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// Notifier-assigned token
    pub token: u64,
    /// Signal the subscription listens to
    pub signal: LifecycleSignal,
}

/// Source of OS lifecycle notifications
///
/// Hosts implement this over their platform's notification center and route
/// delivered notifications to [`LifecycleBridge::handle`].
pub trait LifecycleNotifier: Send + Sync {
    /// Start listening for `signal`
    fn subscribe(&self, signal: LifecycleSignal) -> Subscription;

    /// Stop listening on a subscription returned by `subscribe`
    fn unsubscribe(&self, subscription: Subscription);
}

/// Notifier that only keeps the list of active subscriptions
///
/// Useful for tests and for hosts that deliver signals by hand.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    next_token: AtomicU64,
    active: Mutex<Vec<Subscription>>,
}

impl InMemoryNotifier {
    /// Create a notifier with no subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active subscriptions for `signal`
    pub fn active_count(&self, signal: LifecycleSignal) -> usize {
        self.active
            .lock()
            .iter()
            .filter(|sub| sub.signal == signal)
            .count()
    }

    /// True if anyone listens for `signal`
    pub fn is_subscribed(&self, signal: LifecycleSignal) -> bool {
        self.active_count(signal) > 0
    }

    /// Number of active subscriptions across all signals
    pub fn total_active(&self) -> usize {
        self.active.lock().len()
    }
}

impl LifecycleNotifier for InMemoryNotifier {
    fn subscribe(&self, signal: LifecycleSignal) -> Subscription {
        let subscription = Subscription {
            token: self.next_token.fetch_add(1, Ordering::SeqCst) + 1,
            signal,
        };
        self.active.lock().push(subscription);
        subscription
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.active.lock().retain(|sub| *sub != subscription);
    }
}

#[derive(Debug, Default)]
struct Slots {
    background: Option<Subscription>,
    foreground: Option<Subscription>,
    terminate: Option<Subscription>,
}

impl Slots {
    fn slot(&mut self, signal: LifecycleSignal) -> &mut Option<Subscription> {
        match signal {
            LifecycleSignal::EnteredBackground => &mut self.background,
            LifecycleSignal::WillEnterForeground => &mut self.foreground,
            LifecycleSignal::WillTerminate => &mut self.terminate,
        }
    }
}

/// Pauses and resumes the current page timer across app suspension
pub struct LifecycleBridge {
    tracker: Arc<PageTracker>,
    notifier: Arc<dyn LifecycleNotifier>,
    slots: Mutex<Slots>,
}

impl LifecycleBridge {
    /// Create a bridge; nothing is subscribed until [`attach`](Self::attach)
    pub fn new(tracker: Arc<PageTracker>, notifier: Arc<dyn LifecycleNotifier>) -> Self {
        Self {
            tracker,
            notifier,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Subscribe to background and terminate notifications
    ///
    /// Calling it again while already attached is a no-op.
    pub fn attach(&self) {
        log::info!("Attaching lifecycle bridge");

        let mut slots = self.slots.lock();
        self.arm(&mut slots, LifecycleSignal::EnteredBackground);
        self.arm(&mut slots, LifecycleSignal::WillTerminate);
    }

    /// React to a delivered notification
    ///
    /// Signals the bridge is not currently subscribed to are ignored, so a
    /// duplicated delivery cannot close or reopen a page twice.
    pub fn handle(&self, signal: LifecycleSignal) {
        let mut slots = self.slots.lock();
        if slots.slot(signal).is_none() {
            log::debug!("Ignoring {signal}: not subscribed");
            return;
        }

        log::info!("{signal}");
        match signal {
            LifecycleSignal::EnteredBackground => {
                self.disarm(&mut slots, LifecycleSignal::EnteredBackground);
                self.arm(&mut slots, LifecycleSignal::WillEnterForeground);
                drop(slots);

                self.tracker.end_last_page_start();
            }
            LifecycleSignal::WillEnterForeground => {
                self.disarm(&mut slots, LifecycleSignal::WillEnterForeground);
                self.arm(&mut slots, LifecycleSignal::EnteredBackground);
                drop(slots);

                self.tracker.start_last_page_end();
            }
            LifecycleSignal::WillTerminate => {
                self.disarm(&mut slots, LifecycleSignal::EnteredBackground);
                self.disarm(&mut slots, LifecycleSignal::WillEnterForeground);
                self.disarm(&mut slots, LifecycleSignal::WillTerminate);
            }
        }
    }

    /// True if the bridge holds a subscription for `signal`
    pub fn is_subscribed(&self, signal: LifecycleSignal) -> bool {
        self.slots.lock().slot(signal).is_some()
    }

    /// Tracker the bridge drives
    pub fn tracker(&self) -> &Arc<PageTracker> {
        &self.tracker
    }

    fn arm(&self, slots: &mut Slots, signal: LifecycleSignal) {
        let slot = slots.slot(signal);
        if slot.is_none() {
            *slot = Some(self.notifier.subscribe(signal));
        }
    }

    fn disarm(&self, slots: &mut Slots, signal: LifecycleSignal) {
        if let Some(subscription) = slots.slot(signal).take() {
            self.notifier.unsubscribe(subscription);
        }
    }
}

impl fmt::Debug for LifecycleBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBridge")
            .field("slots", &*self.slots.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::TrackerConfig;
    use crate::sink::RecordingSink;
    use crate::types::PageId;

    struct Harness {
        bridge: LifecycleBridge,
        notifier: Arc<InMemoryNotifier>,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingSink>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(500));
        let sink = Arc::new(RecordingSink::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let tracker = Arc::new(PageTracker::new(
            TrackerConfig::new(),
            clock.clone(),
            sink.clone(),
        ));
        let bridge = LifecycleBridge::new(tracker, notifier.clone());

        Harness {
            bridge,
            notifier,
            clock,
            sink,
        }
    }

    #[test]
    fn test_attach_is_idempotent() {
        let h = harness();
        h.bridge.attach();
        h.bridge.attach();

        assert_eq!(h.notifier.active_count(LifecycleSignal::EnteredBackground), 1);
        assert_eq!(h.notifier.active_count(LifecycleSignal::WillTerminate), 1);
        assert!(!h.notifier.is_subscribed(LifecycleSignal::WillEnterForeground));
    }

    #[test]
    fn test_subscriptions_exchange_on_transitions() {
        let h = harness();
        h.bridge.attach();

        h.bridge.handle(LifecycleSignal::EnteredBackground);
        assert!(!h.bridge.is_subscribed(LifecycleSignal::EnteredBackground));
        assert_eq!(h.notifier.active_count(LifecycleSignal::WillEnterForeground), 1);

        h.bridge.handle(LifecycleSignal::WillEnterForeground);
        assert!(!h.bridge.is_subscribed(LifecycleSignal::WillEnterForeground));
        assert_eq!(h.notifier.active_count(LifecycleSignal::EnteredBackground), 1);
        assert_eq!(h.notifier.total_active(), 2);
    }

    #[test]
    fn test_duplicate_background_is_ignored() {
        let h = harness();
        h.bridge.attach();
        h.bridge.tracker().track_page_view_start(PageId(1), "Home", None);

        h.bridge.handle(LifecycleSignal::EnteredBackground);
        h.bridge.handle(LifecycleSignal::EnteredBackground);

        assert_eq!(h.sink.len(), 1);
        assert_eq!(h.bridge.tracker().last_active_page(), Some(PageId(1)));
    }

    #[test]
    fn test_foreground_before_background_is_ignored() {
        let h = harness();
        h.bridge.attach();
        h.bridge.tracker().track_page_view_start(PageId(1), "Home", None);

        h.bridge.handle(LifecycleSignal::WillEnterForeground);
        assert!(h.bridge.tracker().registry().is_running(PageId(1)));
        assert!(h.sink.is_empty());
    }

    #[test]
    fn test_background_foreground_reopens_page() {
        let h = harness();
        h.bridge.attach();
        let tracker = h.bridge.tracker();

        tracker.track_page_view_start(PageId(4), "Forecast", None);
        h.clock.advance(3_000);
        h.bridge.handle(LifecycleSignal::EnteredBackground);
        assert!(!tracker.registry().is_running(PageId(4)));

        h.clock.advance(30_000);
        h.bridge.handle(LifecycleSignal::WillEnterForeground);
        assert!(tracker.registry().is_running(PageId(4)));

        h.clock.advance(500);
        tracker.track_page_view_end(PageId(4), None);

        let events = h.sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].property("duration"), Some("3.0000000"));
        assert_eq!(events[1].name, "Page View: Forecast");
        assert_eq!(events[1].property("duration"), Some("0.5000000"));
    }

    #[test]
    fn test_terminate_releases_everything() {
        let h = harness();
        h.bridge.attach();
        h.bridge.handle(LifecycleSignal::EnteredBackground);
        h.bridge.handle(LifecycleSignal::WillTerminate);

        assert_eq!(h.notifier.total_active(), 0);

        h.bridge.tracker().track_page_view_start(PageId(1), "Home", None);
        h.bridge.handle(LifecycleSignal::EnteredBackground);
        assert!(h.bridge.tracker().registry().is_running(PageId(1)));
    }
}
