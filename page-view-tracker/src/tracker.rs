//! Page tracker facade
//!
//! [`PageTracker`] is the composition root the UI layer talks to. It owns the
//! timer registry, the emitter and the last-active-page slot used across app
//! suspension. Every call is fire-and-forget: misuse is logged, never raised.

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::emitter::EventEmitter;
use crate::registry::PageTimerRegistry;
use crate::sink::{CrashReporter, EventSink};
use crate::types::{PageId, Properties, TrackerError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tracks page views and page view durations
pub struct PageTracker {
    config: TrackerConfig,
    registry: PageTimerRegistry,
    emitter: EventEmitter,
    /// Page that was open when the app last went to the background
    last_active: Mutex<Option<PageId>>,
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    crash_reporter: Option<Arc<dyn CrashReporter>>,
}

impl PageTracker {
    /// Create a tracker
    ///
    /// # Arguments
    /// * `config` - Event naming, logging and capacity settings
    /// * `clock` - Monotonic time source for durations
    /// * `sink` - Analytics transport receiving the events
    ///
    /// # Example
    /// ```
    /// use page_view_tracker::{ManualClock, PageId, PageTracker, RecordingSink, TrackerConfig};
    /// use std::sync::Arc;
    ///
    /// let clock = Arc::new(ManualClock::new(1));
    /// let sink = Arc::new(RecordingSink::new());
    /// let tracker = PageTracker::new(TrackerConfig::new(), clock.clone(), sink.clone());
    ///
    /// tracker.track_page_view_start(PageId(1), "Home", None);
    /// clock.advance(1500);
    /// tracker.track_page_view_end(PageId(1), None);
    ///
    /// assert_eq!(sink.events()[0].property("duration"), Some("1.5000000"));
    /// ```
    pub fn new(config: TrackerConfig, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        let emitter = EventEmitter::new(sink, config.log_name_width);
        let registry = PageTimerRegistry::new(config.clone(), clock);

        Self {
            config,
            registry,
            emitter,
            last_active: Mutex::new(None),
            crash_reporter: None,
        }
    }

    /// Builder method: attach a crash reporter for `generate_test_crash`
    pub fn with_crash_reporter(mut self, reporter: Arc<dyn CrashReporter>) -> Self {
        self.crash_reporter = Some(reporter);
        self
    }

    /// Send a single untimed page view event
    pub fn track_page_view(&self, name: &str, properties: Option<Properties>) {
        let properties = properties.unwrap_or_default();
        self.emitter.emit(&self.config.event_name(name), &properties);
    }

    /// Start timing a page view
    ///
    /// Call when the view appears. A second call for the same `id` without a
    /// matching end is ignored.
    pub fn track_page_view_start(&self, id: PageId, name: &str, properties: Option<Properties>) {
        if let Err(err) = self.registry.start(id, name, properties) {
            self.report(err);
        }
    }

    /// Stop timing a page view and send the resulting event
    ///
    /// Call when the view disappears. `properties` are merged over the ones
    /// given at start.
    pub fn track_page_view_end(&self, id: PageId, properties: Option<Properties>) {
        match self.registry.stop(id, properties) {
            Ok(event) => self.emitter.emit(&event.name, &event.properties),
            Err(err) => self.report(err),
        }
    }

    /// Close the most recently started page and remember it
    ///
    /// Hosts call this when the app is about to be suspended, either directly
    /// or through [`LifecycleBridge`](crate::LifecycleBridge). When nothing is
    /// running the page remembered by an earlier call is kept, so calling it
    /// twice before resuming is harmless.
    pub fn end_last_page_start(&self) {
        let Some(id) = self.registry.most_recent_running_id() else {
            log::debug!("No running page to suspend");
            return;
        };

        let mut last_active = self.last_active.lock();
        *last_active = Some(id);
        self.registry.pin(Some(id));
        drop(last_active);

        log::debug!("Suspending page {id}");
        self.track_page_view_end(id, None);
    }

    /// Reopen the page remembered by `end_last_page_start`
    ///
    /// Hosts call this when the app returns to the foreground. The page is
    /// restarted with its cached name and properties, so the time spent in
    /// the background is not counted.
    pub fn start_last_page_end(&self) {
        let mut slot = self.last_active.lock();
        let last_active = slot.take();
        self.registry.pin(None);
        drop(slot);

        let Some(id) = last_active else {
            log::debug!("{}", TrackerError::NoLastActivePage);
            return;
        };

        match self.registry.cached(id) {
            Some((name, properties)) => {
                log::debug!("Resuming page {id} ({name})");
                self.track_page_view_start(id, &name, Some(properties));
            }
            None => self.report(TrackerError::MissingCachedState(id)),
        }
    }

    /// Release everything cached for `id`
    ///
    /// Hosts call this when a view is destroyed. Returns true if the page was
    /// known.
    pub fn forget_page(&self, id: PageId) -> bool {
        let mut last_active = self.last_active.lock();
        if *last_active == Some(id) {
            *last_active = None;
            self.registry.pin(None);
        }
        drop(last_active);

        self.registry.forget(id)
    }

    /// Page remembered for the next resume, if any
    pub fn last_active_page(&self) -> Option<PageId> {
        *self.last_active.lock()
    }

    /// Underlying timer registry
    pub fn registry(&self) -> &PageTimerRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Crash the app through the crash reporter (debug builds only)
    #[cfg(debug_assertions)]
    pub fn generate_test_crash(&self) {
        match &self.crash_reporter {
            Some(reporter) => reporter.trigger_test_crash(),
            None => log::warn!("No crash reporter attached, test crash skipped"),
        }
    }

    fn report(&self, err: TrackerError) {
        log::warn!("TrackEvent :: {err}");
    }
}

impl std::fmt::Debug for PageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTracker")
            .field("registry", &self.registry)
            .field("emitter", &self.emitter)
            .field("last_active", &*self.last_active.lock())
            .finish()
    }
}
