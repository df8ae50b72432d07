//! Page timer registry
//!
//! Pairs the start of a page view with its end. Each [`PageId`] owns at most
//! one [`TimerEntry`]; the entry stays cached after the timer closes so the
//! lifecycle bridge can reopen it with the same name and properties.
//!
//! The map is sharded per key, so pages that are started and stopped from
//! different threads do not contend with each other.

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::merge::merge;
use crate::types::{PageId, PageViewEvent, Properties, Result, TrackerError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Timer state for a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    /// Page name as passed to the last accepted start
    pub name: String,
    /// Properties recorded at start
    pub properties: Properties,
    /// Clock reading when the timer opened; `None` while closed
    pub started_at: Option<u64>,
    /// Clock reading of the last start or stop
    pub last_touched: u64,
}

impl TimerEntry {
    /// True while the timer is open
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

/// Concurrent registry of page timers
pub struct PageTimerRegistry {
    entries: DashMap<PageId, TimerEntry>,
    /// Closed page that eviction must keep (the page waiting for resume)
    pinned: Mutex<Option<PageId>>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl PageTimerRegistry {
    /// Create an empty registry reading time from `clock`
    pub fn new(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            pinned: Mutex::new(None),
            clock,
            config,
        }
    }

    /// Open the timer for `id`
    ///
    /// # Returns
    /// * `Err(TrackerError::DuplicateStart)` if the timer is already running;
    ///   the running timer is left untouched
    pub fn start(&self, id: PageId, name: &str, properties: Option<Properties>) -> Result<()> {
        let now = self.clock.now_millis();

        if !self.entries.contains_key(&id) {
            self.make_room();
        }

        match self.entries.entry(id) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_running() {
                    return Err(TrackerError::DuplicateStart {
                        id,
                        name: self.config.event_name(name),
                    });
                }

                entry.name = name.to_string();
                if let Some(properties) = properties.filter(|p| !p.is_empty()) {
                    entry.properties = properties;
                }
                entry.started_at = Some(now);
                entry.last_touched = now;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(TimerEntry {
                    name: name.to_string(),
                    properties: properties.unwrap_or_default(),
                    started_at: Some(now),
                    last_touched: now,
                });
            }
        }

        log::trace!("Timer opened for {id} ({name}) at {now}ms");
        Ok(())
    }

    /// Close the timer for `id` and build the resulting event
    ///
    /// Stored properties are merged with `properties` (the latter win) and the
    /// elapsed time is added under the configured duration key, in seconds
    /// with seven decimals.
    ///
    /// # Returns
    /// * `Err(TrackerError::NoValidStart)` if `id` was never started
    /// * `Err(TrackerError::NotRunning)` if the timer is already closed
    pub fn stop(&self, id: PageId, properties: Option<Properties>) -> Result<PageViewEvent> {
        let now = self.clock.now_millis();

        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(TrackerError::NoValidStart(id))?;
        entry.last_touched = now;

        let event_name = self.config.event_name(&entry.name);
        let started_at = entry.started_at.take().ok_or_else(|| TrackerError::NotRunning {
            id,
            name: event_name.clone(),
        })?;

        let mut all_properties = merge(Some(entry.properties.clone()), properties);
        all_properties.insert(
            self.config.duration_key.clone(),
            duration_seconds(now.saturating_sub(started_at)),
        );

        log::trace!("Timer closed for {id} after {}ms", now.saturating_sub(started_at));
        Ok(PageViewEvent::new(event_name, all_properties))
    }

    /// Id of the running timer that was started last
    ///
    /// Returns `None` when nothing is running. The scan reads a snapshot of
    /// the map and may miss starts and stops that race with it. Ties go to
    /// the larger id.
    pub fn most_recent_running_id(&self) -> Option<PageId> {
        self.entries
            .iter()
            .filter_map(|entry| entry.started_at.map(|started| (started, *entry.key())))
            .max()
            .map(|(_, id)| id)
    }

    /// Cached name and properties for `id`, running or not
    pub fn cached(&self, id: PageId) -> Option<(String, Properties)> {
        self.entries
            .get(&id)
            .map(|entry| (entry.name.clone(), entry.properties.clone()))
    }

    /// Snapshot of the entry for `id`
    pub fn entry(&self, id: PageId) -> Option<TimerEntry> {
        self.entries.get(&id).map(|entry| entry.clone())
    }

    /// True if the timer for `id` is open
    pub fn is_running(&self, id: PageId) -> bool {
        self.entries
            .get(&id)
            .map(|entry| entry.is_running())
            .unwrap_or(false)
    }

    /// Drop everything known about `id`
    ///
    /// Returns true if an entry was removed. A running timer is discarded
    /// without emitting anything.
    pub fn forget(&self, id: PageId) -> bool {
        match self.entries.remove(&id) {
            Some((_, entry)) => {
                if entry.is_running() {
                    log::debug!("Forgot {id} ({}) while its timer was running", entry.name);
                }
                true
            }
            None => false,
        }
    }

    /// Protect `id` from capacity eviction, replacing any earlier pin
    ///
    /// `None` clears the pin. An explicit [`forget`](Self::forget) still
    /// removes a pinned page.
    pub fn pin(&self, id: Option<PageId>) {
        *self.pinned.lock() = id;
    }

    /// Page currently protected from eviction
    pub fn pinned(&self) -> Option<PageId> {
        *self.pinned.lock()
    }

    /// Number of pages known to the registry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the registry holds no pages
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict closed entries, oldest first, until a new entry fits
    fn make_room(&self) {
        let capacity = self.config.max_entries.max(1);
        let pinned = self.pinned();

        while self.entries.len() >= capacity {
            let oldest_closed = self
                .entries
                .iter()
                .filter(|entry| !entry.is_running() && Some(*entry.key()) != pinned)
                .min_by_key(|entry| entry.last_touched)
                .map(|entry| *entry.key());

            let Some(id) = oldest_closed else {
                log::debug!("Registry over capacity ({capacity}) with nothing evictable");
                return;
            };

            if self.entries.remove_if(&id, |_, entry| !entry.is_running()).is_some() {
                log::debug!("Evicted closed page {id}");
            }
        }
    }
}

impl std::fmt::Debug for PageTimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTimerRegistry")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Format elapsed milliseconds as seconds rounded to seven decimals
fn duration_seconds(elapsed_millis: u64) -> String {
    format!("{:.7}", elapsed_millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn registry_with_clock(start: u64) -> (PageTimerRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let registry = PageTimerRegistry::new(TrackerConfig::new(), clock.clone());
        (registry, clock)
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(duration_seconds(2500), "2.5000000");
        assert_eq!(duration_seconds(0), "0.0000000");
        assert_eq!(duration_seconds(1), "0.0010000");
        assert_eq!(duration_seconds(61_234), "61.2340000");
    }

    #[test]
    fn test_start_stop_builds_event() {
        let (registry, clock) = registry_with_clock(1000);
        let id = PageId(1);

        registry.start(id, "Home", Some(props(&[("a", "1")]))).unwrap();
        clock.advance(2500);
        let event = registry.stop(id, Some(props(&[("b", "2")]))).unwrap();

        assert_eq!(event.name, "Page View: Home");
        assert_eq!(
            event.properties,
            props(&[("a", "1"), ("b", "2"), ("duration", "2.5000000")])
        );
        assert!(!registry.is_running(id));
    }

    #[test]
    fn test_stop_override_wins() {
        let (registry, _clock) = registry_with_clock(10);
        let id = PageId(1);

        registry.start(id, "Home", Some(props(&[("a", "1")]))).unwrap();
        let event = registry.stop(id, Some(props(&[("a", "9")]))).unwrap();
        assert_eq!(event.property("a"), Some("9"));
    }

    #[test]
    fn test_stop_without_start() {
        let (registry, _clock) = registry_with_clock(10);
        assert_eq!(
            registry.stop(PageId(5), None),
            Err(TrackerError::NoValidStart(PageId(5)))
        );
    }

    #[test]
    fn test_stop_twice() {
        let (registry, _clock) = registry_with_clock(10);
        let id = PageId(5);

        registry.start(id, "Home", None).unwrap();
        registry.stop(id, None).unwrap();
        assert!(matches!(
            registry.stop(id, None),
            Err(TrackerError::NotRunning { .. })
        ));
    }

    #[test]
    fn test_duplicate_start_keeps_first_start_time() {
        let (registry, clock) = registry_with_clock(100);
        let id = PageId(2);

        registry.start(id, "Home", None).unwrap();
        clock.advance(400);
        let err = registry.start(id, "Other", None).unwrap_err();

        assert!(matches!(err, TrackerError::DuplicateStart { .. }));
        let entry = registry.entry(id).unwrap();
        assert_eq!(entry.started_at, Some(100));
        assert_eq!(entry.name, "Home");
    }

    #[test]
    fn test_timer_can_start_at_clock_zero() {
        let (registry, clock) = registry_with_clock(0);
        let id = PageId(1);

        registry.start(id, "Home", None).unwrap();
        assert!(registry.is_running(id));
        clock.advance(1000);
        assert_eq!(
            registry.stop(id, None).unwrap().property("duration"),
            Some("1.0000000")
        );
    }

    #[test]
    fn test_restart_replaces_properties_only_when_given() {
        let (registry, _clock) = registry_with_clock(10);
        let id = PageId(1);

        registry.start(id, "Home", Some(props(&[("a", "1")]))).unwrap();
        registry.stop(id, Some(props(&[("b", "2")]))).unwrap();

        // Empty properties keep the cached ones, end-call properties are not cached
        registry.start(id, "Home", Some(Properties::new())).unwrap();
        assert_eq!(registry.cached(id).unwrap().1, props(&[("a", "1")]));
        registry.stop(id, None).unwrap();

        registry.start(id, "Home 2", Some(props(&[("c", "3")]))).unwrap();
        assert_eq!(
            registry.cached(id).unwrap(),
            ("Home 2".to_string(), props(&[("c", "3")]))
        );
    }

    #[test]
    fn test_most_recent_running_id() {
        let (registry, clock) = registry_with_clock(10);
        assert_eq!(registry.most_recent_running_id(), None);

        registry.start(PageId(1), "A", None).unwrap();
        clock.advance(5);
        registry.start(PageId(2), "B", None).unwrap();
        assert_eq!(registry.most_recent_running_id(), Some(PageId(2)));

        registry.stop(PageId(2), None).unwrap();
        assert_eq!(registry.most_recent_running_id(), Some(PageId(1)));

        registry.stop(PageId(1), None).unwrap();
        assert_eq!(registry.most_recent_running_id(), None);
    }

    #[test]
    fn test_most_recent_tie_goes_to_larger_id() {
        let (registry, _clock) = registry_with_clock(10);

        registry.start(PageId(8), "A", None).unwrap();
        registry.start(PageId(3), "B", None).unwrap();
        assert_eq!(registry.most_recent_running_id(), Some(PageId(8)));

        registry.start(PageId(12), "C", None).unwrap();
        assert_eq!(registry.most_recent_running_id(), Some(PageId(12)));
    }

    #[test]
    fn test_forget() {
        let (registry, _clock) = registry_with_clock(10);
        registry.start(PageId(1), "A", None).unwrap();

        assert!(registry.forget(PageId(1)));
        assert!(!registry.forget(PageId(1)));
        assert!(registry.is_empty());
        assert!(matches!(
            registry.stop(PageId(1), None),
            Err(TrackerError::NoValidStart(_))
        ));
    }

    #[test]
    fn test_capacity_evicts_oldest_closed() {
        let clock = Arc::new(ManualClock::new(10));
        let registry =
            PageTimerRegistry::new(TrackerConfig::new().with_max_entries(2), clock.clone());

        registry.start(PageId(1), "A", None).unwrap();
        registry.stop(PageId(1), None).unwrap();
        clock.advance(10);
        registry.start(PageId(2), "B", None).unwrap();
        registry.stop(PageId(2), None).unwrap();
        clock.advance(10);

        registry.start(PageId(3), "C", None).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.cached(PageId(1)).is_none());
        assert!(registry.cached(PageId(2)).is_some());
    }

    #[test]
    fn test_capacity_never_evicts_running() {
        let clock = Arc::new(ManualClock::new(10));
        let registry =
            PageTimerRegistry::new(TrackerConfig::new().with_max_entries(1), clock.clone());

        registry.start(PageId(1), "A", None).unwrap();
        registry.start(PageId(2), "B", None).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.is_running(PageId(1)));
        assert!(registry.is_running(PageId(2)));
    }

    #[test]
    fn test_capacity_skips_pinned_page() {
        let clock = Arc::new(ManualClock::new(10));
        let registry =
            PageTimerRegistry::new(TrackerConfig::new().with_max_entries(2), clock.clone());

        registry.start(PageId(1), "A", None).unwrap();
        registry.stop(PageId(1), None).unwrap();
        registry.pin(Some(PageId(1)));
        clock.advance(10);
        registry.start(PageId(2), "B", None).unwrap();
        registry.stop(PageId(2), None).unwrap();
        clock.advance(10);

        registry.start(PageId(3), "C", None).unwrap();
        assert!(registry.cached(PageId(1)).is_some());
        assert!(registry.cached(PageId(2)).is_none());

        // Pinned page still goes away when forgotten explicitly
        assert!(registry.forget(PageId(1)));
    }

    #[test]
    fn test_concurrent_pages() {
        let registry = Arc::new(PageTimerRegistry::new(
            TrackerConfig::new().with_max_entries(1024),
            Arc::new(ManualClock::new(10)),
        ));

        let handles: Vec<_> = (0..8u64)
            .map(|n| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for round in 0..50u64 {
                        let id = PageId(n * 1000 + round);
                        registry.start(id, "Page", None).unwrap();
                        registry.stop(id, None).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 400);
        assert_eq!(registry.most_recent_running_id(), None);
    }
}
