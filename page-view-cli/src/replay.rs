//! Scenario replay
//!
//! Drives a [`PageTracker`] through the steps of a [`Scenario`] on a manual
//! clock and collects whatever reaches the sink.

use crate::config::{Scenario, Step};
use chrono::{DateTime, Utc};
use page_view_tracker::{
    format_properties, Clock, EventSink, InMemoryNotifier, LifecycleBridge, LifecycleSignal,
    ManualClock, PageId, PageTracker, Properties,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// An event as received by the replay sink
#[derive(Debug, Clone, Serialize)]
pub struct ReplayedEvent {
    /// Scenario clock reading when the event arrived
    pub at_millis: u64,
    /// Wall-clock receipt time
    pub received_at: DateTime<Utc>,
    pub name: String,
    pub properties: Properties,
}

/// Outcome of a replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub events: Vec<ReplayedEvent>,
    /// Pages still known to the registry after the last step
    pub pages_cached: usize,
    /// Page still running after the last step, if any
    pub running_page: Option<PageId>,
}

/// Sink stamping every event with the scenario clock
struct ReplaySink {
    enabled: bool,
    clock: Arc<ManualClock>,
    events: Mutex<Vec<ReplayedEvent>>,
}

impl EventSink for ReplaySink {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn send(&self, name: &str, properties: &Properties) {
        self.events.lock().push(ReplayedEvent {
            at_millis: self.clock.now_millis(),
            received_at: Utc::now(),
            name: name.to_string(),
            properties: properties.clone(),
        });
    }
}

/// Replay all steps of `scenario`
pub fn run(scenario: &Scenario) -> ReplayReport {
    let clock = Arc::new(ManualClock::new(scenario.start_millis));
    let sink = Arc::new(ReplaySink {
        enabled: scenario.sink_enabled,
        clock: clock.clone(),
        events: Mutex::new(Vec::new()),
    });
    let tracker = Arc::new(PageTracker::new(
        scenario.tracker.clone(),
        clock.clone(),
        sink.clone(),
    ));

    let bridge = LifecycleBridge::new(tracker.clone(), Arc::new(InMemoryNotifier::new()));
    if scenario.attach_bridge {
        bridge.attach();
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        log::debug!("Step {}: {:?}", index + 1, step);
        apply(step, &tracker, &bridge, &clock);
    }

    let events = std::mem::take(&mut *sink.events.lock());
    ReplayReport {
        steps: scenario.steps.len(),
        events,
        pages_cached: tracker.registry().len(),
        running_page: tracker.registry().most_recent_running_id(),
    }
}

fn apply(step: &Step, tracker: &PageTracker, bridge: &LifecycleBridge, clock: &ManualClock) {
    match step {
        Step::Start { id, name, properties } => {
            tracker.track_page_view_start(PageId(*id), name, properties.clone());
        }
        Step::Stop { id, properties } => {
            tracker.track_page_view_end(PageId(*id), properties.clone());
        }
        Step::View { name, properties } => {
            tracker.track_page_view(name, properties.clone());
        }
        Step::Advance { millis } => clock.advance(*millis),
        Step::Background => bridge.handle(LifecycleSignal::EnteredBackground),
        Step::Foreground => bridge.handle(LifecycleSignal::WillEnterForeground),
        Step::Terminate => bridge.handle(LifecycleSignal::WillTerminate),
        Step::Suspend => tracker.end_last_page_start(),
        Step::Resume => tracker.start_last_page_end(),
        Step::Forget { id } => {
            if !tracker.forget_page(PageId(*id)) {
                log::warn!("Forget: page {} was not known", PageId(*id));
            }
        }
    }
}

/// Render an event as one line of text
pub fn format_event(event: &ReplayedEvent, width: usize) -> String {
    let props = format_properties(&event.properties);

    format!(
        "[{:>8}ms] {:<width$} {}",
        event.at_millis,
        event.name,
        props,
        width = width
    )
}
