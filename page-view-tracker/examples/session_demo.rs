//! Simulated app session
//!
//! Opens a couple of screens, sends the app to the background and back, and
//! prints every event the tracker produces. Run with `RUST_LOG=debug` to see
//! the tracker's own diagnostics.
//!
//! Usage:
//!   cargo run --example session_demo

use page_view_tracker::{
    InMemoryNotifier, LifecycleBridge, LifecycleSignal, ManualClock, PageId, PageTracker,
    Properties, RecordingSink, TrackerConfig,
};
use std::sync::Arc;

fn main() {
    env_logger::init();

    let clock = Arc::new(ManualClock::new(1));
    let sink = Arc::new(RecordingSink::new());
    let tracker = Arc::new(PageTracker::new(
        TrackerConfig::new(),
        clock.clone(),
        sink.clone(),
    ));
    let bridge = LifecycleBridge::new(tracker.clone(), Arc::new(InMemoryNotifier::new()));
    bridge.attach();

    let home = PageId(1);
    let detail = PageId(2);

    let mut props = Properties::new();
    props.insert("city".to_string(), "Seattle".to_string());

    tracker.track_page_view_start(home, "Home", Some(props));
    clock.advance(4_200);
    tracker.track_page_view_end(home, None);

    tracker.track_page_view_start(detail, "Daily Detail", None);
    clock.advance(1_800);
    bridge.handle(LifecycleSignal::EnteredBackground);
    clock.advance(90_000);
    bridge.handle(LifecycleSignal::WillEnterForeground);
    clock.advance(600);

    let mut end_props = Properties::new();
    end_props.insert("scrolled".to_string(), "true".to_string());
    tracker.track_page_view_end(detail, Some(end_props));

    tracker.track_page_view("Settings", None);

    println!("=== EVENTS ===");
    for event in sink.events() {
        println!("{:<28} {:?}", event.name, event.properties);
    }
}
