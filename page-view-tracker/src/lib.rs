//! Page View Tracker Library
//!
//! Measures how long a user stays on each screen of an application and reports
//! every visit as a single timed analytics event.
//!
//! # Architecture
//!
//! - [`PageTimerRegistry`] pairs "view appeared" with "view disappeared" per
//!   [`PageId`], computes the duration and merges the properties of both calls
//! - [`LifecycleBridge`] closes the current page when the app is backgrounded
//!   and reopens it on resume
//! - [`EventEmitter`] forwards the result to an [`EventSink`], or logs it when
//!   the sink is disabled
//! - [`PageTracker`] ties these together and is what the UI layer calls
//!
//! The library does NOT:
//! - Talk to any analytics backend (hosts provide an [`EventSink`])
//! - Batch, retry or persist events
//! - Subscribe to OS notifications itself (hosts provide a [`LifecycleNotifier`])
//!
//! Misuse such as ending a page that was never started is logged and ignored;
//! no call ever fails or panics.
//!
//! # Example Usage
//!
//! ```
//! use page_view_tracker::{
//!     InMemoryNotifier, LifecycleBridge, LifecycleSignal, ManualClock, PageId,
//!     PageTracker, Properties, RecordingSink, TrackerConfig,
//! };
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new(1));
//! let sink = Arc::new(RecordingSink::new());
//! let tracker = Arc::new(PageTracker::new(TrackerConfig::new(), clock.clone(), sink.clone()));
//!
//! let bridge = LifecycleBridge::new(tracker.clone(), Arc::new(InMemoryNotifier::new()));
//! bridge.attach();
//!
//! let home = PageId(1);
//! let mut props = Properties::new();
//! props.insert("city".to_string(), "Seattle".to_string());
//!
//! tracker.track_page_view_start(home, "Home", Some(props));
//! clock.advance(2_500);
//! tracker.track_page_view_end(home, None);
//!
//! let event = &sink.events()[0];
//! assert_eq!(event.name, "Page View: Home");
//! assert_eq!(event.property("duration"), Some("2.5000000"));
//! ```

// Public modules
pub mod clock;
pub mod config;
pub mod emitter;
pub mod lifecycle;
pub mod registry;
pub mod sink;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use emitter::{format_properties, EventEmitter};
pub use lifecycle::{
    InMemoryNotifier, LifecycleBridge, LifecycleNotifier, LifecycleSignal, Subscription,
};
pub use merge::merge;
pub use registry::{PageTimerRegistry, TimerEntry};
pub use sink::{CrashReporter, DisabledSink, EventSink, RecordingSink};
pub use tracker::PageTracker;
pub use types::{PageId, PageViewEvent, Properties, Result, TrackerError};

// Internal modules (not exposed in public API)
mod merge;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
