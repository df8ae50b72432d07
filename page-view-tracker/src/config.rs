//! Tracker configuration types
//!
//! The defaults reproduce the event naming and log layout hosts already rely
//! on, so most applications never need to touch this.

use serde::{Deserialize, Serialize};

/// Configuration for a [`PageTracker`](crate::PageTracker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Prefix prepended to page names to form event names
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,

    /// Property key that receives the measured duration in seconds
    #[serde(default = "default_duration_key")]
    pub duration_key: String,

    /// Width the event name is padded to in fallback log lines
    #[serde(default = "default_log_name_width")]
    pub log_name_width: usize,

    /// Maximum number of pages kept in the registry before closed entries
    /// are evicted (running entries are never evicted)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_event_prefix() -> String {
    "Page View: ".to_string()
}

fn default_duration_key() -> String {
    "duration".to_string()
}

fn default_log_name_width() -> usize {
    30
}

fn default_max_entries() -> usize {
    256
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            event_prefix: default_event_prefix(),
            duration_key: default_duration_key(),
            log_name_width: default_log_name_width(),
            max_entries: default_max_entries(),
        }
    }
}

impl TrackerConfig {
    /// Create a new tracker configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the event name prefix
    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }

    /// Builder method: set the duration property key
    pub fn with_duration_key(mut self, key: impl Into<String>) -> Self {
        self.duration_key = key.into();
        self
    }

    /// Builder method: set the log padding width
    pub fn with_log_name_width(mut self, width: usize) -> Self {
        self.log_name_width = width;
        self
    }

    /// Builder method: bound the registry size (clamped to at least 1)
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Full event name for a page
    pub fn event_name(&self, page_name: &str) -> String {
        format!("{}{}", self.event_prefix, page_name)
    }
}
