//! Core types for the page view tracker
//!
//! This module defines the identity, property and event types that flow between
//! the registry, the lifecycle bridge and the event emitter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key/value metadata attached to an event
///
/// Ordered so that log lines and JSON output are stable.
pub type Properties = BTreeMap<String, String>;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Caller-supplied token identifying one visible view instance
///
/// The token must be unique among views that are visible at the same time.
/// It is never derived from object identity; the host decides what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl PageId {
    /// Create a new page identity
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw token value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PageId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named analytics event ready to be handed to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewEvent {
    /// Full event name (e.g. "Page View: Home")
    pub name: String,
    /// Merged properties, including `duration` for timed views
    pub properties: Properties,
}

impl PageViewEvent {
    /// Create a new event
    pub fn new(name: impl Into<String>, properties: Properties) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    /// Look up a single property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Caller-usage errors detected by the registry
///
/// None of these ever reach the host application: the tracker facade logs
/// them and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("name: {name} - start was already called on page {id}. Make sure start is called when the view appears and end when it disappears")]
    DuplicateStart { id: PageId, name: String },

    #[error("name: ??? - a valid page name wasn't provided when start was called on page {0}. Make sure start is called when the view appears and end when it disappears")]
    NoValidStart(PageId),

    #[error("name: {name} - start was not called on page {id}. Make sure start is called when the view appears and end when it disappears")]
    NotRunning { id: PageId, name: String },

    #[error("could not find a cached name for last active page {0}")]
    MissingCachedState(PageId),

    #[error("no last active page saved")]
    NoLastActivePage,
}

impl TrackerError {
    /// The page this error refers to, if any
    pub fn page_id(&self) -> Option<PageId> {
        match self {
            TrackerError::DuplicateStart { id, .. } => Some(*id),
            TrackerError::NoValidStart(id) => Some(*id),
            TrackerError::NotRunning { id, .. } => Some(*id),
            TrackerError::MissingCachedState(id) => Some(*id),
            TrackerError::NoLastActivePage => None,
        }
    }
}
