//! Event emission
//!
//! Forwards events to the sink when it is enabled and falls back to a
//! human-readable log line otherwise.

use crate::sink::EventSink;
use crate::types::Properties;
use std::sync::Arc;

/// Forwards named events to an [`EventSink`]
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
    log_name_width: usize,
}

impl EventEmitter {
    /// Create an emitter in front of `sink`
    pub fn new(sink: Arc<dyn EventSink>, log_name_width: usize) -> Self {
        Self {
            sink,
            log_name_width,
        }
    }

    /// Send an event, or log it if the sink is disabled
    pub fn emit(&self, name: &str, properties: &Properties) {
        if self.sink.is_enabled() {
            log::debug!("Sending event {name}");
            self.sink.send(name, properties);
        } else {
            log::info!("{}", format_log_line(name, properties, self.log_name_width));
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sink_enabled", &self.sink.is_enabled())
            .field("log_name_width", &self.log_name_width)
            .finish()
    }
}

/// Render properties as `key = value` pairs joined by ` | `, or `empty`
pub fn format_properties(properties: &Properties) -> String {
    if properties.is_empty() {
        return "empty".to_string();
    }

    properties
        .iter()
        .map(|(key, value)| format!("{key} = {value}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Render an event as a single log line
fn format_log_line(name: &str, properties: &Properties, width: usize) -> String {
    let props = format_properties(properties);
    format!("TrackEvent :: name: {name:<width$} properties: {props}")
}
