//! Scenario loading and parsing

use anyhow::{bail, Context, Result};
use page_view_tracker::{Properties, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A scripted session replayed against the tracker (loaded from a .toml file)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Whether the analytics sink accepts events (false = log only)
    #[serde(default = "default_true")]
    pub sink_enabled: bool,
    /// Whether lifecycle steps go through the lifecycle bridge
    #[serde(default = "default_true")]
    pub attach_bridge: bool,
    /// Initial reading of the scenario clock in milliseconds
    #[serde(default = "default_start_millis")]
    pub start_millis: u64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

fn default_start_millis() -> u64 {
    1
}

/// One scripted action
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// View appeared
    Start {
        id: u64,
        name: String,
        properties: Option<Properties>,
    },
    /// View disappeared
    Stop {
        id: u64,
        properties: Option<Properties>,
    },
    /// Untimed page view
    View {
        name: String,
        properties: Option<Properties>,
    },
    /// Move the scenario clock forward
    Advance { millis: u64 },
    /// OS: app entered the background
    Background,
    /// OS: app will enter the foreground
    Foreground,
    /// OS: app will terminate
    Terminate,
    /// Host calls the suspend hook directly
    Suspend,
    /// Host calls the resume hook directly
    Resume,
    /// View destroyed
    Forget { id: u64 },
}

/// Load a scenario from a TOML file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {:?}", path))?;

    let scenario = parse_scenario(&content)
        .with_context(|| format!("Failed to parse scenario file: {:?}", path))?;

    Ok(scenario)
}

/// Parse and validate a scenario from TOML text
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(content)?;

    if scenario.steps.is_empty() {
        bail!("scenario has no steps");
    }
    if scenario.tracker.max_entries == 0 {
        bail!("tracker.max_entries must be at least 1");
    }

    Ok(scenario)
}
