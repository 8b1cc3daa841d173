//! Host plumbing for running the smart rockets simulation headlessly.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use smartrockets_core::SimConfig;

pub mod input;
pub mod telemetry;

pub use input::{ObstacleDrift, drift_step};
pub use telemetry::{ChannelSink, TelemetryConsumer, create_telemetry_bus};

/// Load a JSON configuration file, falling back to defaults when no path is given.
///
/// Missing fields keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}
