//! Tunables for the synchronization layer.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Synchronization settings. Every field has a default, so a partial JSON
/// document (or `{}`) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Rows per patient search page
    pub page_size: usize,
    /// Quiet period before typed search filters are applied
    pub filter_debounce_ms: u64,
    /// Quiet period for the autocomplete lookup
    pub autocomplete_debounce_ms: u64,
    /// Suggestions returned by autocomplete
    pub autocomplete_limit: usize,
    /// Capacity of the realtime change feed
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            filter_debounce_ms: 1000,
            autocomplete_debounce_ms: 300,
            autocomplete_limit: 10,
            event_buffer: 256,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: SyncConfig = serde_json::from_str(json).context("parsing sync config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading sync config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("loading {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.page_size > 0, "page_size must be positive");
        ensure!(self.autocomplete_limit > 0, "autocomplete_limit must be positive");
        ensure!(self.event_buffer > 0, "event_buffer must be positive");
        Ok(())
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    pub fn autocomplete_debounce(&self) -> Duration {
        Duration::from_millis(self.autocomplete_debounce_ms)
    }
}
