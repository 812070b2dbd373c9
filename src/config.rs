//! Configuration types shared by the ingest engine, the render engine and the viewer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::axis::AxisLimits;
use crate::error::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Ingestion
// ─────────────────────────────────────────────────────────────────────────────

/// Polling and parsing settings for every source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Period between two poll cycles of one source, in milliseconds. Default: `100`.
    pub poll_interval_ms: u64,
    /// Seconds without an observed change before a live source times out. Default: `1.0`.
    pub stall_timeout_secs: f64,
    /// Files larger than this are parsed in row chunks. Default: 64 MiB.
    pub chunk_threshold_bytes: u64,
    /// Rows per chunk when chunked parsing kicks in. Default: `100_000`.
    pub chunk_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            stall_timeout_secs: 1.0,
            chunk_threshold_bytes: 64 * 1024 * 1024,
            chunk_rows: 100_000,
        }
    }
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Falls back to the default for values a `Duration` cannot hold.
    pub fn stall_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.stall_timeout_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(Self::default().stall_timeout_secs))
    }

    /// Replace out-of-range values with their defaults.
    pub fn sanitize(mut self) -> Self {
        let defaults = Self::default();
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = defaults.poll_interval_ms;
        }
        let secs = self.stall_timeout_secs;
        if !(secs.is_finite() && secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok()) {
            self.stall_timeout_secs = defaults.stall_timeout_secs;
        }
        if self.chunk_rows == 0 {
            self.chunk_rows = defaults.chunk_rows;
        }
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Axis and marker settings used by the render engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Horizontal padding fraction applied to live-mode bounding boxes. Default: `0.05`.
    pub live_x_padding: f64,
    /// Vertical padding fraction applied to live-mode bounding boxes. Default: `0.10`.
    pub live_y_padding: f64,
    /// Minimum absolute step between two samples of a state signal to count as a change.
    pub state_change_tolerance: f64,
    /// Limits shown by a slot that has never had data.
    pub neutral_limits: AxisLimits,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            live_x_padding: 0.05,
            live_y_padding: 0.10,
            state_change_tolerance: 1e-9,
            neutral_limits: AxisLimits::neutral(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Initial tab/slot grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub tabs: usize,
    pub slots_per_tab: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tabs: 1,
            slots_per_tab: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TailPlotConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// | Field    | Purpose |
/// |----------|---------|
/// | `ingest` | Poll period, stall timeout, chunked parsing |
/// | `render` | Live padding, state-change tolerance, neutral limits |
/// | `layout` | Initial tab/slot grid |
/// | `live`   | Start in live (polling) mode instead of a one-shot load |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailPlotConfig {
    pub title: String,
    pub live: bool,
    pub ingest: IngestConfig,
    pub render: RenderConfig,
    pub layout: LayoutConfig,
}

impl Default for TailPlotConfig {
    fn default() -> Self {
        Self {
            title: "TailPlot".to_string(),
            live: false,
            ingest: IngestConfig::default(),
            render: RenderConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl TailPlotConfig {
    /// Replace out-of-range values with their defaults.
    pub fn sanitize(mut self) -> Self {
        let defaults = Self::default();
        self.ingest = self.ingest.sanitize();
        for pad in [
            &mut self.render.live_x_padding,
            &mut self.render.live_y_padding,
        ] {
            if !(pad.is_finite() && *pad >= 0.0) {
                *pad = 0.0;
            }
        }
        if !(self.render.state_change_tolerance.is_finite()
            && self.render.state_change_tolerance >= 0.0)
        {
            self.render.state_change_tolerance = defaults.render.state_change_tolerance;
        }
        if !self.render.neutral_limits.is_valid() {
            self.render.neutral_limits = AxisLimits::neutral();
        }
        if self.layout.tabs == 0 {
            self.layout.tabs = 1;
        }
        if self.layout.slots_per_tab == 0 {
            self.layout.slots_per_tab = 1;
        }
        self
    }

    /// Parse a YAML document. Missing keys fall back to defaults.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        let cfg: TailPlotConfig = serde_yaml::from_str(s)?;
        Ok(cfg.sanitize())
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&s)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(io_err)?;
            }
        }
        let s = self.to_yaml()?;
        let mut f = fs::File::create(path).map_err(io_err)?;
        f.write_all(s.as_bytes()).map_err(io_err)?;
        Ok(())
    }

    /// `~/.tailplot/config.yaml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(".tailplot").join("config.yaml"))
    }

    /// Load the default config file if present, otherwise return defaults.
    pub fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = TailPlotConfig::from_yaml("live: true\ningest:\n  stall_timeout_secs: 2.5\n")
            .unwrap();
        assert!(cfg.live);
        assert_eq!(cfg.ingest.stall_timeout_secs, 2.5);
        assert_eq!(cfg.ingest.poll_interval_ms, 100);
        assert_eq!(cfg.layout, LayoutConfig::default());
    }

    #[test]
    fn sanitize_restores_invalid_values() {
        let cfg = TailPlotConfig::from_yaml(
            "ingest:\n  poll_interval_ms: 0\n  stall_timeout_secs: -1.0\nlayout:\n  tabs: 0\n",
        )
        .unwrap();
        assert_eq!(cfg.ingest.poll_interval_ms, 100);
        assert_eq!(cfg.ingest.stall_timeout_secs, 1.0);
        assert_eq!(cfg.layout.tabs, 1);
    }

    #[test]
    fn oversized_stall_timeout_falls_back_to_default() {
        let cfg = TailPlotConfig::from_yaml("ingest:\n  stall_timeout_secs: 1.0e300\n").unwrap();
        assert_eq!(cfg.ingest.stall_timeout_secs, 1.0);

        let raw = IngestConfig {
            stall_timeout_secs: f64::NAN,
            ..IngestConfig::default()
        };
        assert_eq!(raw.stall_timeout(), Duration::from_secs(1));
    }
}
