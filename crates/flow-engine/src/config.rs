//! Engine configuration
//!
//! `FlowConfig` gathers the tunables of the canvas, the execution engine,
//! the JSON store and the undo history. Every field has a default, so a
//! partial (or missing) config file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::execution::OrderingPolicy;

/// Single source of truth for tunable defaults
pub mod defaults {
    /// Lower zoom bound
    pub const MIN_SCALE: f64 = 0.1;
    /// Upper zoom bound
    pub const MAX_SCALE: f64 = 3.0;
    /// Wheel zoom-out factor (positive wheel delta)
    pub const WHEEL_ZOOM_OUT: f64 = 0.9;
    /// Wheel zoom-in factor (negative wheel delta)
    pub const WHEEL_ZOOM_IN: f64 = 1.1;
    /// Toolbar zoom step, multiplied in and divided out
    pub const TOOLBAR_ZOOM_STEP: f64 = 1.2;
    /// Multiplier applied to the averaged three-finger delta
    pub const TOUCH_PAN_MULTIPLIER: f64 = 1.2;
    /// Pan offset bound per axis for three-finger panning
    pub const TOUCH_PAN_LIMIT: f64 = 2000.0;
    /// Node box width in graph units
    pub const NODE_WIDTH: f64 = 180.0;
    /// Node box height in graph units
    pub const NODE_HEIGHT: f64 = 72.0;
    /// Port hit radius in graph units
    pub const PORT_RADIUS: f64 = 8.0;
    /// Snapshots kept by the undo history
    pub const HISTORY_LIMIT: usize = 100;
    /// zstd level for undo snapshots
    pub const HISTORY_COMPRESSION_LEVEL: i32 = 3;
    /// Config file name inside a data directory
    pub const CONFIG_FILE: &str = "flow-config.json";
}

/// Canvas geometry and gesture constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub wheel_zoom_out: f64,
    pub wheel_zoom_in: f64,
    pub toolbar_zoom_step: f64,
    pub touch_pan_multiplier: f64,
    pub touch_pan_limit: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub port_radius: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: defaults::MIN_SCALE,
            max_scale: defaults::MAX_SCALE,
            wheel_zoom_out: defaults::WHEEL_ZOOM_OUT,
            wheel_zoom_in: defaults::WHEEL_ZOOM_IN,
            toolbar_zoom_step: defaults::TOOLBAR_ZOOM_STEP,
            touch_pan_multiplier: defaults::TOUCH_PAN_MULTIPLIER,
            touch_pan_limit: defaults::TOUCH_PAN_LIMIT,
            node_width: defaults::NODE_WIDTH,
            node_height: defaults::NODE_HEIGHT,
            port_radius: defaults::PORT_RADIUS,
        }
    }
}

/// Execution engine settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionConfig {
    /// How nodes are ordered before a run
    pub ordering: OrderingPolicy,
}

/// JSON store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Directory for `workflows/` and `runs/`; in-memory only when unset
    pub data_dir: Option<PathBuf>,
}

/// Undo history settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    pub limit: usize,
    pub compression_level: i32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: defaults::HISTORY_LIMIT,
            compression_level: defaults::HISTORY_COMPRESSION_LEVEL,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowConfig {
    pub canvas: CanvasConfig,
    pub execution: ExecutionConfig,
    pub store: StoreConfig,
    pub history: HistoryConfig,
}

impl FlowConfig {
    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await?;
        let config = serde_json::from_str(&contents)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).await?;
        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }
}
