//! Stage Configuration
//!
//! JSON-backed settings for a stage: dimensions, darkness, filter chain,
//! environmental mode, and the optional MQTT control host.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::effects::Environment;
use crate::frame::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::raster::PixelFilter;
use crate::stage::Stage;

/// Lighting settings as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingConfig {
    pub color: String,
    pub intensity: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            intensity: 1.0,
        }
    }
}

/// On-disk stage settings. Unknown filter and environment names are
/// ignored when applied, matching the draw-call contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub width: u32,
    pub height: u32,
    pub lighting: LightingConfig,
    pub filters: Vec<String>,
    pub environment: String,
    pub mqtt_host: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            lighting: LightingConfig::default(),
            filters: Vec::new(),
            environment: "none".to_string(),
            mqtt_host: String::new(),
        }
    }
}

impl StageConfig {
    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&json).map_err(|e| e.to_string())
    }

    /// Apply the lighting, filter, and environment settings to a stage
    pub fn apply(&self, stage: &mut Stage) {
        stage.set_lighting(&self.lighting.color, self.lighting.intensity);
        stage.set_filter_list(
            self.filters
                .iter()
                .filter_map(|name| PixelFilter::from_name(name))
                .collect(),
        );
        if let Some(environment) = Environment::from_name(&self.environment) {
            stage.set_environment(environment);
        }
    }
}
