//! # Renderer Configuration
//!
//! Configuration for the deferred renderer, loadable from TOML so
//! applications can tune the pipeline without recompiling.
//!
//! ## Design Goals
//!
//! - **Serializable**: TOML round-trip with serde
//! - **Type Safe**: strong typing with validation and defaults
//! - **Builder Friendly**: `with_*` methods for programmatic setup

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file contents were not valid TOML
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the deferred renderer
///
/// Every field has a default, so partial TOML files work: unspecified keys
/// fall back to the values of [`RendererConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Initial render resolution width in pixels
    pub width: u32,
    /// Initial render resolution height in pixels
    pub height: u32,
    /// Background clear color [R, G, B, A] (0.0-1.0 range)
    pub clear_color: [f32; 4],
    /// Whether the shadow pass runs at all
    pub shadows_enabled: bool,
    /// Edge length of each square shadow map in pixels
    pub shadow_map_resolution: u32,
    /// How many directional lights may cast shadows per frame
    pub max_shadow_casting_lights: usize,
    /// Soft (PCF-filtered) versus hard shadow sampling
    pub soft_shadows: bool,
    /// PCF kernel sample amount forwarded to the lighting shader
    pub pcf_sample_amount: f32,
    /// Draw point-light volumes as wireframe for diagnostics
    pub light_volume_debug: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            shadows_enabled: true,
            shadow_map_resolution: 2048,
            max_shadow_casting_lights: 4,
            soft_shadows: true,
            pcf_sample_amount: 15.0,
            light_volume_debug: false,
        }
    }
}

impl RendererConfig {
    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Set the initial render resolution
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the background clear color [R, G, B, A] (0.0-1.0 range)
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable the shadow pass
    pub fn with_shadows(mut self, enabled: bool) -> Self {
        self.shadows_enabled = enabled;
        self
    }

    /// Set the shadow map resolution
    pub fn with_shadow_map_resolution(mut self, resolution: u32) -> Self {
        self.shadow_map_resolution = resolution.max(1);
        self
    }

    /// Enable or disable the wireframe light-volume overlay
    pub fn with_light_volume_debug(mut self, enabled: bool) -> Self {
        self.light_volume_debug = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.clear_color, [0.1, 0.1, 0.1, 1.0]);
        assert!(config.shadows_enabled);
        assert_eq!(config.max_shadow_casting_lights, 4);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RendererConfig = toml::from_str("width = 640\nheight = 480\n").unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.shadow_map_resolution, 2048);
        assert!(config.soft_shadows);
    }

    #[test]
    fn test_builder_methods() {
        let config = RendererConfig::default()
            .with_dimensions(800, 600)
            .with_shadows(false)
            .with_clear_color([0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.width, 800);
        assert!(!config.shadows_enabled);
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }
}
