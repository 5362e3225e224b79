use std::fs;
use std::path::Path;

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable constants for the renderer, input steps and texture resources.
///
/// Every field has a default, so a config file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Distance from the eye to the object's origin along -Z.
    pub camera_distance: f32,
    /// Distance from the eye to the background plane along -Z.
    pub background_depth: f32,
    /// Exponential friction applied to the angular speeds, per millisecond.
    pub damping_per_ms: f32,
    pub zoom_step: f32,
    pub tilt_step: f32,
    /// Rotation applied per pixel of drag, and per pixel/second of fling.
    pub drag_degrees_per_pixel: f32,
    pub light: LightParams,
    pub textures: TextureResources,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            z_near: 1.0,
            z_far: 100.0,
            camera_distance: 6.0,
            background_depth: 10.0,
            damping_per_ms: 0.0015,
            zoom_step: 2.0,
            tilt_step: 5.0,
            drag_degrees_per_pixel: 0.5,
            light: LightParams::default(),
            textures: TextureResources::default(),
        }
    }
}

impl RendererConfig {
    /// Parses a JSON document, filling unspecified fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Light0 parameters uploaded when the surface is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightParams {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub position: Vec4,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.5, 0.5, 0.5, 1.0),
            diffuse: Vec4::ONE,
            position: Vec4::new(0.0, 0.0, 2.0, 1.0),
        }
    }
}

/// Names of the bitmap resources handed to the bitmap loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureResources {
    pub background: String,
    pub sphere_map: String,
}

impl Default for TextureResources {
    fn default() -> Self {
        Self {
            background: "background.png".to_string(),
            sphere_map: "sphere_map.png".to_string(),
        }
    }
}
