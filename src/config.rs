//! Studio configuration, loaded from JSON.
//!
//! Every section is optional in the document; missing fields fall back to the defaults
//! below, which reproduce the stock look and feel of the app.

use crate::StudioError;
use crate::camera::CameraState;
use crate::core::{Color, GridSpec};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub surface: SurfaceConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
}

impl StudioConfig {
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(text)
            .change_context(StudioError::Config)
            .attach("config is not valid JSON for StudioConfig")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .change_context(StudioError::Config)
            .attach(format!("reading {}", path.display()))?;
        Self::from_json_str(&text).attach(format!("parsing {}", path.display()))
    }

    pub fn validate(&self) -> crate::Result<()> {
        let cam = &self.camera;
        if !(cam.min_pitch <= cam.max_pitch) {
            return Err(Report::new(StudioError::Config)
                .attach(format!("min_pitch {} exceeds max_pitch {}", cam.min_pitch, cam.max_pitch)));
        }
        if !(cam.min_distance > 0.0 && cam.min_distance <= cam.max_distance) {
            return Err(Report::new(StudioError::Config).attach(format!(
                "distance bounds must satisfy 0 < min ({}) <= max ({})",
                cam.min_distance, cam.max_distance
            )));
        }
        let s = &self.surface;
        if s.x_count > GridSpec::MAX_COUNT || s.y_count > GridSpec::MAX_COUNT {
            return Err(Report::new(StudioError::Config).attach(format!(
                "grid resolution {}x{} exceeds {} per axis",
                s.x_count,
                s.y_count,
                GridSpec::MAX_COUNT
            )));
        }
        let finite = [s.x_min, s.x_max, s.y_min, s.y_max].iter().all(|v| v.is_finite());
        if !finite {
            return Err(Report::new(StudioError::Config).attach("surface domain must be finite"));
        }
        Ok(())
    }
}

/// What the render upload does with vertices whose height is NaN or infinite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Upload the data untouched and let the GPU cope.
    Keep,
    /// Drop every triangle touching a non-finite vertex.
    #[default]
    CullTriangles,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub x_count: usize,
    pub y_count: usize,
    pub default_color: Color,
    pub non_finite: NonFinitePolicy,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            x_min: -5.0,
            x_max: 5.0,
            y_min: -5.0,
            y_max: 5.0,
            x_count: 80,
            y_count: 80,
            default_color: Color::SYSTEM_BLUE,
            non_finite: NonFinitePolicy::default(),
        }
    }
}

impl SurfaceConfig {
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::new(
            self.x_min..=self.x_max,
            self.y_min..=self.y_max,
            self.x_count,
            self.y_count,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub initial_distance: f32,
    pub initial_yaw: f32,
    pub initial_pitch: f32,
    pub yaw_sensitivity: f32,
    pub pitch_sensitivity: f32,
    /// Bounds keep the camera off the poles, where yaw degenerates.
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Scale change per mouse-wheel line.
    pub wheel_zoom_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let initial = CameraState::default();
        Self {
            initial_distance: initial.distance,
            initial_yaw: initial.yaw,
            initial_pitch: initial.pitch,
            yaw_sensitivity: 0.002,
            pitch_sensitivity: 0.0028,
            min_pitch: -PI + 0.15,
            max_pitch: -0.15,
            min_distance: 2.0,
            max_distance: 100.0,
            wheel_zoom_sensitivity: 0.1,
        }
    }
}

impl CameraConfig {
    pub fn initial_state(&self) -> CameraState {
        CameraState {
            distance: self.initial_distance,
            yaw: self.initial_yaw,
            pitch: self.initial_pitch,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: Color,
    pub axis_length: f32,
    pub axis_radius: f32,
    pub ambient_brightness: f32,
    pub directional_illuminance: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: Color::rgba(0.05, 0.05, 0.09, 1.0),
            axis_length: 50.0,
            axis_radius: 0.02,
            ambient_brightness: 200.0,
            directional_illuminance: 800.0,
        }
    }
}
