//! Orbit camera driven by drag and pinch gestures.

use crate::config::CameraConfig;
use bevy_math::{Vec2, Vec3};
use tracing::debug;

/// Spherical camera coordinates around the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub distance: f32,
    /// Left-right rotation around the world up axis.
    pub yaw: f32,
    /// Polar angle measured from the up axis.
    pub pitch: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            distance: 10.0,
            yaw: 0.0,
            pitch: -std::f32::consts::PI / 6.0,
        }
    }
}

/// World-space camera placement handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl CameraState {
    pub fn pose(&self) -> CameraPose {
        let r = self.distance;
        let (sp, cp) = self.pitch.sin_cos();
        let (sy, cy) = self.yaw.sin_cos();
        CameraPose {
            position: Vec3::new(r * sp * cy, r * cp, r * sp * sy),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct DragBaseline {
    yaw: f32,
    pitch: f32,
}

/// Owns [`CameraState`] and maps gesture signals onto it.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    state: CameraState,
    config: CameraConfig,
    drag: Option<DragBaseline>,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl OrbitCamera {
    pub fn new(config: CameraConfig) -> Self {
        let mut cam = Self {
            state: config.initial_state(),
            config,
            drag: None,
        };
        cam.state.pitch = cam.clamp_pitch(cam.state.pitch);
        cam.state.distance = cam.clamp_distance(cam.state.distance);
        cam
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn pose(&self) -> CameraPose {
        self.state.pose()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Snapshot the current orientation as the baseline for a new drag.
    pub fn begin_drag(&mut self) {
        self.drag = Some(DragBaseline {
            yaw: self.state.yaw,
            pitch: self.state.pitch,
        });
    }

    /// Apply a drag given its cumulative translation since the gesture started.
    pub fn update_drag(&mut self, translation: Vec2) {
        if !translation.is_finite() {
            debug!(?translation, "ignoring non-finite drag translation");
            return;
        }
        let base = match self.drag {
            Some(b) => b,
            None => {
                self.begin_drag();
                DragBaseline {
                    yaw: self.state.yaw,
                    pitch: self.state.pitch,
                }
            }
        };
        self.state.yaw = base.yaw + translation.x * self.config.yaw_sensitivity;
        self.state.pitch =
            self.clamp_pitch(base.pitch + translation.y * self.config.pitch_sensitivity);
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Zoom by a relative scale factor (`1.0` leaves the distance unchanged).
    pub fn pinch(&mut self, scale: f32) {
        if !scale.is_finite() || scale <= 0.0 {
            debug!(scale, "ignoring degenerate pinch scale");
            return;
        }
        self.state.distance = self.clamp_distance(self.state.distance / scale);
    }

    pub fn reset(&mut self) {
        self.drag = None;
        self.state = self.config.initial_state();
        self.state.pitch = self.clamp_pitch(self.state.pitch);
        self.state.distance = self.clamp_distance(self.state.distance);
    }

    fn clamp_pitch(&self, pitch: f32) -> f32 {
        pitch.clamp(self.config.min_pitch, self.config.max_pitch)
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        distance.clamp(self.config.min_distance, self.config.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn pose_follows_spherical_formula() {
        let state = CameraState {
            distance: 10.0,
            yaw: 0.0,
            pitch: -PI / 6.0,
        };
        let pose = state.pose();
        assert_relative_eq!(pose.position.x, -5.0, epsilon = 1e-4);
        assert_relative_eq!(pose.position.y, 10.0 * (PI / 6.0).cos(), epsilon = 1e-4);
        assert_relative_eq!(pose.position.z, 0.0, epsilon = 1e-4);
        assert_eq!(pose.target, Vec3::ZERO);
        assert_eq!(pose.up, Vec3::Y);
        assert_relative_eq!(pose.position.length(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn zero_drag_keeps_baseline() {
        let mut cam = OrbitCamera::default();
        let before = cam.state();
        cam.begin_drag();
        cam.update_drag(Vec2::ZERO);
        assert_eq!(cam.state().yaw, before.yaw);
        assert_eq!(cam.state().pitch, before.pitch);
    }

    #[test]
    fn drag_is_cumulative_not_compounding() {
        let mut cam = OrbitCamera::default();
        let base = cam.state();
        cam.begin_drag();
        cam.update_drag(Vec2::new(50.0, 10.0));
        cam.update_drag(Vec2::new(100.0, 20.0));
        assert_relative_eq!(cam.state().yaw, base.yaw + 100.0 * 0.002);
        assert_relative_eq!(cam.state().pitch, base.pitch + 20.0 * 0.0028);
    }

    #[test]
    fn restarting_drag_resets_baseline() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag();
        cam.update_drag(Vec2::new(100.0, 0.0));
        cam.end_drag();
        let mid = cam.state();

        cam.begin_drag();
        cam.update_drag(Vec2::new(100.0, 0.0));
        assert_relative_eq!(cam.state().yaw, mid.yaw + 0.2);
        assert!(cam.is_dragging());
        cam.end_drag();
        assert!(!cam.is_dragging());
    }

    #[test]
    fn pitch_stays_off_the_poles() {
        let mut cam = OrbitCamera::default();
        for dy in [-10_000.0, -3.0, 0.0, 7.5, 10_000.0, f32::MAX] {
            cam.begin_drag();
            cam.update_drag(Vec2::new(13.0, dy));
            let p = cam.state().pitch;
            assert!(p >= -PI + 0.15 && p <= -0.15, "pitch {p} escaped");
            cam.end_drag();
        }
    }

    #[test]
    fn non_finite_drag_is_ignored() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag();
        cam.update_drag(Vec2::new(50.0, 10.0));
        let before = cam.state();
        for t in [
            Vec2::new(f32::NAN, 0.0),
            Vec2::new(0.0, f32::NAN),
            Vec2::new(f32::INFINITY, 1.0),
            Vec2::new(1.0, f32::NEG_INFINITY),
        ] {
            cam.update_drag(t);
            assert_eq!(cam.state(), before);
        }
        let p = cam.state().pitch;
        assert!(p >= -PI + 0.15 && p <= -0.15);
    }

    #[test]
    fn update_without_begin_starts_a_drag() {
        let mut cam = OrbitCamera::default();
        let base = cam.state();
        cam.update_drag(Vec2::new(10.0, 0.0));
        assert!(cam.is_dragging());
        assert_relative_eq!(cam.state().yaw, base.yaw + 0.02);
    }

    #[test]
    fn pinch_scales_and_clamps_distance() {
        let mut cam = OrbitCamera::default();
        assert_relative_eq!(cam.state().distance, 10.0);
        cam.pinch(2.0);
        assert_relative_eq!(cam.state().distance, 5.0);
        cam.pinch(2.0);
        assert_relative_eq!(cam.state().distance, 2.5);
        cam.pinch(2.5);
        assert_relative_eq!(cam.state().distance, 2.0);
        cam.pinch(0.001);
        assert_relative_eq!(cam.state().distance, 100.0);
    }

    #[test]
    fn degenerate_pinch_is_ignored() {
        let mut cam = OrbitCamera::default();
        for s in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            cam.pinch(s);
        }
        assert_relative_eq!(cam.state().distance, 10.0);
    }

    #[test]
    fn gestures_touch_independent_fields() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag();
        cam.update_drag(Vec2::new(40.0, -30.0));
        let oriented = cam.state();
        cam.pinch(1.25);
        assert_eq!(cam.state().yaw, oriented.yaw);
        assert_eq!(cam.state().pitch, oriented.pitch);
        cam.update_drag(Vec2::new(40.0, -30.0));
        assert_relative_eq!(cam.state().distance, 8.0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut cam = OrbitCamera::default();
        cam.update_drag(Vec2::new(300.0, 40.0));
        cam.pinch(3.0);
        cam.reset();
        assert_eq!(cam.state(), CameraState::default());
        assert!(!cam.is_dragging());
    }
}
