use super::components::{AxisLine, OrbitCam, SurfaceRoot};
use crate::camera::OrbitCamera;
use crate::config::{SceneConfig, StudioConfig};
use crate::core::Color as PlotColor;
use crate::studio::Studio;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

#[derive(Resource)]
pub struct StudioRes(pub Studio<Entity>);

impl StudioRes {
    pub fn new(studio: Studio<Entity>) -> Self {
        Self(studio)
    }
}

#[derive(Resource, Clone)]
pub struct ConfigRes(pub StudioConfig);

#[derive(Resource, Clone, Debug)]
pub struct OrbitCameraRes(pub OrbitCamera);

/// Entity that surface nodes are parented under.
#[derive(Resource, Clone, Copy, Debug)]
pub struct SceneRoot(pub Entity);

/// Per-gesture bookkeeping for raw input that arrives as deltas or positions.
#[derive(Resource, Default, Debug)]
pub struct GestureState {
    /// Mouse translation accumulated since the left button went down.
    pub mouse_drag: Option<Vec2>,
    /// Finger currently driving a one-touch drag.
    pub touch_drag: Option<u64>,
    /// Finger separation seen on the previous frame of a two-touch pinch.
    pub touch_separation: Option<f32>,
}

/// One axis rod: which axis, its colour, and the rotation taking the cylinder's local Y onto it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisRod {
    pub axis: AxisLine,
    pub color: PlotColor,
    pub rotation: Quat,
}

/// Rods for the three math axes. Math x stays world x, math y runs along world z, and math z
/// points up. Each rod is centred on the origin and `axis_length` long in total.
pub fn axis_rods() -> [AxisRod; 3] {
    [
        AxisRod {
            axis: AxisLine::X,
            color: PlotColor::SYSTEM_RED,
            rotation: Quat::from_rotation_z(FRAC_PI_2),
        },
        AxisRod {
            axis: AxisLine::Y,
            color: PlotColor::SYSTEM_GREEN,
            rotation: Quat::from_rotation_x(FRAC_PI_2),
        },
        AxisRod {
            axis: AxisLine::Z,
            color: PlotColor::SYSTEM_BLUE,
            rotation: Quat::IDENTITY,
        },
    ]
}

fn axis_mesh(scene: &SceneConfig) -> Cylinder {
    Cylinder::new(scene.axis_radius, scene.axis_length)
}

pub fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<ConfigRes>,
    camera: Res<OrbitCameraRes>,
) {
    let scene = &config.0.scene;

    commands.insert_resource(AmbientLight {
        brightness: scene.ambient_brightness,
        ..default()
    });
    commands.spawn((
        DirectionalLight {
            illuminance: scene.directional_illuminance,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let rod = meshes.add(axis_mesh(scene));
    for AxisRod {
        axis,
        color,
        rotation,
    } in axis_rods()
    {
        let material = materials.add(StandardMaterial {
            base_color: color.into(),
            ..default()
        });
        commands.spawn((
            axis,
            Mesh3d(rod.clone()),
            MeshMaterial3d(material),
            Transform::from_rotation(rotation),
        ));
    }

    let root = commands
        .spawn((SurfaceRoot, Transform::default(), Visibility::default()))
        .id();
    commands.insert_resource(SceneRoot(root));

    let pose = camera.0.pose();
    commands.spawn((
        OrbitCam,
        Camera3d::default(),
        Transform::from_translation(pose.position).looking_at(pose.target, pose.up),
    ));
}
