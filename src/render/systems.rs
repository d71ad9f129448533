use super::*;
use super::resources::SceneRoot;
use crate::StudioError;
use crate::config::NonFinitePolicy;
use crate::core::ItemId;
use crate::scene::SceneBackend;
use crate::surface::SurfaceMesh;
use bevy::input::gestures::PinchGesture;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::input::touch::Touches;
use bevy::prelude::*;
use error_stack::Report;

/// Pixel-unit wheel deltas are scaled down to roughly one line per notch.
const PIXELS_PER_LINE: f32 = 100.0;

/// [`SceneBackend`] over Bevy's command buffer and asset stores.
pub struct BevyScene<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub meshes: &'a mut Assets<Mesh>,
    pub materials: &'a mut Assets<StandardMaterial>,
    pub root: Entity,
    pub policy: NonFinitePolicy,
}

impl SceneBackend for BevyScene<'_, '_, '_> {
    type Handle = Entity;

    fn attach(&mut self, id: ItemId, surface: &SurfaceMesh) -> crate::Result<Entity> {
        if self.commands.get_entity(self.root).is_err() {
            return Err(Report::new(StudioError::Scene)
                .attach(format!("{id}: surface root {} is gone", self.root)));
        }

        let mesh = self.meshes.add(surface_to_mesh(surface, self.policy));
        let base_color: Color = surface.color.into();
        let material = self.materials.add(StandardMaterial {
            base_color,
            alpha_mode: if surface.color.a < 1.0 {
                AlphaMode::Blend
            } else {
                AlphaMode::Opaque
            },
            double_sided: true,
            cull_mode: None,
            perceptual_roughness: 0.6,
            ..default()
        });

        let node = self
            .commands
            .spawn((
                SurfaceNode { id },
                Mesh3d(mesh),
                MeshMaterial3d(material),
                Transform::default(),
            ))
            .id();
        self.commands.entity(self.root).add_child(node);
        Ok(node)
    }

    fn detach(&mut self, handle: Entity) {
        if let Ok(mut node) = self.commands.get_entity(handle) {
            node.despawn();
        }
    }
}

/// Apply queued item commands and reconcile the surfaces once per frame.
pub fn drive_studio(
    mut commands: Commands,
    mut studio: ResMut<StudioRes>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    root: Option<Res<SceneRoot>>,
    config: Res<ConfigRes>,
) {
    let Some(root) = root else { return };

    let mut backend = BevyScene {
        commands: &mut commands,
        meshes: &mut meshes,
        materials: &mut materials,
        root: root.0,
        policy: config.0.surface.non_finite,
    };
    studio.bypass_change_detection().0.tick(&mut backend);
}

/// Left-mouse and one-finger drags rotate the camera.
pub fn handle_drag(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion: MessageReader<MouseMotion>,
    touches: Res<Touches>,
    mut gesture: ResMut<GestureState>,
    mut camera: ResMut<OrbitCameraRes>,
) {
    // Collect events first (they can only be read once)
    let delta: Vec2 = motion.read().map(|m| m.delta).sum();

    if mouse.just_pressed(MouseButton::Left) {
        gesture.mouse_drag = Some(Vec2::ZERO);
        camera.0.begin_drag();
    }
    if let Some(total) = gesture.mouse_drag.as_mut() {
        if delta != Vec2::ZERO {
            *total += delta;
            let translation = *total;
            camera.0.update_drag(translation);
        }
    }
    if mouse.just_released(MouseButton::Left) && gesture.mouse_drag.take().is_some() {
        camera.0.end_drag();
    }

    let mut fingers = touches.iter();
    match (fingers.next(), fingers.next()) {
        (Some(touch), None) => {
            if gesture.touch_drag != Some(touch.id()) {
                gesture.touch_drag = Some(touch.id());
                camera.0.begin_drag();
            }
            let translation = touch.position() - touch.start_position();
            camera.0.update_drag(translation);
        }
        _ => {
            if gesture.touch_drag.take().is_some() {
                camera.0.end_drag();
            }
        }
    }
}

/// Trackpad pinch, mouse wheel and two-finger pinch all zoom.
pub fn handle_zoom(
    mut pinch: MessageReader<PinchGesture>,
    mut wheel: MessageReader<MouseWheel>,
    touches: Res<Touches>,
    mut gesture: ResMut<GestureState>,
    mut camera: ResMut<OrbitCameraRes>,
) {
    for ev in pinch.read() {
        camera.0.pinch(1.0 + ev.0);
    }

    let lines: f32 = wheel
        .read()
        .map(|ev| match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y / PIXELS_PER_LINE,
        })
        .sum();
    if lines != 0.0 {
        let sensitivity = camera.0.config().wheel_zoom_sensitivity;
        camera.0.pinch(1.0 + lines * sensitivity);
    }

    let mut fingers = touches.iter();
    match (fingers.next(), fingers.next(), fingers.next()) {
        (Some(a), Some(b), None) => {
            let separation = a.position().distance(b.position());
            if let Some(prev) = gesture.touch_separation {
                if prev > 0.0 && separation != prev {
                    camera.0.pinch(separation / prev);
                }
            }
            gesture.touch_separation = Some(separation);
        }
        _ => gesture.touch_separation = None,
    }
}

pub fn handle_reset(keys: Res<ButtonInput<KeyCode>>, mut camera: ResMut<OrbitCameraRes>) {
    if keys.just_pressed(KeyCode::KeyR) {
        debug!("camera reset");
        camera.0.reset();
    }
}

/// Push the orbit state into the camera transform whenever it changed.
pub fn apply_camera_pose(
    camera: Res<OrbitCameraRes>,
    mut cams: Query<&mut Transform, With<OrbitCam>>,
) {
    if !camera.is_changed() {
        return;
    }
    let pose = camera.0.pose();
    for mut transform in cams.iter_mut() {
        *transform = Transform::from_translation(pose.position).looking_at(pose.target, pose.up);
    }
}
