pub mod components;
pub mod mesh;
pub mod resources;
pub mod systems;

pub use components::*;
pub use mesh::*;
pub use resources::*;
use systems::*;

use bevy::prelude::*;

#[derive(Default)]
pub struct StudioPlugin;

impl Plugin for StudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GestureState>()
            .add_systems(Startup, setup_scene)
            .add_systems(
                Update,
                (
                    drive_studio,
                    (handle_drag, handle_zoom, handle_reset, apply_camera_pose).chain(),
                ),
            );
    }
}
