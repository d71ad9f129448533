use bevy::prelude::*;

use crate::camera::OrbitCamera;
use crate::config::StudioConfig;
use crate::render::{ConfigRes, OrbitCameraRes, StudioPlugin, StudioRes};
use crate::studio::Studio;

fn studio_app(studio: Studio<Entity>, config: StudioConfig) -> App {
    let bg = config.scene.background;
    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb(bg.r, bg.g, bg.b)))
        .insert_resource(OrbitCameraRes(OrbitCamera::new(config.camera.clone())))
        .insert_resource(ConfigRes(config))
        .insert_resource(StudioRes::new(studio));
    app
}

/// Open a window and run the studio until it is closed. `log_filter` is handed to Bevy's
/// `LogPlugin` (e.g. `"info,graph_studio=debug"`).
#[cfg(not(target_arch = "wasm32"))]
pub fn run_studio(studio: Studio<Entity>, config: StudioConfig, log_filter: &str) {
    studio_app(studio, config)
        .add_plugins((
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Graph Studio".into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(bevy::log::LogPlugin {
                    filter: log_filter.to_string(),
                    ..default()
                }),
            StudioPlugin,
        ))
        .run();
}

#[cfg(target_arch = "wasm32")]
pub fn run_studio(studio: Studio<Entity>, config: StudioConfig, canvas_id: &str) {
    studio_app(studio, config)
        .add_plugins((
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    canvas: Some(format!("#{}", canvas_id)),
                    fit_canvas_to_parent: true,
                    ..default()
                }),
                ..default()
            }),
            StudioPlugin,
        ))
        .run();
}
