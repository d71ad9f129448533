use crate::core::ItemId;
use bevy::prelude::*;

/// A mounted surface mesh, tagged with the item it renders.
#[derive(Component, Clone, Copy, Debug)]
pub struct SurfaceNode {
    pub id: ItemId,
}

/// Parent of every surface node.
#[derive(Component)]
pub struct SurfaceRoot;

/// The single perspective camera driven by [`crate::camera::OrbitCamera`].
#[derive(Component)]
pub struct OrbitCam;

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisLine {
    X,
    Y,
    Z,
}
