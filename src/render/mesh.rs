//! Conversion of math-space surface meshes into Bevy render meshes.

use crate::config::NonFinitePolicy;
use crate::surface::SurfaceMesh;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};

/// Math `(x, y, z)` becomes world `(x, z, y)` so the function value points up.
#[inline]
pub fn to_world(v: [f32; 3]) -> [f32; 3] {
    [v[0], v[2], v[1]]
}

/// Build a renderable mesh. Non-finite vertices are handled per `policy`.
pub fn surface_to_mesh(surface: &SurfaceMesh, policy: NonFinitePolicy) -> Mesh {
    let mut positions: Vec<[f32; 3]> = surface.vertices.iter().copied().map(to_world).collect();

    let indices: Vec<u32> = match policy {
        NonFinitePolicy::Keep => surface.flat_indices(),
        NonFinitePolicy::CullTriangles => {
            let finite = |i: u32| positions[i as usize].iter().all(|c| c.is_finite());
            let kept: Vec<u32> = surface
                .indices
                .iter()
                .filter(|tri| tri.iter().all(|&i| finite(i)))
                .flatten()
                .copied()
                .collect();
            // Orphaned vertices still reach the GPU, so give them a harmless position.
            for p in positions.iter_mut() {
                if !p.iter().all(|c| c.is_finite()) {
                    *p = [0.0; 3];
                }
            }
            kept
        }
    };

    let normals = compute_surface_normals(&positions, &indices);

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_indices(Indices::U32(indices))
}

/// Smooth vertex normals: area-weighted sum of adjacent face normals.
fn compute_surface_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let pos = |i: usize| Vec3::from_array(positions[i]);

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let n = (pos(b) - pos(a)).cross(pos(c) - pos(a));
        if !n.is_finite() {
            continue;
        }
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }

    normals
        .into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}
