//! Regular-grid sampling of `z = f(x, y)` and its triangulation.

use crate::core::{Color, GridSpec};
use crate::expr::{AxisPoint, Function};
use bevy_math::Vec3;

/// Samples laid out row-major: `y` index outer, `x` index inner.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceGrid {
    pub points: Vec<Vec3>,
    pub x_count: usize,
    pub y_count: usize,
}

impl SurfaceGrid {
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.x_count + i
    }
}

/// Evaluate `f` once per grid point. Counts are clamped to
/// `GridSpec::MIN_COUNT..=GridSpec::MAX_COUNT`; non-finite results are kept verbatim.
pub fn sample_grid(f: &dyn Function, spec: &GridSpec) -> SurfaceGrid {
    let (x_count, y_count) = spec.clamped_counts();
    let (x_lo, x_hi) = (*spec.x_range.start(), *spec.x_range.end());
    let (y_lo, y_hi) = (*spec.y_range.start(), *spec.y_range.end());

    let x_step = (x_hi - x_lo) / (x_count - 1) as f64;
    let y_step = (y_hi - y_lo) / (y_count - 1) as f64;

    let mut points = Vec::with_capacity(x_count * y_count);
    for j in 0..y_count {
        let y = y_lo + j as f64 * y_step;
        for i in 0..x_count {
            let x = x_lo + i as f64 * x_step;
            let z = f.evaluate(&AxisPoint { x, y });
            points.push(Vec3::new(x as f32, y as f32, z as f32));
        }
    }

    SurfaceGrid {
        points,
        x_count,
        y_count,
    }
}

/// Indexed triangle mesh in math space (`z` is the function value).
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<[u32; 3]>,
    pub color: Color,
}

impl SurfaceMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Flattened index buffer for triangle-list topology.
    pub fn flat_indices(&self) -> Vec<u32> {
        self.indices.iter().flatten().copied().collect()
    }
}

/// Triangulate a sampled grid. Each cell `(i, j)` yields `(a, b, c)` and `(b, d, c)` with
/// `a = j*nx + i`, `b = a + 1`, `c = a + nx`, `d = c + 1`.
///
/// Grids from [`sample_grid`] are capped at [`GridSpec::MAX_COUNT`] per axis, so every index
/// fits in a `u32`.
pub fn build_mesh(grid: &SurfaceGrid, color: Color) -> SurfaceMesh {
    let w = grid.x_count;
    let h = grid.y_count;

    let vertices: Vec<[f32; 3]> = grid.points.iter().map(|p| [p.x, p.y, p.z]).collect();

    let mut indices = Vec::with_capacity(w.saturating_sub(1) * h.saturating_sub(1) * 2);
    for j in 0..h.saturating_sub(1) {
        for i in 0..w.saturating_sub(1) {
            let a = (j * w + i) as u32;
            let b = a + 1;
            let c = a + w as u32;
            let d = c + 1;

            indices.push([a, b, c]);
            indices.push([b, d, c]);
        }
    }

    SurfaceMesh {
        vertices,
        indices,
        color,
    }
}

/// Sample and triangulate in one step.
pub fn build_surface(f: &dyn Function, spec: &GridSpec, color: Color) -> SurfaceMesh {
    build_mesh(&sample_grid(f, spec), color)
}
