//! Textured drape over a stitched tile range.

use formats::{RasterImage, elevation_at};
use foundation::math::Vec3;
use scene::{CameraPose, TerrainMesh};
use tracing::{debug, warn};

use crate::terrain::{CAMERA_BACKOFF, CAMERA_LIFT};

/// Vertex count above which a drape is considered oversized.
pub const LARGE_DRAPE_VERTICES: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrapeOptions {
    /// Sample every `step`-th pixel. 1 keeps one vertex per pixel.
    pub step: u32,
    /// Mesh units per meter of elevation.
    pub vertical_scale: f64,
}

impl Default for DrapeOptions {
    fn default() -> Self {
        Self {
            step: 1,
            vertical_scale: 1.0 / 20.0,
        }
    }
}

impl DrapeOptions {
    /// Smallest step that keeps a `width x height` drape within `max_vertices`.
    pub fn within_vertex_budget(width: u32, height: u32, max_vertices: usize) -> Self {
        let mut step = 1;
        while step < width.max(height)
            && axis_samples(width, step).len() * axis_samples(height, step).len() > max_vertices
        {
            step += 1;
        }
        Self {
            step,
            ..Self::default()
        }
    }
}

/// Pixel offsets sampled along one axis; the last pixel is always included.
fn axis_samples(len: u32, step: u32) -> Vec<u32> {
    if len == 0 {
        return Vec::new();
    }
    let mut out: Vec<u32> = (0..len).step_by(step.max(1) as usize).collect();
    if out.last() != Some(&(len - 1)) {
        out.push(len - 1);
    }
    out
}

/// One vertex per sampled pixel of `heights`, UV-mapped over the full
/// raster. Undecodable pixels cannot occur here; missing tiles were already
/// filled with 0 m by the stitcher.
pub fn build_drape_mesh(heights: &RasterImage, options: &DrapeOptions) -> TerrainMesh {
    let (w, h) = (heights.width(), heights.height());
    let xs = axis_samples(w, options.step);
    let ys = axis_samples(h, options.step);
    let n = xs.len();

    let vertices = n * ys.len();
    if options.step == 1 && vertices > LARGE_DRAPE_VERTICES {
        warn!(vertices, width = w, height = h, "full resolution drape is very large");
    }

    let (half_w, half_h) = (w as f64 / 2.0, h as f64 / 2.0);
    let mut positions = Vec::with_capacity(vertices * 3);
    let mut uvs = Vec::with_capacity(vertices * 2);
    for &y in &ys {
        for &x in &xs {
            let elevation = elevation_at(heights, x, y).unwrap_or(0.0);
            positions.extend_from_slice(&[
                (x as f64 - half_w) as f32,
                (elevation * options.vertical_scale) as f32,
                (y as f64 - half_h) as f32,
            ]);
            uvs.extend_from_slice(&[x as f32 / w as f32, y as f32 / h as f32]);
        }
    }

    let mut indices = Vec::with_capacity(n.saturating_sub(1) * ys.len().saturating_sub(1) * 6);
    for row in 0..ys.len().saturating_sub(1) {
        for col in 0..n.saturating_sub(1) {
            let i = (row * n + col) as u32;
            let below = i + n as u32;
            indices.extend_from_slice(&[i, below, i + 1, i + 1, below, below + 1]);
        }
    }

    let mut mesh = TerrainMesh::new(positions, indices).with_uvs(uvs);
    mesh.compute_normals();
    debug!(
        width = w,
        height = h,
        step = options.step,
        vertices = mesh.vertex_count(),
        "drape built"
    );
    mesh
}

/// Above the drape center, lifted over its highest vertex and pulled back.
pub fn drape_camera(mesh: &TerrainMesh) -> CameraPose {
    let Some(aabb) = mesh.bounds() else {
        return CameraPose {
            position: Vec3::new(0.0, CAMERA_LIFT, CAMERA_BACKOFF),
            target: Vec3::ZERO,
        };
    };
    let [cx, cy, cz] = aabb.center();
    CameraPose {
        position: Vec3::new(cx, aabb.max[1] + CAMERA_LIFT, cz + CAMERA_BACKOFF),
        target: Vec3::new(cx, cy, cz),
    }
}
