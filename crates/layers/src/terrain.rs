//! Closed grid terrain: elevation surface, skirt walls and a base plate.
//!
//! Vertices live in grid-index space: sample `(r, c)` sits at
//! `(r, height * vertical_scale, c)`. The result is a closed 2-manifold with
//! counter-clockwise front faces pointing out of the solid.

use foundation::math::Vec3;
use scene::{CameraPose, TerrainMesh};
use tracing::debug;

use crate::heights::HeightGrid;

pub const DEFAULT_GRID_SIZE: usize = 100;
/// Camera height above the highest vertex.
pub const CAMERA_LIFT: f64 = 200.0;
/// Camera pull-back along +Z from the terrain center.
pub const CAMERA_BACKOFF: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTerrainOptions {
    pub rows: usize,
    pub cols: usize,
    /// Mesh units per meter of elevation.
    pub vertical_scale: f64,
    /// Distance from the lowest surface vertex down to the base plate.
    pub skirt_depth: f64,
}

impl Default for GridTerrainOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_SIZE,
            cols: DEFAULT_GRID_SIZE,
            vertical_scale: 0.1,
            skirt_depth: 50.0,
        }
    }
}

impl GridTerrainOptions {
    pub fn square(size: usize) -> Self {
        Self {
            rows: size,
            cols: size,
            ..Self::default()
        }
    }
}

/// Position of boundary vertex `(r, c)` on the perimeter walk: along row 0,
/// down the last column, back along the last row, up column 0.
fn ring_position(r: usize, c: usize, rows: usize, cols: usize) -> usize {
    let (last_r, last_c) = (rows - 1, cols - 1);
    if r == 0 {
        c
    } else if c == last_c {
        last_c + r
    } else if r == last_r {
        last_c + last_r + (last_c - c)
    } else {
        2 * last_c + last_r + (last_r - r)
    }
}

fn perimeter(rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let (last_r, last_c) = (rows - 1, cols - 1);
    let mut ring = Vec::with_capacity(2 * (last_r + last_c));
    ring.extend((0..last_c).map(|c| (0, c)));
    ring.extend((0..last_r).map(|r| (r, last_c)));
    ring.extend((1..=last_c).rev().map(|c| (last_r, c)));
    ring.extend((1..=last_r).rev().map(|r| (r, 0)));
    ring
}

/// Build the closed terrain block for `grid`. Normals are filled in.
pub fn build_grid_mesh(grid: &HeightGrid, options: &GridTerrainOptions) -> TerrainMesh {
    let (rows, cols) = (grid.rows(), grid.cols());
    let scale = options.vertical_scale;
    let top = |r: usize, c: usize| (r * cols + c) as u32;

    let ring = perimeter(rows, cols);
    let surface_vertices = rows * cols;
    let vertex_count = surface_vertices + ring.len() + 1;
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut indices =
        Vec::with_capacity(6 * (rows - 1) * (cols - 1) + 9 * ring.len());

    for r in 0..rows {
        for c in 0..cols {
            positions.extend_from_slice(&[r as f32, (grid.get(r, c) * scale) as f32, c as f32]);
        }
    }

    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let (i00, i01) = (top(r, c), top(r, c + 1));
            let (i10, i11) = (top(r + 1, c), top(r + 1, c + 1));
            indices.extend_from_slice(&[i00, i11, i10, i00, i01, i11]);
        }
    }

    let base_y = grid.min() * scale - options.skirt_depth;
    for &(r, c) in &ring {
        positions.extend_from_slice(&[r as f32, base_y as f32, c as f32]);
    }
    let center = vertex_count as u32 - 1;
    positions.extend_from_slice(&[
        (rows - 1) as f32 * 0.5,
        base_y as f32,
        (cols - 1) as f32 * 0.5,
    ]);

    let dropped = |r: usize, c: usize| (surface_vertices + ring_position(r, c, rows, cols)) as u32;
    for (k, &(pr, pc)) in ring.iter().enumerate() {
        let (qr, qc) = ring[(k + 1) % ring.len()];
        let (p, q) = (top(pr, pc), top(qr, qc));
        let (p_low, q_low) = (dropped(pr, pc), dropped(qr, qc));
        // Wall quad, then the base fan triangle under it.
        indices.extend_from_slice(&[p, q_low, q, p, p_low, q_low]);
        indices.extend_from_slice(&[center, q_low, p_low]);
    }

    let mut mesh = TerrainMesh::new(positions, indices);
    mesh.compute_normals();
    debug!(
        rows,
        cols,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        base_y,
        "grid terrain built"
    );
    mesh
}

/// Above the grid center, lifted over the highest point and pulled back.
pub fn grid_camera(grid: &HeightGrid, options: &GridTerrainOptions) -> CameraPose {
    let (rows, cols) = (grid.rows() as f64, grid.cols() as f64);
    let max_y = grid.max() * options.vertical_scale;
    let min_y = grid.min() * options.vertical_scale;
    CameraPose {
        position: Vec3::new(rows / 2.0, max_y + CAMERA_LIFT, cols / 2.0 + CAMERA_BACKOFF),
        target: Vec3::new(
            (rows - 1.0) / 2.0,
            (min_y + max_y) / 2.0,
            (cols - 1.0) / 2.0,
        ),
    }
}
