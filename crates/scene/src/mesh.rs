//! Indexed triangle meshes.

use foundation::Aabb3;
use foundation::math::Vec3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("index buffer length {len} is not a multiple of 3")]
    PartialTriangle { len: usize },
    #[error("index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
    #[error("{attribute} has {actual} values, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Flat-buffer triangle mesh.
///
/// `positions` and `normals` hold xyz triples, `uvs` hold uv pairs. Triangles
/// are counter-clockwise when seen from their front side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainMesh {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    pub uvs: Option<Vec<f32>>,
    pub normals: Option<Vec<f32>>,
}

impl TerrainMesh {
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            uvs: None,
            normals: None,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, index: usize) -> Option<Vec3> {
        let p = self.positions.get(index * 3..index * 3 + 3)?;
        Some(Vec3::from([p[0], p[1], p[2]]))
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Area-weighted vertex normals from the `(b - a) x (c - a)` face normals.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertex_count()];
        for [a, b, c] in self.triangles() {
            let (Some(pa), Some(pb), Some(pc)) = (
                self.position(a as usize),
                self.position(b as usize),
                self.position(c as usize),
            ) else {
                continue;
            };
            let face = (pb - pa).cross(pc - pa);
            acc[a as usize] += face;
            acc[b as usize] += face;
            acc[c as usize] += face;
        }

        let mut normals = Vec::with_capacity(acc.len() * 3);
        for n in acc {
            normals.extend_from_slice(&n.normalize_or_zero().as_f32());
        }
        self.normals = Some(normals);
    }

    pub fn bounds(&self) -> Option<Aabb3> {
        Aabb3::from_points(
            self.positions
                .chunks_exact(3)
                .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64]),
        )
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        let vertices = self.vertex_count();
        if self.positions.len() % 3 != 0 {
            return Err(MeshError::AttributeLength {
                attribute: "positions",
                expected: vertices * 3,
                actual: self.positions.len(),
            });
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle {
                len: self.indices.len(),
            });
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(MeshError::IndexOutOfRange { index, vertices });
        }
        let attributes = [("uvs", &self.uvs, 2), ("normals", &self.normals, 3)];
        for (attribute, values, width) in attributes {
            if let Some(values) = values {
                if values.len() != vertices * width {
                    return Err(MeshError::AttributeLength {
                        attribute,
                        expected: vertices * width,
                        actual: values.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MeshError, TerrainMesh};

    fn quad() -> TerrainMesh {
        // Unit square in the XZ plane, wound to face +Y.
        TerrainMesh::new(
            vec![
                0.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, //
                1.0, 0.0, 0.0, //
                1.0, 0.0, 1.0,
            ],
            vec![0, 3, 2, 0, 1, 3],
        )
    }

    #[test]
    fn flat_quad_normals_point_up() {
        let mut mesh = quad();
        mesh.compute_normals();
        let normals = mesh.normals.as_ref().unwrap();
        for n in normals.chunks_exact(3) {
            assert_eq!(n, [0.0, 1.0, 0.0]);
        }
        assert_eq!(mesh.validate(), Ok(()));
    }

    #[test]
    fn validation_catches_bad_buffers() {
        let mut mesh = quad();
        mesh.indices.push(1);
        assert_eq!(mesh.validate(), Err(MeshError::PartialTriangle { len: 7 }));

        let mut mesh = quad();
        mesh.indices[4] = 9;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange {
                index: 9,
                vertices: 4
            })
        );

        let mesh = quad().with_uvs(vec![0.0; 6]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::AttributeLength {
                attribute: "uvs",
                ..
            })
        ));
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let mesh = quad();
        let aabb = mesh.bounds().unwrap();
        assert_eq!(aabb.min, [0.0, 0.0, 0.0]);
        assert_eq!(aabb.max, [1.0, 0.0, 1.0]);
        assert!(TerrainMesh::default().bounds().is_none());
        assert_eq!(mesh.triangle_count(), 2);
    }
}
