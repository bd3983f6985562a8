//! Mesh representation and primitive generation
//!
//! CPU-side geometry: vertex and index data plus the topology the draw
//! call uses. Meshes are registered with the renderer, which uploads them
//! through the device and hands back a [`crate::render::MeshId`].
//!
//! File-based model loading is an external concern; this module only
//! generates the primitives the engine itself needs (fullscreen quad,
//! light-volume sphere) and the basic shapes scenes are built from.

use crate::render::api::PrimitiveTopology;

/// 3D vertex with position, normal, and texture coordinates
///
/// `#[repr(C)]` keeps the layout stable for GPU buffer uploads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

// Safe: Vertex contains only f32 fields with no padding (8 floats, 32 bytes).
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// CPU-side mesh geometry
///
/// An empty index list means the mesh draws non-indexed in vertex order
/// (the fullscreen quad strip); otherwise the draw is indexed.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Index data; empty for non-indexed meshes
    pub indices: Vec<u32>,
    /// Primitive assembly topology
    pub topology: PrimitiveTopology,
}

impl Mesh {
    /// Create a mesh from raw vertex and index data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, topology: PrimitiveTopology) -> Self {
        Self {
            vertices,
            indices,
            topology,
        }
    }

    /// Vertex data as bytes for device upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// A fullscreen quad in normalized device coordinates
    ///
    /// Four vertices as a triangle strip, drawn non-indexed. Used for the
    /// deferred directional lighting pass and post-process resolves.
    pub fn fullscreen_quad() -> Self {
        let forward = [0.0, 0.0, 1.0];
        Self::new(
            vec![
                Vertex::new([-1.0, 1.0, 0.0], forward, [0.0, 1.0]),
                Vertex::new([-1.0, -1.0, 0.0], forward, [0.0, 0.0]),
                Vertex::new([1.0, 1.0, 0.0], forward, [1.0, 1.0]),
                Vertex::new([1.0, -1.0, 0.0], forward, [1.0, 0.0]),
            ],
            Vec::new(),
            PrimitiveTopology::TriangleStrip,
        )
    }

    /// A horizontal plane of the given half-extent centered at the origin
    pub fn plane(half_extent: f32) -> Self {
        let up = [0.0, 1.0, 0.0];
        let h = half_extent;
        Self::new(
            vec![
                Vertex::new([-h, 0.0, -h], up, [0.0, 0.0]),
                Vertex::new([h, 0.0, -h], up, [h, 0.0]),
                Vertex::new([h, 0.0, h], up, [h, h]),
                Vertex::new([-h, 0.0, h], up, [0.0, h]),
            ],
            vec![0, 2, 1, 0, 3, 2],
            PrimitiveTopology::TriangleList,
        )
    }

    /// A unit cube centered at the origin
    pub fn cube() -> Self {
        // 24 vertices: each face gets its own normals and UVs.
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // (normal, tangent u, tangent v)
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, (normal, u_axis, v_axis)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            for (du, dv, uv) in [
                (-0.5, -0.5, [0.0, 0.0]),
                (0.5, -0.5, [1.0, 0.0]),
                (0.5, 0.5, [1.0, 1.0]),
                (-0.5, 0.5, [0.0, 1.0]),
            ] {
                let position = [
                    normal[0] * 0.5 + u_axis[0] * du + v_axis[0] * dv,
                    normal[1] * 0.5 + u_axis[1] * du + v_axis[1] * dv,
                    normal[2] * 0.5 + u_axis[2] * du + v_axis[2] * dv,
                ];
                vertices.push(Vertex::new(position, *normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(vertices, indices, PrimitiveTopology::TriangleList)
    }

    /// A unit UV sphere centered at the origin
    ///
    /// Used as the point-light bounding volume; the lighting pass scales it
    /// by the light's volume radius. Low segment counts are fine there -
    /// the volume only needs to cover the lit region, not look round.
    pub fn uv_sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(3);
        let segments = segments.max(3);

        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            for segment in 0..=segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                let (sin_theta, cos_theta) = theta.sin_cos();
                let position = [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta];
                let uv = [
                    segment as f32 / segments as f32,
                    ring as f32 / rings as f32,
                ];
                vertices.push(Vertex::new(position, position, uv));
            }
        }

        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self::new(vertices, indices, PrimitiveTopology::TriangleList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullscreen_quad_is_non_indexed_strip() {
        let quad = Mesh::fullscreen_quad();
        assert_eq!(quad.vertices.len(), 4);
        assert!(quad.indices.is_empty());
        assert_eq!(quad.topology, PrimitiveTopology::TriangleStrip);
    }

    #[test]
    fn test_cube_geometry_counts() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    #[test]
    fn test_sphere_vertices_are_unit_length() {
        let sphere = Mesh::uv_sphere(8, 16);
        for vertex in &sphere.vertices {
            let [x, y, z] = vertex.position;
            let length = (x * x + y * y + z * z).sqrt();
            assert!((length - 1.0).abs() < 1e-4, "vertex off the unit sphere");
        }
        assert!(sphere
            .indices
            .iter()
            .all(|&i| (i as usize) < sphere.vertices.len()));
    }

    #[test]
    fn test_vertex_bytes_length() {
        let quad = Mesh::fullscreen_quad();
        assert_eq!(
            quad.vertex_bytes().len(),
            quad.vertices.len() * std::mem::size_of::<Vertex>()
        );
    }
}
