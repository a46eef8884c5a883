// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point2, Point3, Vector3};

/// Small term added to the UV denominator so flat extents never divide by zero
const UV_EPSILON: f64 = 1e-8;

/// Triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v); either empty or one pair per vertex
    pub uvs: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            uvs: Vec::new(),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
    }

    /// Add a vertex with normal and texture coordinate
    #[inline]
    pub fn add_vertex_uv(&mut self, position: Point3<f64>, normal: Vector3<f64>, uv: Point2<f64>) {
        self.add_vertex(position, normal);
        self.uvs.push(uv.x as f32);
        self.uvs.push(uv.y as f32);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// True when every vertex carries a texture coordinate
    #[inline]
    pub fn has_uvs(&self) -> bool {
        !self.is_empty() && self.uvs.len() == self.vertex_count() * 2
    }

    /// Merge another mesh into this one
    ///
    /// Texture coordinates survive only when both sides carry them.
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let keep_uvs = (self.is_empty() || self.has_uvs()) && other.has_uvs();
        let vertex_offset = (self.positions.len() / 3) as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        if keep_uvs {
            self.uvs.extend_from_slice(&other.uvs);
        } else {
            self.uvs.clear();
        }

        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Concatenate meshes into a new one
    pub fn concatenate(meshes: &[Mesh]) -> Mesh {
        let vertices: usize = meshes.iter().map(Mesh::vertex_count).sum();
        let indices: usize = meshes.iter().map(|m| m.indices.len()).sum();

        let mut combined = Mesh::with_capacity(vertices, indices);
        for mesh in meshes {
            combined.merge(mesh);
        }
        combined
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True when no position is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.positions.iter().all(|v| v.is_finite())
    }

    /// Calculate bounds (min, max)
    #[inline]
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        });

        (min, max)
    }

    /// Extents of the bounding box along each axis
    pub fn extents(&self) -> Vector3<f64> {
        let (min, max) = self.bounds();
        Vector3::new(
            (max.x - min.x) as f64,
            (max.y - min.y) as f64,
            (max.z - min.z) as f64,
        )
    }

    /// Signed enclosed volume via the divergence theorem.
    ///
    /// Positive for closed meshes with outward-facing winding.
    pub fn signed_volume(&self) -> f64 {
        let p = |i: u32| -> Vector3<f64> {
            let base = i as usize * 3;
            Vector3::new(
                self.positions[base] as f64,
                self.positions[base + 1] as f64,
                self.positions[base + 2] as f64,
            )
        };

        self.indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| (i as usize) < self.vertex_count()))
            .map(|tri| p(tri[0]).dot(&p(tri[1]).cross(&p(tri[2]))) / 6.0)
            .sum()
    }

    /// Assign planar texture coordinates from the XY position:
    /// `uv = (xy - min) / (max - min + eps)` over the given 2D bounds.
    pub fn set_planar_uvs(&mut self, min: Point2<f64>, max: Point2<f64>) {
        let du = max.x - min.x + UV_EPSILON;
        let dv = max.y - min.y + UV_EPSILON;

        self.uvs = self
            .positions
            .chunks_exact(3)
            .flat_map(|c| {
                [
                    ((c[0] as f64 - min.x) / du) as f32,
                    ((c[1] as f64 - min.y) / dv) as f32,
                ]
            })
            .collect();
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::box_mesh;
    use approx::assert_relative_eq;

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(!mesh.has_uvs());
    }

    #[test]
    fn test_add_vertex() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_merge() {
        let mut mesh1 = Mesh::new();
        mesh1.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        mesh1.add_triangle(0, 1, 2);

        let mut mesh2 = Mesh::new();
        mesh2.add_vertex(Point3::new(1.0, 1.0, 1.0), Vector3::y());
        mesh2.add_triangle(0, 1, 2);

        mesh1.merge(&mesh2);
        assert_eq!(mesh1.vertex_count(), 2);
        assert_eq!(mesh1.triangle_count(), 2);
        assert_eq!(&mesh1.indices[3..], &[1, 2, 3]);
    }

    #[test]
    fn test_concatenate() {
        let a = box_mesh(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let b = box_mesh(Point3::new(5.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));

        let combined = Mesh::concatenate(&[a.clone(), b]);
        assert_eq!(combined.vertex_count(), 2 * a.vertex_count());
        assert_eq!(combined.triangle_count(), 2 * a.triangle_count());
        assert_relative_eq!(combined.signed_volume(), 2.0, epsilon = 1e-4);

        assert!(Mesh::concatenate(&[]).is_empty());
    }

    #[test]
    fn test_merge_drops_partial_uvs() {
        let mut textured = Mesh::new();
        textured.add_vertex_uv(Point3::origin(), Vector3::z(), Point2::new(0.5, 0.5));

        let mut combined = Mesh::new();
        combined.merge(&textured);
        assert!(combined.has_uvs());

        let mut plain = Mesh::new();
        plain.add_vertex(Point3::new(1.0, 0.0, 0.0), Vector3::z());
        combined.merge(&plain);
        assert!(!combined.has_uvs());
        assert!(combined.uvs.is_empty());
    }

    #[test]
    fn test_signed_volume_of_box() {
        let mesh = box_mesh(Point3::origin(), Vector3::new(2.0, 3.0, 4.0));
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-4);
    }

    #[test]
    fn test_planar_uvs_span_unit_square() {
        let mesh_box = box_mesh(Point3::new(5.0, 5.0, 0.0), Vector3::new(10.0, 4.0, 1.0));
        let mut mesh = mesh_box.clone();
        mesh.set_planar_uvs(Point2::new(0.0, 3.0), Point2::new(10.0, 7.0));

        assert!(mesh.has_uvs());
        for uv in mesh.uvs.chunks_exact(2) {
            assert!((-1e-6..=1.0).contains(&uv[0]));
            assert!((-1e-6..=1.0).contains(&uv[1]));
        }
    }

    #[test]
    fn test_is_finite() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        assert!(mesh.is_finite());
        mesh.positions[1] = f32::NAN;
        assert!(!mesh.is_finite());
    }
}
