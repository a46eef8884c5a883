// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG (Constructive Solid Geometry) Operations
//!
//! Mesh union and difference on top of csgrs. Every difference result is
//! checked before it is handed back: an empty, non-finite or grown result
//! is reported as [`Error::BooleanFailure`] instead of silently replacing
//! the host mesh.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::triangulation::{calculate_polygon_normal, project_to_2d, triangulate_polygon};
use csgrs::traits::CSG;
use nalgebra::{Point3, Vector3};

/// Triangle definition
#[derive(Debug, Clone)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculate triangle normal
    pub fn normal(&self) -> Vector3<f64> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1
            .cross(&edge2)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z)
    }

    /// Calculate triangle area
    pub fn area(&self) -> f64 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).norm() * 0.5
    }
}

/// Axis-aligned box centered at `center` with full edge lengths `extents`.
///
/// 12 outward-facing triangles, flat normals per face.
pub fn box_mesh(center: Point3<f64>, extents: Vector3<f64>) -> Mesh {
    let half = extents.abs() * 0.5;
    let min = center - half;
    let max = center + half;

    let mut mesh = Mesh::with_capacity(36, 36);

    let v0 = Point3::new(min.x, min.y, min.z);
    let v1 = Point3::new(max.x, min.y, min.z);
    let v2 = Point3::new(max.x, max.y, min.z);
    let v3 = Point3::new(min.x, max.y, min.z);
    let v4 = Point3::new(min.x, min.y, max.z);
    let v5 = Point3::new(max.x, min.y, max.z);
    let v6 = Point3::new(max.x, max.y, max.z);
    let v7 = Point3::new(min.x, max.y, max.z);

    // -Z
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v0, v2, v1));
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v0, v3, v2));
    // +Z
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v4, v5, v6));
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v4, v6, v7));
    // -X
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v0, v4, v7));
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v0, v7, v3));
    // +X
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v1, v2, v6));
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v1, v6, v5));
    // -Y
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v0, v1, v5));
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v0, v5, v4));
    // +Y
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v3, v7, v6));
    add_triangle_to_mesh(&mut mesh, &Triangle::new(v3, v6, v2));

    mesh
}

/// CSG boolean processor
pub struct ClippingProcessor {
    /// Relative tolerance used when comparing volumes before and after a cut
    pub epsilon: f64,
}

impl ClippingProcessor {
    /// Create a new clipping processor
    pub fn new() -> Self {
        Self { epsilon: 1e-4 }
    }

    /// Union several closed meshes into one.
    ///
    /// An empty input yields an empty mesh.
    pub fn union_all(&self, meshes: &[Mesh]) -> Result<Mesh> {
        let mut iter = meshes.iter().filter(|m| !m.is_empty());
        let Some(first) = iter.next() else {
            return Ok(Mesh::new());
        };

        let mut acc = Self::mesh_to_csgrs(first);
        for mesh in iter {
            acc = acc.union(&Self::mesh_to_csgrs(mesh));
        }

        let result = Self::csgrs_to_mesh(&acc);
        if result.is_empty() || !result.is_finite() {
            return Err(Error::BooleanFailure(format!(
                "union of {} meshes produced no usable geometry",
                meshes.len()
            )));
        }
        Ok(result)
    }

    /// Subtract `cutter` from `host` using csgrs.
    ///
    /// Fails with [`Error::BooleanFailure`] when the result is empty,
    /// contains non-finite coordinates, or encloses more volume than the
    /// host did.
    pub fn subtract_mesh(&self, host: &Mesh, cutter: &Mesh) -> Result<Mesh> {
        if cutter.is_empty() {
            return Ok(host.clone());
        }
        if host.is_empty() {
            return Err(Error::EmptyMesh("difference host is empty".to_string()));
        }

        let host_csg = Self::mesh_to_csgrs(host);
        let cutter_csg = Self::mesh_to_csgrs(cutter);
        let result = Self::csgrs_to_mesh(&host_csg.difference(&cutter_csg));

        if result.is_empty() {
            return Err(Error::BooleanFailure(
                "difference produced an empty mesh".to_string(),
            ));
        }
        if !result.is_finite() {
            return Err(Error::BooleanFailure(
                "difference produced non-finite coordinates".to_string(),
            ));
        }

        let before = host.signed_volume();
        let after = result.signed_volume();
        if after > before + before.abs() * self.epsilon + 1e-9 {
            return Err(Error::BooleanFailure(format!(
                "difference grew volume from {:.6} to {:.6}",
                before, after
            )));
        }

        tracing::debug!(
            host_triangles = host.triangle_count(),
            result_triangles = result.triangle_count(),
            volume_before = before,
            volume_after = after,
            "mesh difference"
        );

        Ok(result)
    }

    /// Convert our Mesh format to csgrs Mesh format
    fn mesh_to_csgrs(mesh: &Mesh) -> csgrs::mesh::Mesh<()> {
        use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CSGMesh};

        let vertex_count = mesh.vertex_count();
        let position = |i: usize| {
            Point3::new(
                mesh.positions[i * 3] as f64,
                mesh.positions[i * 3 + 1] as f64,
                mesh.positions[i * 3 + 2] as f64,
            )
        };

        let polygons: Vec<Polygon<()>> = mesh
            .indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
            .filter_map(|tri| {
                let v0 = position(tri[0] as usize);
                let v1 = position(tri[1] as usize);
                let v2 = position(tri[2] as usize);

                // Skip degenerate triangles to avoid NaN propagation
                let face_normal = (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-10)?;

                Some(Polygon::new(
                    vec![
                        Vertex::new(v0, face_normal),
                        Vertex::new(v1, face_normal),
                        Vertex::new(v2, face_normal),
                    ],
                    None,
                ))
            })
            .collect();

        CSGMesh::from_polygons(&polygons, None)
    }

    /// Convert csgrs Mesh format back to our Mesh format
    fn csgrs_to_mesh(csg_mesh: &csgrs::mesh::Mesh<()>) -> Mesh {
        let mut mesh = Mesh::new();

        for polygon in &csg_mesh.polygons {
            let vertices = &polygon.vertices;
            if vertices.len() < 3 {
                continue;
            }

            let points_3d: Vec<Point3<f64>> = vertices
                .iter()
                .map(|v| Point3::new(v.pos[0], v.pos[1], v.pos[2]))
                .collect();

            let raw_normal = Vector3::new(
                vertices[0].normal[0],
                vertices[0].normal[1],
                vertices[0].normal[2],
            );

            let csg_normal = match raw_normal.try_normalize(1e-10) {
                Some(n) if n.iter().all(|c| c.is_finite()) => n,
                _ => match calculate_polygon_normal(&points_3d).try_normalize(1e-10) {
                    Some(n) => n,
                    None => continue,
                },
            };

            let base_idx = mesh.vertex_count() as u32;

            if points_3d.len() == 3 {
                for p in &points_3d {
                    mesh.add_vertex(*p, csg_normal);
                }
                mesh.add_triangle(base_idx, base_idx + 1, base_idx + 2);
                continue;
            }

            let (points_2d, _, _, _) = project_to_2d(&points_3d, &csg_normal);
            let indices = match triangulate_polygon(&points_2d) {
                Ok(idx) => idx,
                Err(_) => continue,
            };

            for p in &points_3d {
                mesh.add_vertex(*p, csg_normal);
            }
            for tri in indices.chunks_exact(3) {
                mesh.add_triangle(
                    base_idx + tri[0] as u32,
                    base_idx + tri[1] as u32,
                    base_idx + tri[2] as u32,
                );
            }
        }

        mesh
    }
}

impl Default for ClippingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Add a triangle to a mesh with a flat normal
fn add_triangle_to_mesh(mesh: &mut Mesh, triangle: &Triangle) {
    let base_idx = mesh.vertex_count() as u32;
    let normal = triangle.normal();

    mesh.add_vertex(triangle.v0, normal);
    mesh.add_vertex(triangle.v1, normal);
    mesh.add_vertex(triangle.v2, normal);

    mesh.add_triangle(base_idx, base_idx + 1, base_idx + 2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_mesh_shape() {
        let mesh = box_mesh(Point3::new(1.0, 2.0, 3.0), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(mesh.triangle_count(), 12);

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 0.0);
        assert_relative_eq!(max.y, 4.0);
        assert_relative_eq!(max.z, 6.0);
        assert_relative_eq!(mesh.signed_volume(), 48.0, epsilon = 1e-4);
    }

    #[test]
    fn test_triangle_normal_and_area() {
        let triangle = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );

        assert!((triangle.normal().z - 1.0).abs() < 1e-6);
        assert!((triangle.area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_subtract_through_cut() {
        let processor = ClippingProcessor::new();
        let slab = box_mesh(Point3::new(5.0, 1.0, 2.0), Vector3::new(10.0, 2.0, 4.0));
        let cutter = box_mesh(Point3::new(5.0, 1.0, 2.0), Vector3::new(2.0, 4.0, 2.0));

        let result = processor.subtract_mesh(&slab, &cutter).unwrap();
        assert_relative_eq!(result.signed_volume(), 72.0, epsilon = 1e-2);
    }

    #[test]
    fn test_subtract_empty_cutter_is_identity() {
        let processor = ClippingProcessor::new();
        let slab = box_mesh(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let result = processor.subtract_mesh(&slab, &Mesh::new()).unwrap();
        assert_eq!(result.triangle_count(), slab.triangle_count());
    }

    #[test]
    fn test_subtract_everything_is_failure() {
        let processor = ClippingProcessor::new();
        let slab = box_mesh(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let cutter = box_mesh(Point3::origin(), Vector3::new(5.0, 5.0, 5.0));

        match processor.subtract_mesh(&slab, &cutter) {
            Err(Error::BooleanFailure(_)) => {}
            other => panic!("Expected BooleanFailure, got {:?}", other.map(|m| m.triangle_count())),
        }
    }

    #[test]
    fn test_union_of_disjoint_boxes() {
        let processor = ClippingProcessor::new();
        let a = box_mesh(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let b = box_mesh(Point3::new(5.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 1.0));

        let union = processor.union_all(&[a, b]).unwrap();
        assert_relative_eq!(union.signed_volume(), 3.0, epsilon = 1e-3);
        assert!(processor.union_all(&[]).unwrap().is_empty());
    }
}
