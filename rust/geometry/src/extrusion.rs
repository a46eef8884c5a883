// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D profiles to 3D meshes

use crate::bool2d::{ensure_ccw, ensure_cw};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::profile::{Profile2D, Triangulation};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Extrude a 2D profile along the Z axis, from z = 0 to z = `depth`.
///
/// Outer rings are treated as counter-clockwise and holes as clockwise
/// regardless of input winding, so the result is a closed solid with
/// outward-facing triangles.
#[inline]
pub fn extrude_profile(
    profile: &Profile2D,
    depth: f64,
    transform: Option<Matrix4<f64>>,
) -> Result<Mesh> {
    if !(depth > 0.0) || !depth.is_finite() {
        return Err(Error::InvalidExtrusion(format!(
            "Depth must be positive, got {}",
            depth
        )));
    }

    let mut normalized = Profile2D::new(ensure_ccw(&profile.outer));
    for hole in &profile.holes {
        normalized.add_hole(ensure_cw(hole));
    }

    let triangulation = normalized.triangulate()?;

    let side_vertex_count = normalized.outer.len() * 4
        + normalized.holes.iter().map(|h| h.len() * 4).sum::<usize>();
    let mut mesh = Mesh::with_capacity(
        triangulation.points.len() * 2 + side_vertex_count,
        triangulation.indices.len() * 2 + side_vertex_count / 4 * 6,
    );

    // Bottom and top caps
    create_cap_mesh(&triangulation, 0.0, false, &mut mesh);
    create_cap_mesh(&triangulation, depth, true, &mut mesh);

    create_side_walls(&normalized.outer, depth, &mut mesh);
    for hole in &normalized.holes {
        create_side_walls(hole, depth, &mut mesh);
    }

    if let Some(mat) = transform {
        apply_transform(&mut mesh, &mat);
    }

    Ok(mesh)
}

/// Create a cap mesh (top or bottom) from triangulation
#[inline]
fn create_cap_mesh(triangulation: &Triangulation, z: f64, facing_up: bool, mesh: &mut Mesh) {
    let base_index = mesh.vertex_count() as u32;
    let normal = if facing_up {
        Vector3::new(0.0, 0.0, 1.0)
    } else {
        Vector3::new(0.0, 0.0, -1.0)
    };

    for point in &triangulation.points {
        mesh.add_vertex(Point3::new(point.x, point.y, z), normal);
    }

    for tri in triangulation.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let ccw = orient2d(
            &triangulation.points[a],
            &triangulation.points[b],
            &triangulation.points[c],
        ) > 0.0;

        let (i0, i1, i2) = (
            base_index + a as u32,
            base_index + b as u32,
            base_index + c as u32,
        );

        // Counter-clockwise seen from +Z faces up
        if ccw == facing_up {
            mesh.add_triangle(i0, i1, i2);
        } else {
            mesh.add_triangle(i0, i2, i1);
        }
    }
}

fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Create side walls for a profile boundary
#[inline]
fn create_side_walls(boundary: &[Point2<f64>], depth: f64, mesh: &mut Mesh) {
    for i in 0..boundary.len() {
        let j = (i + 1) % boundary.len();

        let p0 = &boundary[i];
        let p1 = &boundary[j];

        // Right-hand side of the edge: outward for CCW rings, into the void for CW holes
        let edge = Vector3::new(p1.x - p0.x, p1.y - p0.y, 0.0);
        let normal = match Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-10) {
            Some(n) => n,
            None => continue, // duplicate consecutive points
        };

        let idx = mesh.vertex_count() as u32;
        mesh.add_vertex(Point3::new(p0.x, p0.y, 0.0), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, 0.0), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, depth), normal);
        mesh.add_vertex(Point3::new(p0.x, p0.y, depth), normal);

        mesh.add_triangle(idx, idx + 1, idx + 2);
        mesh.add_triangle(idx, idx + 2, idx + 3);
    }
}

/// Apply transformation matrix to mesh
#[inline]
pub fn apply_transform(mesh: &mut Mesh, transform: &Matrix4<f64>) {
    mesh.positions.chunks_exact_mut(3).for_each(|chunk| {
        let point = Point3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
        let transformed = transform.transform_point(&point);
        chunk[0] = transformed.x as f32;
        chunk[1] = transformed.y as f32;
        chunk[2] = transformed.z as f32;
    });

    // Inverse transpose for normals
    let normal_matrix = transform.try_inverse().unwrap_or(*transform).transpose();

    mesh.normals.chunks_exact_mut(3).for_each(|chunk| {
        let normal = Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
        let transformed = (normal_matrix * normal.to_homogeneous())
            .xyz()
            .try_normalize(1e-12)
            .unwrap_or(normal);
        chunk[0] = transformed.x as f32;
        chunk[1] = transformed.y as f32;
        chunk[2] = transformed.z as f32;
    });
}
