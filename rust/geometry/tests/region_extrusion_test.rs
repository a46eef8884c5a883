// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar regions through extrusion and boolean cuts

use approx::assert_relative_eq;
use floorplan_geometry::{
    box_mesh, extrude_profile, ClippingProcessor, Matrix4, Point3, Region2D, Vector3,
};

/// Closed rectangular ring of four walls, 10 units thick
fn wall_ring() -> Region2D {
    Region2D::union_of_rects(&[
        (0.0, 0.0, 100.0, 10.0),
        (0.0, 90.0, 100.0, 100.0),
        (0.0, 0.0, 10.0, 100.0),
        (90.0, 0.0, 100.0, 100.0),
    ])
}

#[test]
fn ring_union_has_one_hole() {
    let ring = wall_ring();
    assert_eq!(ring.len(), 1);
    assert_eq!(ring.parts[0].holes.len(), 1);
    assert_relative_eq!(ring.area(), 100.0 * 100.0 - 80.0 * 80.0, epsilon = 1e-6);
    assert!(ring.is_valid());
}

#[test]
fn envelope_minus_walls_is_interior() {
    let ring = wall_ring();
    let interior = ring.envelope().unwrap().difference(&ring);

    assert_eq!(interior.len(), 1);
    assert_relative_eq!(interior.area(), 80.0 * 80.0, epsilon = 1e-6);

    let (min, max) = interior.bounds().unwrap();
    assert_relative_eq!(min.x, 10.0, epsilon = 1e-9);
    assert_relative_eq!(max.y, 90.0, epsilon = 1e-9);
}

#[test]
fn extruded_ring_volume() {
    let ring = wall_ring();
    let mesh = extrude_profile(&ring.parts[0], 30.0, Some(Matrix4::new_scaling(0.1))).unwrap();

    // 3600 area * 30 height, scaled by 0.1 in every axis
    assert_relative_eq!(mesh.signed_volume(), 3600.0 * 30.0 * 1e-3, max_relative = 1e-4);
}

#[test]
fn opening_cut_removes_volume() {
    let ring = wall_ring();
    let wall = extrude_profile(&ring.parts[0], 30.0, None).unwrap();
    let before = wall.signed_volume();

    // Through the bottom wall: 20 wide, 20 tall, deeper than the wall
    let cutter = box_mesh(Point3::new(50.0, 5.0, 15.0), Vector3::new(20.0, 30.0, 20.0));
    let clipper = ClippingProcessor::new();
    let cut = clipper.subtract_mesh(&wall, &cutter).unwrap();

    assert_relative_eq!(
        before - cut.signed_volume(),
        20.0 * 10.0 * 20.0,
        max_relative = 1e-3
    );
}
