// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opening placement
//!
//! Each door or window is bound to the wall it overlaps most, which gives
//! the depth of its cut volume. All cut volumes of one class are unioned and
//! subtracted from the wall solid in a single boolean difference; the door
//! and window assets are instanced at the same positions.

use crate::config::ReconstructConfig;
use crate::report::{PipelineEvent, PipelineReport};
use crate::types::{BoundingBox, BoxClass, OpeningPlacement, Orientation};
use floorplan_geometry::{apply_transform, box_mesh, ClippingProcessor, Matrix4, Mesh, Point3, Vector3};
use rayon::prelude::*;

/// Index of the wall with the largest intersection area.
///
/// Ties keep the first wall; `None` when no wall has positive overlap.
pub fn bind_wall(opening: &BoundingBox, walls: &[BoundingBox]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, wall) in walls.iter().enumerate() {
        let area = opening.intersection_area(wall);
        if area <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((index, area));
        }
    }
    best.map(|(index, _)| index)
}

/// Compute the placement of every opening of one class.
///
/// `asset_extents` is the bounding box size of the class's model and
/// `small_variant` selects the raised window offset. Order follows `boxes`.
pub fn place_openings(
    class: BoxClass,
    boxes: &[BoundingBox],
    walls: &[BoundingBox],
    asset_extents: Vector3<f64>,
    small_variant: bool,
    config: &ReconstructConfig,
) -> Vec<OpeningPlacement> {
    boxes
        .par_iter()
        .enumerate()
        .map(|(index, bbox)| {
            place_opening(class, index, bbox, walls, asset_extents, small_variant, config)
        })
        .collect()
}

/// Record a binding miss for every placement that fell back to the default depth
pub fn report_binding_misses(placements: &[OpeningPlacement], report: &mut PipelineReport) {
    for placement in placements.iter().filter(|p| p.wall_index.is_none()) {
        report.record(PipelineEvent::BindingMiss {
            class: placement.class,
            index: placement.index,
            bbox: placement.bbox,
        });
    }
}

fn place_opening(
    class: BoxClass,
    index: usize,
    bbox: &BoundingBox,
    walls: &[BoundingBox],
    asset_extents: Vector3<f64>,
    small_variant: bool,
    config: &ReconstructConfig,
) -> OpeningPlacement {
    let scale = config.meters_per_pixel;
    let opening_scale = config.opening_scale();
    let openings = &config.openings;

    let orientation = bbox.orientation();
    let wall_index = bind_wall(bbox, walls);

    let depth = match wall_index {
        Some(i) => {
            let thickness = match orientation {
                Orientation::Vertical => walls[i].width(),
                Orientation::Horizontal => walls[i].height(),
            };
            thickness * scale + openings.cut_margin * scale
        }
        None => openings.fallback_depth * scale,
    };

    let width = asset_extents.x * opening_scale;
    let height = asset_extents.z * opening_scale;

    let center_2d = bbox.center();
    let x = center_2d.x * scale;
    let y = -center_2d.y * scale;
    let mid_wall = config.walls.wall_height / 2.0 * scale;

    let (cut_z, instance_z) = match class {
        BoxClass::Window => {
            let offset = if small_variant {
                openings.small_window_offset
            } else {
                openings.window_offset
            };
            (mid_wall, mid_wall + offset)
        }
        _ => (height / 2.0, openings.door_floor_offset),
    };

    OpeningPlacement {
        class,
        index,
        bbox: *bbox,
        wall_index,
        orientation,
        center: Point3::new(x, y, cut_z),
        cut_extents: Vector3::new(width, depth, height),
        instance_translation: Vector3::new(x, y, instance_z),
        instance_scale: opening_scale,
    }
}

fn rotation_about_z(angle: f64) -> Matrix4<f64> {
    Matrix4::from_axis_angle(&Vector3::z_axis(), angle)
}

/// Box solid carved out of the walls for one opening
pub fn cut_volume(placement: &OpeningPlacement) -> Mesh {
    let mut mesh = box_mesh(Point3::origin(), placement.cut_extents);
    let transform = Matrix4::new_translation(&placement.center.coords)
        * rotation_about_z(placement.rotation());
    apply_transform(&mut mesh, &transform);
    mesh
}

/// The class's asset scaled, rotated and moved into place
pub fn instance_mesh(placement: &OpeningPlacement, asset: &Mesh) -> Mesh {
    let mut mesh = asset.clone();
    let transform = Matrix4::new_translation(&placement.instance_translation)
        * rotation_about_z(placement.rotation())
        * Matrix4::new_scaling(placement.instance_scale);
    apply_transform(&mut mesh, &transform);
    mesh
}

/// Subtract every cut volume of one class from the wall solid.
///
/// On a failed boolean the input wall is returned unchanged and the failure
/// is recorded with the opening boxes and the walls they were bound to.
pub fn cut_openings(
    wall_mesh: &Mesh,
    class: BoxClass,
    placements: &[OpeningPlacement],
    clipper: &ClippingProcessor,
    report: &mut PipelineReport,
) -> Mesh {
    if placements.is_empty() {
        return wall_mesh.clone();
    }

    let cutters: Vec<Mesh> = placements.par_iter().map(cut_volume).collect();

    let result = clipper
        .union_all(&cutters)
        .and_then(|cutter| clipper.subtract_mesh(wall_mesh, &cutter));

    match result {
        Ok(mesh) => {
            tracing::info!(class = %class, openings = placements.len(), "cut openings");
            mesh
        }
        Err(e) => {
            let mut wall_indices: Vec<usize> =
                placements.iter().filter_map(|p| p.wall_index).collect();
            wall_indices.sort_unstable();
            wall_indices.dedup();

            report.record(PipelineEvent::BooleanFailure {
                class,
                boxes: placements.iter().map(|p| p.bbox).collect(),
                wall_indices,
                reason: e.to_string(),
            });
            wall_mesh.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1).unwrap()
    }

    fn asset() -> Vector3<f64> {
        Vector3::new(100.0, 10.0, 200.0)
    }

    #[test]
    fn test_binding_prefers_largest_overlap() {
        let door = bb(40.0, 0.0, 60.0, 20.0);
        let walls = [bb(0.0, 0.0, 45.0, 20.0), bb(45.0, 0.0, 200.0, 20.0)];
        assert_eq!(bind_wall(&door, &walls), Some(1));
    }

    #[test]
    fn test_binding_tie_keeps_first() {
        let door = bb(40.0, 0.0, 60.0, 20.0);
        let walls = [bb(0.0, 0.0, 50.0, 20.0), bb(50.0, 0.0, 200.0, 20.0)];
        assert_eq!(bind_wall(&door, &walls), Some(0));
    }

    #[test]
    fn test_binding_miss() {
        let door = bb(40.0, 0.0, 60.0, 20.0);
        // Touching only, zero area
        let walls = [bb(60.0, 0.0, 200.0, 20.0)];
        assert_eq!(bind_wall(&door, &walls), None);
    }

    #[test]
    fn test_door_in_horizontal_wall() {
        let config = ReconstructConfig::default();
        let scale = config.meters_per_pixel;
        let walls = [bb(0.0, 0.0, 200.0, 20.0)];
        let doors = [bb(80.0, 0.0, 120.0, 20.0)];

        let placements = place_openings(BoxClass::Door, &doors, &walls, asset(), false, &config);
        let door = &placements[0];

        assert_eq!(door.wall_index, Some(0));
        assert_eq!(door.orientation, Orientation::Horizontal);
        assert_relative_eq!(door.cut_depth(), 20.0 * scale + 15.0 * scale, epsilon = 1e-12);
        assert_relative_eq!(door.rotation(), 0.0);

        let s = config.opening_scale();
        assert_relative_eq!(door.cut_extents.x, 100.0 * s, epsilon = 1e-12);
        assert_relative_eq!(door.cut_extents.z, 200.0 * s, epsilon = 1e-12);
        assert_relative_eq!(door.center.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(door.center.y, -0.1, epsilon = 1e-12);
        assert_relative_eq!(door.center.z, 100.0 * s, epsilon = 1e-12);
        assert_relative_eq!(door.instance_translation.z, 0.01);
    }

    #[test]
    fn test_vertical_opening_uses_wall_width() {
        let config = ReconstructConfig::default();
        let scale = config.meters_per_pixel;
        let walls = [bb(0.0, 0.0, 30.0, 300.0)];
        let doors = [bb(0.0, 100.0, 30.0, 160.0)];

        let placements = place_openings(BoxClass::Door, &doors, &walls, asset(), false, &config);
        let door = &placements[0];

        assert_eq!(door.orientation, Orientation::Vertical);
        assert_relative_eq!(door.cut_depth(), 30.0 * scale + 15.0 * scale, epsilon = 1e-12);
        assert_relative_eq!(door.rotation(), std::f64::consts::FRAC_PI_2);

        // Rotated cut spans the depth along X and the asset width along Y
        let (min, max) = cut_volume(door).bounds();
        assert_relative_eq!((max.x - min.x) as f64, door.cut_depth(), epsilon = 1e-5);
        assert_relative_eq!((max.y - min.y) as f64, door.cut_extents.x, epsilon = 1e-5);
    }

    #[test]
    fn test_fallback_depth() {
        let config = ReconstructConfig::default();
        let placements = place_openings(
            BoxClass::Window,
            &[bb(500.0, 500.0, 540.0, 510.0)],
            &[bb(0.0, 0.0, 200.0, 20.0)],
            asset(),
            false,
            &config,
        );
        assert_eq!(placements[0].wall_index, None);
        assert_relative_eq!(placements[0].cut_depth(), 0.4, epsilon = 1e-12);

        let mut report = PipelineReport::new();
        report_binding_misses(&placements, &mut report);
        assert_eq!(report.binding_misses(), 1);
    }

    #[test]
    fn test_window_heights() {
        let config = ReconstructConfig::default();
        let walls = [bb(0.0, 0.0, 200.0, 20.0)];
        let windows = [bb(80.0, 0.0, 120.0, 20.0)];

        let normal = place_openings(BoxClass::Window, &windows, &walls, asset(), false, &config);
        let small = place_openings(BoxClass::Window, &windows, &walls, asset(), true, &config);

        assert_relative_eq!(normal[0].center.z, 1.2, epsilon = 1e-12);
        assert_relative_eq!(normal[0].instance_translation.z, 1.18, epsilon = 1e-12);
        assert_relative_eq!(small[0].instance_translation.z, 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_placement_order_preserved() {
        let config = ReconstructConfig::default();
        let walls = [bb(0.0, 0.0, 2000.0, 20.0)];
        let doors: Vec<BoundingBox> = (0..32)
            .map(|i| bb(i as f64 * 60.0, 0.0, i as f64 * 60.0 + 40.0, 20.0))
            .collect();

        let placements = place_openings(BoxClass::Door, &doors, &walls, asset(), false, &config);
        for (i, placement) in placements.iter().enumerate() {
            assert_eq!(placement.index, i);
            assert_eq!(placement.bbox, doors[i]);
        }
    }

    #[test]
    fn test_instance_transform() {
        let config = ReconstructConfig::default();
        let walls = [bb(0.0, 0.0, 200.0, 20.0)];
        let doors = [bb(80.0, 0.0, 120.0, 20.0)];
        let placements = place_openings(BoxClass::Door, &doors, &walls, asset(), false, &config);
        let placement = &placements[0];

        let unit = box_mesh(Point3::new(0.0, 0.0, 0.5), Vector3::new(1.0, 1.0, 1.0));
        let placed = instance_mesh(placement, &unit);
        let (min, max) = placed.bounds();

        let s = config.opening_scale();
        assert_relative_eq!(min.z as f64, 0.01, epsilon = 1e-6);
        assert_relative_eq!(max.z as f64, 0.01 + s, epsilon = 1e-6);
        assert_relative_eq!(((min.x + max.x) / 2.0) as f64, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cut_through_wall() {
        let wall = box_mesh(Point3::new(1.0, -0.1, 1.15), Vector3::new(2.0, 0.2, 2.5));
        let config = ReconstructConfig::default();
        let placements = place_openings(
            BoxClass::Door,
            &[bb(80.0, 0.0, 120.0, 20.0)],
            &[bb(0.0, 0.0, 200.0, 20.0)],
            asset(),
            false,
            &config,
        );

        let mut report = PipelineReport::new();
        let clipper = ClippingProcessor::new();
        let cut = cut_openings(&wall, BoxClass::Door, &placements, &clipper, &mut report);

        assert_eq!(report.boolean_failures(), 0);
        assert!(cut.signed_volume() < wall.signed_volume());
    }

    #[test]
    fn test_no_openings_keeps_wall() {
        let wall = box_mesh(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let mut report = PipelineReport::new();
        let cut = cut_openings(
            &wall,
            BoxClass::Window,
            &[],
            &ClippingProcessor::new(),
            &mut report,
        );
        assert_eq!(cut.triangle_count(), wall.triangle_count());
    }

    #[test]
    fn test_failed_cut_keeps_wall() {
        // A cut that swallows the wall leaves nothing
        let wall = box_mesh(Point3::new(1.0, -0.1, 0.1), Vector3::new(0.2, 0.1, 0.1));
        let config = ReconstructConfig::default();
        let placements = place_openings(
            BoxClass::Door,
            &[bb(80.0, 0.0, 120.0, 20.0)],
            &[bb(0.0, 0.0, 200.0, 20.0)],
            asset(),
            false,
            &config,
        );

        let mut report = PipelineReport::new();
        let cut = cut_openings(
            &wall,
            BoxClass::Door,
            &placements,
            &ClippingProcessor::new(),
            &mut report,
        );

        assert_eq!(report.boolean_failures(), 1);
        assert_eq!(cut.triangle_count(), wall.triangle_count());
        match &report.events[0] {
            PipelineEvent::BooleanFailure {
                boxes,
                wall_indices,
                ..
            } => {
                assert_eq!(boxes, &vec![bb(80.0, 0.0, 120.0, 20.0)]);
                assert_eq!(wall_indices, &vec![0]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
