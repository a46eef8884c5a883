// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room partitioning and floor slabs
//!
//! Free space is the bounding rectangle of the wall footprint minus the
//! footprint itself. Every connected component becomes one room floor with
//! planar UVs and a randomly chosen texture. A thin sub-floor slab under
//! the whole plan is always emitted.

use crate::config::FloorConfig;
use crate::error::Result;
use crate::report::{PipelineEvent, PipelineReport};
use floorplan_geometry::{
    apply_transform, create_rect, extrude_profile, Matrix4, Mesh, Profile2D, Region2D, Vector3,
};
use rand::Rng;

/// One room floor
#[derive(Debug, Clone)]
pub struct Room {
    /// Position among the free-space components
    pub index: usize,
    /// Footprint in pixel units (y flipped)
    pub footprint: Profile2D,
    pub mesh: Mesh,
    /// Index into the loaded floor textures
    pub texture: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FloorSet {
    pub subfloor: Mesh,
    pub rooms: Vec<Room>,
}

/// Split the free space inside the wall envelope into connected rooms.
///
/// Every returned profile is disjoint from the walls and from every other
/// profile; their areas plus the wall area add up to the envelope area.
pub fn partition_rooms(walls: &Region2D) -> Vec<Profile2D> {
    match walls.envelope() {
        Some(envelope) => envelope.difference(walls).parts,
        None => Vec::new(),
    }
}

/// Build the sub-floor and one textured floor slab per room.
///
/// `wall_mesh` is the already scaled wall solid; the sub-floor covers its
/// XY bounds. `texture_count` is the number of loaded textures to pick from.
pub fn build_floors(
    walls: &Region2D,
    wall_mesh: &Mesh,
    config: &FloorConfig,
    scale: f64,
    texture_count: usize,
    rng: &mut impl Rng,
    report: &mut PipelineReport,
) -> Result<FloorSet> {
    let subfloor = build_subfloor(wall_mesh, config)?;

    let scaling = Matrix4::new_scaling(scale);
    let mut rooms = Vec::new();

    for (index, profile) in partition_rooms(walls).into_iter().enumerate() {
        let Some(footprint) = valid_footprint(profile, index, report) else {
            continue;
        };
        let Some((min, max)) = footprint.bounds() else {
            continue;
        };

        let mut mesh = match extrude_profile(&footprint, config.floor_thickness, None) {
            Ok(mesh) => mesh,
            Err(e) => {
                report.record(PipelineEvent::SkippedPolygon {
                    stage: "rooms",
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        mesh.set_planar_uvs(min, max);
        apply_transform(&mut mesh, &scaling);

        let texture = (texture_count > 0).then(|| rng.gen_range(0..texture_count));

        rooms.push(Room {
            index,
            footprint,
            mesh,
            texture,
        });
    }

    tracing::info!(rooms = rooms.len(), textures = texture_count, "built floors");

    Ok(FloorSet { subfloor, rooms })
}

/// Repair a room polygon if needed; `None` when nothing usable remains
fn valid_footprint(
    profile: Profile2D,
    index: usize,
    report: &mut PipelineReport,
) -> Option<Profile2D> {
    let region = Region2D::from_profile(profile);
    if region.is_valid() {
        return region.parts.into_iter().next();
    }

    let repaired = region.repair();
    let largest = repaired
        .parts
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()));

    match largest {
        Some(part) => {
            report.record(PipelineEvent::RepairedPolygon {
                stage: "rooms",
                index,
            });
            Some(part)
        }
        None => {
            report.record(PipelineEvent::SkippedPolygon {
                stage: "rooms",
                index,
                reason: "empty after repair".to_string(),
            });
            None
        }
    }
}

fn build_subfloor(wall_mesh: &Mesh, config: &FloorConfig) -> Result<Mesh> {
    let (min, max) = wall_mesh.bounds();
    let margin = config.subfloor_margin;
    let profile = create_rect(
        min.x as f64 - margin,
        min.y as f64 - margin,
        max.x as f64 + margin,
        max.y as f64 + margin,
    );

    let top = -config.subfloor_drop;
    let transform = Matrix4::new_translation(&Vector3::new(
        0.0,
        0.0,
        top - config.subfloor_thickness,
    ));
    Ok(extrude_profile(
        &profile,
        config.subfloor_thickness,
        Some(transform),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WallConfig;
    use crate::types::BoundingBox;
    use crate::walls::synthesize_walls;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1).unwrap()
    }

    /// Closed square of walls split in two by a middle wall
    fn two_room_walls() -> Vec<BoundingBox> {
        vec![
            bb(0.0, 0.0, 400.0, 20.0),
            bb(0.0, 280.0, 400.0, 300.0),
            bb(0.0, 0.0, 20.0, 300.0),
            bb(380.0, 0.0, 400.0, 300.0),
            bb(190.0, 0.0, 210.0, 300.0),
        ]
    }

    #[test]
    fn test_rooms_fill_envelope() {
        let walls = crate::walls::wall_footprint(&two_room_walls(), 2.0);
        let rooms = partition_rooms(&walls);

        let envelope = walls.envelope().unwrap();
        let room_area: f64 = rooms.iter().map(Profile2D::area).sum();
        assert_relative_eq!(
            room_area + walls.area(),
            envelope.area(),
            max_relative = 1e-9
        );

        // Two enclosed rooms; the padding leaves no slivers on the outer edge
        assert_eq!(rooms.len(), 2);
    }

    #[test]
    fn test_rooms_are_disjoint() {
        let walls = crate::walls::wall_footprint(&two_room_walls(), 2.0);
        let rooms = partition_rooms(&walls);

        for (i, a) in rooms.iter().enumerate() {
            let a = Region2D::from_profile(a.clone());
            assert!(a.intersection(&walls).area() < 1e-6);
            for b in rooms.iter().skip(i + 1) {
                let b = Region2D::from_profile(b.clone());
                assert!(a.intersection(&b).area() < 1e-6);
            }
        }
    }

    #[test]
    fn test_floors_are_scaled_and_textured() {
        let mut report = PipelineReport::new();
        let model = synthesize_walls(&two_room_walls(), &WallConfig::default(), 0.01, &mut report)
            .unwrap();
        let config = FloorConfig::default();
        let mut rng = StdRng::seed_from_u64(3);

        let floors = build_floors(
            &model.footprint,
            &model.mesh,
            &config,
            0.01,
            3,
            &mut rng,
            &mut report,
        )
        .unwrap();

        assert_eq!(floors.rooms.len(), 2);
        for room in &floors.rooms {
            assert!(room.texture.is_some_and(|t| t < 3));
            assert!(room.mesh.has_uvs());
            assert!(room.mesh.uvs.iter().all(|&c| (0.0..=1.0).contains(&c)));
            assert_relative_eq!(room.mesh.extents().z, 0.05, epsilon = 1e-5);
        }

        let (min, max) = floors.subfloor.bounds();
        assert_relative_eq!(min.z, -0.05, epsilon = 1e-5);
        assert_relative_eq!(max.z, -0.02, epsilon = 1e-5);
        let (wall_min, wall_max) = model.mesh.bounds();
        // Slightly larger than the walls on every side
        assert_relative_eq!(min.x, wall_min.x - 0.05, epsilon = 1e-5);
        assert_relative_eq!(max.y, wall_max.y + 0.05, epsilon = 1e-5);
    }

    #[test]
    fn test_texture_choice_is_seeded() {
        let mut report = PipelineReport::new();
        let model = synthesize_walls(&two_room_walls(), &WallConfig::default(), 0.01, &mut report)
            .unwrap();

        let pick = |seed: u64| -> Vec<Option<usize>> {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut report = PipelineReport::new();
            build_floors(
                &model.footprint,
                &model.mesh,
                &FloorConfig::default(),
                0.01,
                4,
                &mut rng,
                &mut report,
            )
            .unwrap()
            .rooms
            .iter()
            .map(|r| r.texture)
            .collect()
        };

        assert_eq!(pick(11), pick(11));
    }

    #[test]
    fn test_no_textures() {
        let mut report = PipelineReport::new();
        let model = synthesize_walls(&two_room_walls(), &WallConfig::default(), 0.01, &mut report)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let floors = build_floors(
            &model.footprint,
            &model.mesh,
            &FloorConfig::default(),
            0.01,
            0,
            &mut rng,
            &mut report,
        )
        .unwrap();
        assert!(floors.rooms.iter().all(|r| r.texture.is_none()));
    }

    #[test]
    fn test_open_walls_leave_outer_free_space() {
        // An L-shape has no enclosed room but the envelope remainder is one region
        let walls = crate::walls::wall_footprint(
            &[bb(0.0, 0.0, 200.0, 20.0), bb(0.0, 0.0, 20.0, 200.0)],
            2.0,
        );
        let rooms = partition_rooms(&walls);
        assert_eq!(rooms.len(), 1);
        assert_relative_eq!(rooms[0].area(), 180.0 * 180.0, max_relative = 1e-9);
    }
}
