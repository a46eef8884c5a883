// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall synthesis: padded wall boxes are unioned into one planar region
//! (y flipped so the plan reads upright in a Z-up frame) and extruded.

use crate::config::WallConfig;
use crate::error::{ReconstructError, Result};
use crate::report::{PipelineEvent, PipelineReport};
use crate::types::BoundingBox;
use floorplan_geometry::{extrude_profile, Matrix4, Mesh, Region2D};

/// Wall footprint in pixel units and its extruded, scaled mesh
#[derive(Debug, Clone)]
pub struct WallModel {
    pub footprint: Region2D,
    pub mesh: Mesh,
}

/// Union of the padded wall rectangles in the y-flipped plan frame
pub fn wall_footprint(walls: &[BoundingBox], padding: f64) -> Region2D {
    let rects: Vec<(f64, f64, f64, f64)> = walls
        .iter()
        .map(|wall| {
            let padded = wall.padded(padding);
            (padded.x_min, -padded.y_max, padded.x_max, -padded.y_min)
        })
        .collect();

    Region2D::union_of_rects(&rects)
}

/// Build the wall solid for the refined wall boxes.
///
/// Parts are extruded to `wall_height` pixels and the result is scaled by
/// `scale` (meters per pixel). A part whose extrusion fails is skipped and
/// reported.
pub fn synthesize_walls(
    walls: &[BoundingBox],
    config: &WallConfig,
    scale: f64,
    report: &mut PipelineReport,
) -> Result<WallModel> {
    if walls.is_empty() {
        return Err(ReconstructError::NoWalls);
    }

    let mut footprint = wall_footprint(walls, config.wall_padding);
    if !footprint.is_valid() {
        footprint = footprint.repair();
        report.record(PipelineEvent::RepairedPolygon {
            stage: "walls",
            index: 0,
        });
    }

    let transform = Matrix4::new_scaling(scale);
    let mut solids = Vec::with_capacity(footprint.len());
    for (index, part) in footprint.parts.iter().enumerate() {
        match extrude_profile(part, config.wall_height, Some(transform)) {
            Ok(solid) => solids.push(solid),
            Err(e) => report.record(PipelineEvent::SkippedPolygon {
                stage: "walls",
                index,
                reason: e.to_string(),
            }),
        }
    }
    let mesh = Mesh::concatenate(&solids);

    if mesh.is_empty() {
        return Err(ReconstructError::NoWalls);
    }

    tracing::info!(
        walls = walls.len(),
        parts = footprint.len(),
        area_px = footprint.area(),
        triangles = mesh.triangle_count(),
        "synthesized walls"
    );

    Ok(WallModel { footprint, mesh })
}
