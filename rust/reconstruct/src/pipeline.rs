// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end reconstruction: detections in, scene out.

use crate::assets::{AssetLibrary, AssetPaths};
use crate::config::ReconstructConfig;
use crate::error::{ReconstructError, Result};
use crate::openings::{cut_openings, instance_mesh, place_openings, report_binding_misses};
use crate::refine::{collect_detections, refine};
use crate::report::PipelineReport;
use crate::rooms::build_floors;
use crate::scene::Scene;
use crate::types::{BoxClass, BoxCollection, Detection, OpeningPlacement};
use crate::walls::synthesize_walls;
use floorplan_geometry::ClippingProcessor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Everything a run produced, before export
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Y-up scene ready for export
    pub scene: Scene,
    /// Doors first, then windows
    pub placements: Vec<OpeningPlacement>,
    /// Boxes that survived refinement
    pub refined: BoxCollection,
    pub report: PipelineReport,
}

impl Reconstruction {
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        self.scene.export(path)
    }

    pub fn placements_of(&self, class: BoxClass) -> impl Iterator<Item = &OpeningPlacement> {
        self.placements.iter().filter(move |p| p.class == class)
    }
}

/// Run the pipeline with texture choices drawn from `rng`
pub fn reconstruct(
    detections: &[Detection],
    config: &ReconstructConfig,
    assets: &AssetPaths,
    rng: &mut impl Rng,
) -> Result<Reconstruction> {
    if !(config.meters_per_pixel > 0.0) || !config.meters_per_pixel.is_finite() {
        return Err(ReconstructError::InvalidInput(format!(
            "meters_per_pixel must be positive, got {}",
            config.meters_per_pixel
        )));
    }

    let library = AssetLibrary::load(assets)?;
    let mut report = PipelineReport::new();
    let scale = config.meters_per_pixel;

    let collected = collect_detections(detections, config.min_confidence, &mut report);
    let refined = refine(&collected, &config.refine, &mut report);
    if refined.walls.is_empty() {
        return Err(ReconstructError::NoWalls);
    }

    let walls = synthesize_walls(&refined.walls, &config.walls, scale, &mut report)?;
    let floors = build_floors(
        &walls.footprint,
        &walls.mesh,
        &config.floors,
        scale,
        library.textures.len(),
        rng,
        &mut report,
    )?;

    let doors = place_openings(
        BoxClass::Door,
        &refined.doors,
        &refined.walls,
        library.door.extents(),
        false,
        config,
    );
    let windows = place_openings(
        BoxClass::Window,
        &refined.windows,
        &refined.walls,
        library.window.extents(),
        library.window.is_small_variant(),
        config,
    );
    report_binding_misses(&doors, &mut report);
    report_binding_misses(&windows, &mut report);

    let clipper = ClippingProcessor::new();
    let wall_mesh = cut_openings(&walls.mesh, BoxClass::Door, &doors, &clipper, &mut report);
    let wall_mesh = cut_openings(&wall_mesh, BoxClass::Window, &windows, &clipper, &mut report);

    let mut scene = Scene::new(library.textures.clone());
    scene.push("Wall", wall_mesh, None);
    scene.push("SubFloor", floors.subfloor, None);
    for room in floors.rooms {
        scene.push(format!("Floor_{}", room.index), room.mesh, room.texture);
    }
    for placement in &doors {
        scene.push(
            format!("Door_{}", placement.index),
            instance_mesh(placement, &library.door.mesh),
            None,
        );
    }
    for placement in &windows {
        scene.push(
            format!("Window_{}", placement.index),
            instance_mesh(placement, &library.window.mesh),
            None,
        );
    }
    scene.to_y_up();

    tracing::info!(
        objects = scene.len(),
        doors = doors.len(),
        windows = windows.len(),
        dropped = report.dropped_count(),
        merged = report.merged_count(),
        binding_misses = report.binding_misses(),
        boolean_failures = report.boolean_failures(),
        "reconstruction complete"
    );

    let mut placements = doors;
    placements.extend(windows);

    Ok(Reconstruction {
        scene,
        placements,
        refined,
        report,
    })
}

/// Run the pipeline with the RNG configured by `texture_seed`
pub fn run(
    detections: &[Detection],
    config: &ReconstructConfig,
    assets: &AssetPaths,
) -> Result<Reconstruction> {
    let mut rng = match config.floors.texture_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    reconstruct(detections, config, assets, &mut rng)
}
