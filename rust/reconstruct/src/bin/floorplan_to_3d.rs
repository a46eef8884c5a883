// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: Reconstruct a 3D floor plan (GLB output) from detected boxes
//!
//! Usage:
//!   floorplan-to-3d <detections.json> --door <door.obj> --window <window.obj> [options]

use anyhow::{bail, Context, Result};
use floorplan_reconstruct::{run, AssetPaths, DetectionFile, ReconstructConfig};
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return Ok(());
    }

    let detections_path = PathBuf::from(&args[1]);

    // Parse options
    let mut door_model: Option<PathBuf> = None;
    let mut window_model: Option<PathBuf> = None;
    let mut floor_textures: Vec<PathBuf> = Vec::new();
    let mut config_path: Option<PathBuf> = None;
    let mut scale: Option<f64> = None;
    let mut seed: Option<u64> = None;
    let mut output_path = PathBuf::from("floorplan.glb");
    let mut report_path: Option<PathBuf> = None;

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--door" => door_model = Some(PathBuf::from(next_value(&args, &mut i, flag)?)),
            "--window" => window_model = Some(PathBuf::from(next_value(&args, &mut i, flag)?)),
            "--texture" => floor_textures.push(PathBuf::from(next_value(&args, &mut i, flag)?)),
            "--config" => config_path = Some(PathBuf::from(next_value(&args, &mut i, flag)?)),
            "--scale" => {
                scale = Some(next_value(&args, &mut i, flag)?.parse().context("Invalid scale value")?);
            }
            "--seed" => {
                seed = Some(next_value(&args, &mut i, flag)?.parse().context("Invalid seed value")?);
            }
            "--output" => output_path = PathBuf::from(next_value(&args, &mut i, flag)?),
            "--report" => report_path = Some(PathBuf::from(next_value(&args, &mut i, flag)?)),
            other => {
                print_usage();
                bail!("Unknown option: {}", other);
            }
        }
        i += 1;
    }

    let (Some(door_model), Some(window_model)) = (door_model, window_model) else {
        print_usage();
        bail!("--door and --window are required");
    };

    println!("=== Floor Plan to 3D Reconstruction ===");
    println!();

    // Step 1: Configuration
    let mut config = match &config_path {
        Some(path) => ReconstructConfig::from_json_file(path)
            .with_context(|| format!("Cannot load config '{}'", path.display()))?,
        None => ReconstructConfig::default(),
    }
    .apply_env();
    if let Some(scale) = scale {
        config.meters_per_pixel = scale;
    }
    if seed.is_some() {
        config.floors.texture_seed = seed;
    }
    println!(
        "[1/4] Scale: {:.5} m/px, wall height: {:.0} px",
        config.meters_per_pixel, config.walls.wall_height
    );

    // Step 2: Detections
    println!("[2/4] Loading detections: {}", detections_path.display());
    let text = fs::read_to_string(&detections_path)
        .with_context(|| format!("Cannot read '{}'", detections_path.display()))?;
    let file: DetectionFile = serde_json::from_str(&text)
        .with_context(|| format!("Cannot parse '{}'", detections_path.display()))?;
    println!(
        "  walls={} doors={} windows={}",
        file.walls.len(),
        file.doors.len(),
        file.windows.len()
    );
    let detections = file.into_detections()?;

    // Step 3: Reconstruction
    println!("[3/4] Reconstructing...");
    let assets = AssetPaths {
        door_model,
        window_model,
        floor_textures,
    };
    let result = run(&detections, &config, &assets)?;

    let refined = &result.refined;
    println!(
        "  Refined: {} walls, {} doors, {} windows",
        refined.walls.len(),
        refined.doors.len(),
        refined.windows.len()
    );
    println!(
        "  Dropped {} boxes, merged {} groups, {} binding misses, {} failed cuts",
        result.report.dropped_count(),
        result.report.merged_count(),
        result.report.binding_misses(),
        result.report.boolean_failures()
    );

    if let Some(path) = &report_path {
        let json = serde_json::to_string_pretty(&result.report)?;
        fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        println!("  Report written to {}", path.display());
    }

    // Step 4: Export
    println!("[4/4] Writing {}", output_path.display());
    result.export(&output_path)?;
    println!("  {} objects", result.scene.len());

    println!();
    println!("Done.");
    Ok(())
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a String> {
    *i += 1;
    args.get(*i)
        .with_context(|| format!("Missing value for {}", flag))
}

fn print_usage() {
    println!("Usage: floorplan-to-3d <detections.json> --door <door.obj> --window <window.obj> [options]");
    println!();
    println!("Input JSON: {{\"walls\": [[x0,y0,x1,y1], ...], \"doors\": [...], \"windows\": [...]}}");
    println!("A fifth element per box is read as detector confidence.");
    println!();
    println!("Options:");
    println!("  --door <path>       Door model (OBJ), required");
    println!("  --window <path>     Window model (OBJ), required");
    println!("  --texture <path>    Floor texture (PNG/JPEG), repeatable");
    println!("  --config <path>     JSON configuration file");
    println!("  --scale <m/px>      Meters per pixel (default: 0.01)");
    println!("  --seed <n>          Seed for floor texture selection");
    println!("  --output <path>     Output file (default: floorplan.glb)");
    println!("  --report <path>     Write pipeline events as JSON");
    println!();
    println!("Environment:");
    println!("  FLOORPLAN_WALL_HEIGHT, FLOORPLAN_TEXTURE_SEED, FLOORPLAN_METERS_PER_PIXEL");
    println!("  RUST_LOG            Log filter (default: info)");
}
