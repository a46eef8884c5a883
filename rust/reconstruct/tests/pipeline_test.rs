// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end reconstruction of a small two-room plan

use approx::assert_relative_eq;
use floorplan_reconstruct::{
    reconstruct, AssetPaths, BoxClass, DetectionFile, Orientation, ReconstructConfig,
    ReconstructError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

const PLAN: &str = r#"{
    "walls": [
        [0, 0, 400, 20],
        [0, 280, 400, 300],
        [0, 0, 20, 300],
        [380, 0, 400, 300],
        [190, 0, 210, 300, 0.9]
    ],
    "doors": [[190, 100, 210, 160]],
    "windows": [[80, 0, 110, 20], [112, 0, 140, 20], [600, 600, 650, 620]]
}"#;

fn box_obj(x: f64, y: f64, z: f64) -> String {
    let (hx, hy) = (x / 2.0, y / 2.0);
    format!(
        "v {0} {1} 0\nv {2} {1} 0\nv {2} {3} 0\nv {0} {3} 0\n\
         v {0} {1} {4}\nv {2} {1} {4}\nv {2} {3} {4}\nv {0} {3} {4}\n\
         f 1 3 2\nf 1 4 3\nf 5 6 7\nf 5 7 8\nf 1 2 6 5\nf 2 3 7 6\nf 3 4 8 7\nf 4 1 5 8\n",
        -hx, -hy, hx, hy, z
    )
}

fn write_assets(dir: &Path, window_name: &str) -> AssetPaths {
    std::fs::create_dir_all(dir).unwrap();

    let door = dir.join("door.obj");
    let window = dir.join(window_name);
    std::fs::write(&door, box_obj(100.0, 10.0, 200.0)).unwrap();
    std::fs::write(&window, box_obj(100.0, 10.0, 100.0)).unwrap();

    let texture = dir.join("floor.png");
    image::RgbImage::from_pixel(4, 4, image::Rgb([180, 140, 90]))
        .save(&texture)
        .unwrap();

    AssetPaths {
        door_model: door,
        window_model: window,
        floor_textures: vec![texture],
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("floorplan-{}-{}", name, std::process::id()))
}

fn detections() -> Vec<floorplan_reconstruct::Detection> {
    let file: DetectionFile = serde_json::from_str(PLAN).unwrap();
    file.into_detections().unwrap()
}

#[test]
fn test_two_room_plan() {
    let dir = scratch_dir("two-room");
    let assets = write_assets(&dir, "window.obj");
    let config = ReconstructConfig::default();
    let mut rng = StdRng::seed_from_u64(42);

    let result = reconstruct(&detections(), &config, &assets, &mut rng).unwrap();

    // The two window fragments merge, the far window has no wall
    assert_eq!(result.refined.walls.len(), 5);
    assert_eq!(result.refined.doors.len(), 1);
    assert_eq!(result.refined.windows.len(), 1);
    assert_eq!(result.report.merged_count(), 1);

    let door = result.placements_of(BoxClass::Door).next().unwrap();
    assert_eq!(door.wall_index, Some(4));
    assert_eq!(door.orientation, Orientation::Vertical);
    assert_relative_eq!(door.cut_depth(), 0.35, epsilon = 1e-12);

    let window = result.placements_of(BoxClass::Window).next().unwrap();
    assert_eq!(window.wall_index, Some(0));
    assert_eq!(window.orientation, Orientation::Horizontal);
    assert_relative_eq!(window.instance_translation.z, 1.18, epsilon = 1e-12);

    let names: Vec<&str> = result.scene.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(
        names,
        ["Wall", "SubFloor", "Floor_0", "Floor_1", "Door_0", "Window_0"]
    );
    assert!(result.scene.nodes[2].texture == Some(0));
    assert_eq!(result.report.boolean_failures(), 0);

    // Y-up: wall height along +Y, plan depth along +Z
    let (min, max) = result.scene.nodes[0].mesh.bounds();
    assert_relative_eq!(min.y, 0.0, epsilon = 1e-5);
    assert_relative_eq!(max.y, 2.4, epsilon = 1e-5);
    assert_relative_eq!(min.z, 0.0, epsilon = 1e-5);
    assert_relative_eq!(max.z, 3.02, epsilon = 1e-5);

    let output = dir.join("out/nested/plan.glb");
    result.export(&output).unwrap();
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[0..4], b"glTF");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_small_window_variant() {
    let dir = scratch_dir("small-window");
    let assets = write_assets(&dir, "Window_Small.obj");
    let mut rng = StdRng::seed_from_u64(1);

    let result =
        reconstruct(&detections(), &ReconstructConfig::default(), &assets, &mut rng).unwrap();
    let window = result.placements_of(BoxClass::Window).next().unwrap();
    assert_relative_eq!(window.instance_translation.z, 1.3, epsilon = 1e-12);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_seeded_runs_match() {
    let dir = scratch_dir("seeded");
    let mut assets = write_assets(&dir, "window.obj");
    let second = dir.join("tiles.png");
    image::RgbImage::from_pixel(2, 2, image::Rgb([60, 60, 60]))
        .save(&second)
        .unwrap();
    assets.floor_textures.push(second);

    let textures = |seed: u64| -> Vec<Option<usize>> {
        let mut rng = StdRng::seed_from_u64(seed);
        reconstruct(&detections(), &ReconstructConfig::default(), &assets, &mut rng)
            .unwrap()
            .scene
            .nodes
            .iter()
            .map(|n| n.texture)
            .collect()
    };
    assert_eq!(textures(9), textures(9));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_no_walls() {
    let dir = scratch_dir("no-walls");
    let assets = write_assets(&dir, "window.obj");
    let file: DetectionFile =
        serde_json::from_str(r#"{"doors": [[0, 0, 40, 10]], "windows": [[100, 0, 140, 10]]}"#)
            .unwrap();
    let mut rng = StdRng::seed_from_u64(0);

    let result = reconstruct(
        &file.into_detections().unwrap(),
        &ReconstructConfig::default(),
        &assets,
        &mut rng,
    );
    assert!(matches!(result, Err(ReconstructError::NoWalls)));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_asset() {
    let assets = AssetPaths {
        door_model: PathBuf::from("/nonexistent/door.obj"),
        window_model: PathBuf::from("/nonexistent/window.obj"),
        floor_textures: Vec::new(),
    };
    let mut rng = StdRng::seed_from_u64(0);
    let result = reconstruct(&detections(), &ReconstructConfig::default(), &assets, &mut rng);
    assert!(matches!(result, Err(ReconstructError::Asset { .. })));
}
