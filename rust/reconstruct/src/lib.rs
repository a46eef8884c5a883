// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 3D floor plan reconstruction from detector bounding boxes
//!
//! Turns axis-aligned wall, door and window boxes (image pixel space) into a
//! textured, metrically scaled 3D model:
//! 1. Refine the raw boxes (merge fragments, drop inconsistent openings)
//! 2. Union padded wall boxes and extrude them into the wall solid
//! 3. Partition the free space inside the walls into room floors
//! 4. Bind every opening to a wall, cut it out and instance its asset
//! 5. Assemble a Y-up scene and export it as binary glTF
//!
//! # Usage
//!
//! ```rust,ignore
//! use floorplan_reconstruct::{run, AssetPaths, DetectionFile, ReconstructConfig};
//!
//! let file: DetectionFile = serde_json::from_str(&json)?;
//! let detections = file.into_detections()?;
//!
//! let assets = AssetPaths {
//!     door_model: "assets/door.obj".into(),
//!     window_model: "assets/window.obj".into(),
//!     floor_textures: vec!["assets/oak.jpg".into()],
//! };
//!
//! let result = run(&detections, &ReconstructConfig::default(), &assets)?;
//! result.export("out/plan.glb")?;
//! ```

pub mod assets;
pub mod config;
pub mod error;
pub mod openings;
pub mod pipeline;
pub mod refine;
pub mod report;
pub mod rooms;
pub mod scene;
pub mod types;
pub mod walls;

pub use assets::{AssetLibrary, AssetModel, AssetPaths, Texture};
pub use config::{FloorConfig, OpeningConfig, ReconstructConfig, RefineConfig, WallConfig};
pub use error::{ReconstructError, Result};
pub use openings::{bind_wall, cut_openings, cut_volume, instance_mesh, place_openings};
pub use pipeline::{reconstruct, run, Reconstruction};
pub use refine::{collect_detections, refine};
pub use report::{DropRule, PipelineEvent, PipelineReport};
pub use rooms::{build_floors, partition_rooms, FloorSet, Room};
pub use scene::{Scene, SceneNode};
pub use types::{
    BoundingBox, BoxClass, BoxCollection, Detection, DetectionFile, OpeningPlacement, Orientation,
    Point2D,
};
pub use walls::{synthesize_walls, wall_footprint, WallModel};
