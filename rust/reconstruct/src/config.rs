// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration.
//!
//! Lengths marked "px" are in image pixels and are multiplied by
//! `meters_per_pixel`; lengths marked "m" are applied after scaling.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for one reconstruction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructConfig {
    /// Real-world length of one pixel (m)
    pub meters_per_pixel: f64,
    /// Detections below this confidence are dropped at intake
    pub min_confidence: f32,
    pub refine: RefineConfig,
    pub walls: WallConfig,
    pub floors: FloorConfig,
    pub openings: OpeningConfig,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            meters_per_pixel: 0.01, // 1 pixel = 1 cm
            min_confidence: 0.0,
            refine: RefineConfig::default(),
            walls: WallConfig::default(),
            floors: FloorConfig::default(),
            openings: OpeningConfig::default(),
        }
    }
}

/// Bounding box refinement thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Per-class non-maximum suppression; disabled when `None`
    pub nms_iou_threshold: Option<f64>,
    /// Fragments with IoU above this are merged
    pub merge_iou_threshold: f64,
    /// Same-orientation fragments with centers closer than this are merged (px)
    pub merge_distance_threshold: f64,
    /// Openings need IoU above this with some wall
    pub wall_iou_threshold: f64,
    /// Walls farther than this from every other wall are dropped (px)
    pub isolated_wall_distance: f64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            nms_iou_threshold: None,
            merge_iou_threshold: 0.1,
            merge_distance_threshold: 80.0,
            wall_iou_threshold: 0.01,
            isolated_wall_distance: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Added to every wall box's width and height (px)
    pub wall_padding: f64,
    /// Extrusion height (px)
    pub wall_height: f64,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            wall_padding: 2.0,
            wall_height: 240.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    /// Room floor extrusion (px)
    pub floor_thickness: f64,
    /// Fixed seed for texture selection; entropy when `None`
    pub texture_seed: Option<u64>,
    /// Sub-floor overhang around the wall footprint (m)
    pub subfloor_margin: f64,
    /// Sub-floor slab thickness (m)
    pub subfloor_thickness: f64,
    /// Distance from z = 0 down to the sub-floor top (m)
    pub subfloor_drop: f64,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            floor_thickness: 5.0,
            texture_seed: None,
            subfloor_margin: 0.05,
            subfloor_thickness: 0.03,
            subfloor_drop: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningConfig {
    /// Added to the bound wall thickness (px)
    pub cut_margin: f64,
    /// Cut depth when no wall is bound (px)
    pub fallback_depth: f64,
    /// Asset scale relative to `meters_per_pixel`
    pub opening_scale_factor: f64,
    /// Door instance elevation (m)
    pub door_floor_offset: f64,
    /// Window instance offset above mid-wall when the asset path contains "small" (m)
    pub small_window_offset: f64,
    /// Window instance offset above mid-wall otherwise (m)
    pub window_offset: f64,
}

impl Default for OpeningConfig {
    fn default() -> Self {
        Self {
            cut_margin: 15.0,
            fallback_depth: 40.0,
            opening_scale_factor: 0.6,
            door_floor_offset: 0.01,
            small_window_offset: 0.1,
            window_offset: -0.02,
        }
    }
}

impl ReconstructConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply `FLOORPLAN_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("FLOORPLAN_WALL_HEIGHT") {
            match raw.parse::<f64>() {
                Ok(v) if v > 0.0 => self.walls.wall_height = v,
                _ => tracing::warn!(value = %raw, "ignoring FLOORPLAN_WALL_HEIGHT"),
            }
        }
        if let Some(raw) = lookup("FLOORPLAN_TEXTURE_SEED") {
            match raw.parse::<u64>() {
                Ok(v) => self.floors.texture_seed = Some(v),
                Err(_) => tracing::warn!(value = %raw, "ignoring FLOORPLAN_TEXTURE_SEED"),
            }
        }
        if let Some(raw) = lookup("FLOORPLAN_METERS_PER_PIXEL") {
            match raw.parse::<f64>() {
                Ok(v) if v > 0.0 => self.meters_per_pixel = v,
                _ => tracing::warn!(value = %raw, "ignoring FLOORPLAN_METERS_PER_PIXEL"),
            }
        }
        self
    }

    /// Uniform scale applied to door and window assets
    pub fn opening_scale(&self) -> f64 {
        self.meters_per_pixel * self.openings.opening_scale_factor
    }
}
