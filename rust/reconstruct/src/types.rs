// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for floor plan reconstruction

use crate::error::ReconstructError;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Detection class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BoxClass {
    Wall,
    Door,
    Window,
}

impl BoxClass {
    pub fn label(&self) -> &'static str {
        match self {
            BoxClass::Wall => "wall",
            BoxClass::Door => "door",
            BoxClass::Window => "window",
        }
    }
}

impl fmt::Display for BoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orientation of an opening relative to the image axes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Wider than tall (or square)
    Horizontal,
    /// Strictly taller than wide
    Vertical,
}

/// Axis-aligned rectangle in image pixel space (y grows downward).
///
/// Always satisfies `x_min < x_max` and `y_min < y_max`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Build a box, rejecting degenerate or non-finite input
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Option<Self> {
        let finite = [x_min, y_min, x_max, y_max].iter().all(|v| v.is_finite());
        if !finite || x_min >= x_max || y_min >= y_max {
            return None;
        }
        Some(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Build a box from `[x0, y0, x1, y1]`
    pub fn from_array(coords: [f64; 4]) -> Option<Self> {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn orientation(&self) -> Orientation {
        if self.height() > self.width() {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    /// Both strictly wider than tall, or both at least as tall as wide
    pub fn same_orientation_class(&self, other: &BoundingBox) -> bool {
        let (w1, h1) = (self.width(), self.height());
        let (w2, h2) = (other.width(), other.height());
        (w1 > h1 && w2 > h2) || (h1 >= w1 && h2 >= w2)
    }

    /// Area of the overlap (zero when the boxes only touch)
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let w = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let h = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        w * h
    }

    /// Closed-set intersection: shared edges or corners count
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x_min <= other.x_max
            && other.x_min <= self.x_max
            && self.y_min <= other.y_max
            && other.y_min <= self.y_max
    }

    /// Intersection over union, zero when the union has no area
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    /// Euclidean gap between the two rectangles (zero when they intersect)
    pub fn distance(&self, other: &BoundingBox) -> f64 {
        let dx = (other.x_min - self.x_max).max(self.x_min - other.x_max).max(0.0);
        let dy = (other.y_min - self.y_max).max(self.y_min - other.y_max).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        self.center().distance_to(&other.center())
    }

    /// Smallest box containing both
    pub fn enclosing(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Grow width and height by `pad`, keeping the top-left corner
    pub fn padded(&self, pad: f64) -> BoundingBox {
        BoundingBox {
            x_max: self.x_max + pad,
            y_max: self.y_max + pad,
            ..*self
        }
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            x_min: f64,
            y_min: f64,
            x_max: f64,
            y_max: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        BoundingBox::new(raw.x_min, raw.y_min, raw.x_max, raw.y_max).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "degenerate bounding box ({}, {}, {}, {})",
                raw.x_min, raw.y_min, raw.x_max, raw.y_max
            ))
        })
    }
}

/// A detector output: one labeled box with its confidence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub class: BoxClass,
    pub bbox: BoundingBox,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl Detection {
    pub fn new(class: BoxClass, bbox: BoundingBox) -> Self {
        Self {
            class,
            bbox,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Detection file layout: `{"walls": [[x0, y0, x1, y1, conf?], ...], "doors": ..., "windows": ...}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionFile {
    pub walls: Vec<Vec<f64>>,
    pub doors: Vec<Vec<f64>>,
    pub windows: Vec<Vec<f64>>,
}

impl DetectionFile {
    /// Convert rows into detections.
    ///
    /// Rows must hold four coordinates and an optional confidence; the
    /// first malformed row is reported by class and position. Degenerate
    /// rectangles are skipped here and never reach the pipeline.
    pub fn into_detections(self) -> crate::error::Result<Vec<Detection>> {
        let mut detections = Vec::new();
        for (class, rows) in [
            (BoxClass::Wall, self.walls),
            (BoxClass::Door, self.doors),
            (BoxClass::Window, self.windows),
        ] {
            for (i, row) in rows.into_iter().enumerate() {
                if row.len() != 4 && row.len() != 5 {
                    return Err(ReconstructError::InvalidInput(format!(
                        "{} #{}: expected 4 or 5 numbers, got {}",
                        class,
                        i,
                        row.len()
                    )));
                }
                let Some(bbox) = BoundingBox::new(row[0], row[1], row[2], row[3]) else {
                    tracing::warn!(class = %class, index = i, ?row, "skipping degenerate box");
                    continue;
                };
                let confidence = row.get(4).map(|c| *c as f32).unwrap_or(1.0);
                detections.push(Detection::new(class, bbox).with_confidence(confidence));
            }
        }
        Ok(detections)
    }
}

/// Per-class ordered box lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxCollection {
    pub walls: Vec<BoundingBox>,
    pub doors: Vec<BoundingBox>,
    pub windows: Vec<BoundingBox>,
}

impl BoxCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: BoxClass) -> &[BoundingBox] {
        match class {
            BoxClass::Wall => &self.walls,
            BoxClass::Door => &self.doors,
            BoxClass::Window => &self.windows,
        }
    }

    /// Copy of this collection with one class list replaced
    pub fn with(&self, class: BoxClass, boxes: Vec<BoundingBox>) -> Self {
        let mut next = self.clone();
        match class {
            BoxClass::Wall => next.walls = boxes,
            BoxClass::Door => next.doors = boxes,
            BoxClass::Window => next.windows = boxes,
        }
        next
    }

    pub fn push(&mut self, class: BoxClass, bbox: BoundingBox) {
        match class {
            BoxClass::Wall => self.walls.push(bbox),
            BoxClass::Door => self.doors.push(bbox),
            BoxClass::Window => self.windows.push(bbox),
        }
    }

    pub fn len(&self) -> usize {
        self.walls.len() + self.doors.len() + self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where and how one door or window is cut into the walls and instanced.
///
/// All lengths are in world units (meters); the frame is Z-up with the
/// image y axis negated.
#[derive(Debug, Clone, PartialEq)]
pub struct OpeningPlacement {
    pub class: BoxClass,
    /// Position in the refined list of its class
    pub index: usize,
    pub bbox: BoundingBox,
    /// Index of the bound wall box, `None` when no wall overlaps
    pub wall_index: Option<usize>,
    pub orientation: Orientation,
    /// Center of the cut volume
    pub center: Point3<f64>,
    /// Cut volume edge lengths before rotation: (width, depth, height)
    pub cut_extents: Vector3<f64>,
    /// Translation applied to the scaled, rotated asset
    pub instance_translation: Vector3<f64>,
    /// Uniform scale applied to the asset
    pub instance_scale: f64,
}

impl OpeningPlacement {
    pub fn cut_depth(&self) -> f64 {
        self.cut_extents.y
    }

    /// Rotation about +Z applied to both the cut volume and the instance
    pub fn rotation(&self) -> f64 {
        match self.orientation {
            Orientation::Vertical => std::f64::consts::FRAC_PI_2,
            Orientation::Horizontal => 0.0,
        }
    }
}
