// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding box refinement
//!
//! Cleans raw detector output into a consistent set of walls, doors and
//! windows. Stages run strictly in order; each returns a new collection.
//!
//! 0. optional per-class non-maximum suppression
//! 1. fragment merge for doors and windows
//! 2. windows overlapping doors are dropped
//! 3. openings must touch a wall
//! 4. openings must overlap a wall by more than a minimum IoU
//! 5. isolated walls are dropped, then openings left without a wall

use crate::config::RefineConfig;
use crate::report::{DropRule, PipelineEvent, PipelineReport};
use crate::types::{BoundingBox, BoxClass, BoxCollection, Detection};

const OPENING_CLASSES: [BoxClass; 2] = [BoxClass::Door, BoxClass::Window];

/// Group detections by class, dropping those below `min_confidence`
pub fn collect_detections(
    detections: &[Detection],
    min_confidence: f32,
    report: &mut PipelineReport,
) -> BoxCollection {
    let mut boxes = BoxCollection::new();
    for detection in detections {
        if detection.confidence < min_confidence {
            report.record(PipelineEvent::Dropped {
                class: detection.class,
                bbox: detection.bbox,
                rule: DropRule::LowConfidence,
            });
            continue;
        }
        boxes.push(detection.class, detection.bbox);
    }
    boxes
}

/// Run every refinement stage in order
pub fn refine(
    boxes: &BoxCollection,
    config: &RefineConfig,
    report: &mut PipelineReport,
) -> BoxCollection {
    let input_count = boxes.len();

    let mut current = boxes.clone();
    if let Some(threshold) = config.nms_iou_threshold {
        for class in [BoxClass::Wall, BoxClass::Door, BoxClass::Window] {
            let kept = suppress_overlaps(current.get(class), class, threshold, report);
            current = current.with(class, kept);
        }
    }

    for class in OPENING_CLASSES {
        let merged = merge_fragments(
            current.get(class),
            class,
            config.merge_iou_threshold,
            config.merge_distance_threshold,
            report,
        );
        current = current.with(class, merged);
    }

    let current = remove_windows_overlapping_doors(&current, report);
    let current = remove_openings_off_walls(&current, report);
    let current = remove_openings_weakly_on_walls(&current, config.wall_iou_threshold, report);
    let current = remove_isolated_walls(&current, config.isolated_wall_distance, report);
    // Openings whose only wall was just dropped
    let current = remove_openings_off_walls(&current, report);

    tracing::info!(
        input = input_count,
        walls = current.walls.len(),
        doors = current.doors.len(),
        windows = current.windows.len(),
        "refined detections"
    );

    current
}

/// Greedy non-maximum suppression: largest area first, drop every later
/// box whose IoU with a kept box exceeds `iou_threshold`.
pub fn suppress_overlaps(
    boxes: &[BoundingBox],
    class: BoxClass,
    iou_threshold: f64,
    report: &mut PipelineReport,
) -> Vec<BoundingBox> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    // Stable sort keeps detector order among equal areas
    order.sort_by(|&a, &b| boxes[b].area().total_cmp(&boxes[a].area()));

    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for idx in order {
        let candidate = boxes[idx];
        if kept.iter().any(|k| k.iou(&candidate) > iou_threshold) {
            report.record(PipelineEvent::Dropped {
                class,
                bbox: candidate,
                rule: DropRule::Suppressed,
            });
        } else {
            kept.push(candidate);
        }
    }
    kept
}

/// Merge fragmented detections of one class.
///
/// A pass takes the first unmerged box as base and absorbs every later box
/// with `IoU(base, b) > iou_threshold`, or with centers closer than
/// `distance_threshold` and the same orientation class. The group becomes
/// its enclosing box. Passes repeat until nothing merges, so running the
/// function on its own output returns it unchanged.
pub fn merge_fragments(
    boxes: &[BoundingBox],
    class: BoxClass,
    iou_threshold: f64,
    distance_threshold: f64,
    report: &mut PipelineReport,
) -> Vec<BoundingBox> {
    let mut current = boxes.to_vec();
    loop {
        let (next, merged_any) = merge_pass(&current, class, iou_threshold, distance_threshold, report);
        current = next;
        if !merged_any {
            return current;
        }
    }
}

fn merge_pass(
    boxes: &[BoundingBox],
    class: BoxClass,
    iou_threshold: f64,
    distance_threshold: f64,
    report: &mut PipelineReport,
) -> (Vec<BoundingBox>, bool) {
    let mut remaining: Vec<BoundingBox> = boxes.to_vec();
    let mut merged = Vec::with_capacity(boxes.len());
    let mut merged_any = false;

    while !remaining.is_empty() {
        let base = remaining.remove(0);
        let mut group = vec![base];

        let mut i = 0;
        while i < remaining.len() {
            let candidate = remaining[i];
            let overlapping = base.iou(&candidate) > iou_threshold;
            let near_and_aligned = base.center_distance(&candidate) < distance_threshold
                && base.same_orientation_class(&candidate);

            if overlapping || near_and_aligned {
                group.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }

        let result = group
            .iter()
            .skip(1)
            .fold(base, |acc, b| acc.enclosing(b));

        if group.len() > 1 {
            merged_any = true;
            report.record(PipelineEvent::Merged {
                class,
                sources: group,
                result,
            });
        }
        merged.push(result);
    }

    (merged, merged_any)
}

/// Drop every window intersecting a door; doors always survive
pub fn remove_windows_overlapping_doors(
    boxes: &BoxCollection,
    report: &mut PipelineReport,
) -> BoxCollection {
    let windows = retain_or_drop(&boxes.windows, BoxClass::Window, DropRule::OverlapsDoor, report, |w| {
        !boxes.doors.iter().any(|d| d.intersects(w))
    });
    boxes.with(BoxClass::Window, windows)
}

/// Drop doors and windows that touch no wall
pub fn remove_openings_off_walls(
    boxes: &BoxCollection,
    report: &mut PipelineReport,
) -> BoxCollection {
    let mut next = boxes.clone();
    for class in OPENING_CLASSES {
        let kept = retain_or_drop(boxes.get(class), class, DropRule::NoWallContact, report, |o| {
            boxes.walls.iter().any(|w| w.intersects(o))
        });
        next = next.with(class, kept);
    }
    next
}

/// Drop doors and windows whose IoU with every wall is at most `iou_threshold`
pub fn remove_openings_weakly_on_walls(
    boxes: &BoxCollection,
    iou_threshold: f64,
    report: &mut PipelineReport,
) -> BoxCollection {
    let mut next = boxes.clone();
    for class in OPENING_CLASSES {
        let kept = retain_or_drop(boxes.get(class), class, DropRule::LowWallOverlap, report, |o| {
            boxes.walls.iter().any(|w| w.iou(o) > iou_threshold)
        });
        next = next.with(class, kept);
    }
    next
}

/// Drop walls that neither intersect nor come within `max_distance` of
/// another wall
pub fn remove_isolated_walls(
    boxes: &BoxCollection,
    max_distance: f64,
    report: &mut PipelineReport,
) -> BoxCollection {
    let walls = &boxes.walls;
    let mut kept = Vec::with_capacity(walls.len());
    for (i, wall) in walls.iter().enumerate() {
        let attached = walls
            .iter()
            .enumerate()
            .any(|(j, other)| i != j && (wall.intersects(other) || wall.distance(other) < max_distance));

        if attached {
            kept.push(*wall);
        } else {
            report.record(PipelineEvent::Dropped {
                class: BoxClass::Wall,
                bbox: *wall,
                rule: DropRule::IsolatedWall,
            });
        }
    }
    boxes.with(BoxClass::Wall, kept)
}

fn retain_or_drop(
    boxes: &[BoundingBox],
    class: BoxClass,
    rule: DropRule,
    report: &mut PipelineReport,
    keep: impl Fn(&BoundingBox) -> bool,
) -> Vec<BoundingBox> {
    let mut kept = Vec::with_capacity(boxes.len());
    for bbox in boxes {
        if keep(bbox) {
            kept.push(*bbox);
        } else {
            report.record(PipelineEvent::Dropped {
                class,
                bbox: *bbox,
                rule,
            });
        }
    }
    kept
}
