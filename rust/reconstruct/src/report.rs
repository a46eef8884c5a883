// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recoverable pipeline events.
//!
//! Every event is traced when recorded and kept so callers can inspect
//! what the heuristics did to their input.

use crate::types::{BoundingBox, BoxClass};
use serde::Serialize;

/// Rule that removed a box
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropRule {
    /// Below the configured minimum confidence
    LowConfidence,
    /// Suppressed by a larger overlapping box of the same class
    Suppressed,
    /// Window overlapping a door
    OverlapsDoor,
    /// Opening not touching any wall
    NoWallContact,
    /// Opening IoU with every wall at or below the threshold
    LowWallOverlap,
    /// Wall neither touching nor near another wall
    IsolatedWall,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Dropped {
        class: BoxClass,
        bbox: BoundingBox,
        rule: DropRule,
    },
    Merged {
        class: BoxClass,
        sources: Vec<BoundingBox>,
        result: BoundingBox,
    },
    RepairedPolygon {
        stage: &'static str,
        index: usize,
    },
    SkippedPolygon {
        stage: &'static str,
        index: usize,
        reason: String,
    },
    BindingMiss {
        class: BoxClass,
        index: usize,
        bbox: BoundingBox,
    },
    BooleanFailure {
        class: BoxClass,
        /// Opening boxes whose cut was not applied
        boxes: Vec<BoundingBox>,
        wall_indices: Vec<usize>,
        reason: String,
    },
}

/// Ordered log of everything the pipeline recovered from
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub events: Vec<PipelineEvent>,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: PipelineEvent) {
        match &event {
            PipelineEvent::Dropped { class, bbox, rule } => {
                tracing::debug!(class = %class, ?bbox, ?rule, "dropped box");
            }
            PipelineEvent::Merged {
                class,
                sources,
                result,
            } => {
                tracing::debug!(class = %class, sources = sources.len(), ?result, "merged fragments");
            }
            PipelineEvent::RepairedPolygon { stage, index } => {
                tracing::info!(stage, index, "repaired invalid polygon");
            }
            PipelineEvent::SkippedPolygon {
                stage,
                index,
                reason,
            } => {
                tracing::warn!(stage, index, reason = %reason, "skipped polygon");
            }
            PipelineEvent::BindingMiss { class, index, bbox } => {
                tracing::warn!(class = %class, index, ?bbox, "no wall overlaps opening, using fallback depth");
            }
            PipelineEvent::BooleanFailure {
                class,
                boxes,
                wall_indices,
                reason,
            } => {
                tracing::warn!(
                    class = %class,
                    openings = boxes.len(),
                    ?wall_indices,
                    reason = %reason,
                    "opening cut failed, walls left un-pierced"
                );
            }
        }
        self.events.push(event);
    }

    pub fn dropped(&self) -> impl Iterator<Item = (&BoxClass, &BoundingBox, &DropRule)> {
        self.events.iter().filter_map(|e| match e {
            PipelineEvent::Dropped { class, bbox, rule } => Some((class, bbox, rule)),
            _ => None,
        })
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped().count()
    }

    pub fn merged_count(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::Merged { .. }))
    }

    pub fn binding_misses(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::BindingMiss { .. }))
    }

    pub fn boolean_failures(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::BooleanFailure { .. }))
    }

    pub fn repaired_polygons(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::RepairedPolygon { .. }))
    }

    pub fn skipped_polygons(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::SkippedPolygon { .. }))
    }

    fn count(&self, pred: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}
