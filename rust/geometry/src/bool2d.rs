// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations on Multi-Part Regions
//!
//! [`Region2D`] is the planar kernel of the reconstruction pipeline: wall
//! rectangles are unioned into one region, rooms are the envelope minus that
//! region. All operations go through the i_overlay crate, whose output is
//! always a set of simple rings (outer counter-clockwise, holes clockwise),
//! which is also what [`Region2D::repair`] relies on.

use crate::profile::{create_rect, ring_signed_area, Profile2D};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Minimum area threshold - rings smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Epsilon for orientation tests in the self-intersection check
const EPSILON_2D: f64 = 1e-12;

/// A possibly multi-part polygonal region.
///
/// Each part is one connected component with its own holes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region2D {
    pub parts: Vec<Profile2D>,
}

impl Region2D {
    /// The empty region
    pub fn empty() -> Self {
        Self { parts: Vec::new() }
    }

    /// Region made of a single profile (not normalized)
    pub fn from_profile(profile: Profile2D) -> Self {
        Self {
            parts: vec![profile],
        }
    }

    /// Axis-aligned rectangle region
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::from_profile(create_rect(min_x, min_y, max_x, max_y))
    }

    /// Union of many rectangles `(min_x, min_y, max_x, max_y)` in one pass
    pub fn union_of_rects(rects: &[(f64, f64, f64, f64)]) -> Self {
        let subject: Vec<Vec<[f64; 2]>> = rects
            .iter()
            .map(|&(x0, y0, x1, y1)| contour_to_path(&create_rect(x0, y0, x1, y1).outer))
            .collect();

        if subject.is_empty() {
            return Self::empty();
        }

        let clip: Vec<Vec<[f64; 2]>> = Vec::new();
        let result = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);
        shapes_to_region(&result)
    }

    /// Number of connected parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the region has no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total enclosed area (holes subtracted)
    pub fn area(&self) -> f64 {
        self.parts.iter().map(Profile2D::area).sum()
    }

    /// Axis-aligned bounds over all parts
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        self.parts
            .iter()
            .filter_map(Profile2D::bounds)
            .reduce(|(amin, amax), (bmin, bmax)| {
                (
                    Point2::new(amin.x.min(bmin.x), amin.y.min(bmin.y)),
                    Point2::new(amax.x.max(bmax.x), amax.y.max(bmax.y)),
                )
            })
    }

    /// Bounding rectangle of the region as a region
    pub fn envelope(&self) -> Option<Self> {
        let (min, max) = self.bounds()?;
        Some(Self::rect(min.x, min.y, max.x, max.y))
    }

    pub fn difference(&self, other: &Region2D) -> Self {
        self.overlay_with(other, OverlayRule::Difference)
    }

    pub fn intersection(&self, other: &Region2D) -> Self {
        self.overlay_with(other, OverlayRule::Intersect)
    }

    /// Check that every ring is non-degenerate and no two edges of a part
    /// cross each other.
    pub fn is_valid(&self) -> bool {
        self.parts.iter().all(|part| {
            let rings: Vec<&[Point2<f64>]> = std::iter::once(part.outer.as_slice())
                .chain(part.holes.iter().map(Vec::as_slice))
                .collect();

            if rings
                .iter()
                .any(|r| r.len() < 3 || ring_signed_area(r).abs() <= MIN_AREA_THRESHOLD)
            {
                return false;
            }

            let edges: Vec<(usize, Point2<f64>, Point2<f64>)> = rings
                .iter()
                .enumerate()
                .flat_map(|(ring_idx, ring)| {
                    (0..ring.len()).map(move |i| (ring_idx, ring[i], ring[(i + 1) % ring.len()]))
                })
                .collect();

            for (i, a) in edges.iter().enumerate() {
                for b in edges.iter().skip(i + 1) {
                    if shares_endpoint(a, b) {
                        continue;
                    }
                    if segments_cross(&a.1, &a.2, &b.1, &b.2) {
                        return false;
                    }
                }
            }
            true
        })
    }

    /// Rebuild the region through a non-zero fill overlay.
    ///
    /// Self-intersecting rings come back split into simple rings; rings of
    /// zero area disappear. The result may be empty.
    pub fn repair(&self) -> Self {
        self.overlay_with(&Region2D::empty(), OverlayRule::Union)
    }

    fn overlay_with(&self, other: &Region2D, rule: OverlayRule) -> Self {
        let subject = region_to_paths(self);
        let clip = region_to_paths(other);

        if subject.is_empty() {
            return match rule {
                OverlayRule::Union => other.clone_normalized(),
                _ => Self::empty(),
            };
        }

        let result = subject.overlay(&clip, rule, FillRule::NonZero);
        shapes_to_region(&result)
    }

    fn clone_normalized(&self) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        let clip: Vec<Vec<[f64; 2]>> = Vec::new();
        let result = region_to_paths(self).overlay(&clip, OverlayRule::Union, FillRule::NonZero);
        shapes_to_region(&result)
    }
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if ring_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if ring_signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

fn shares_endpoint(
    a: &(usize, Point2<f64>, Point2<f64>),
    b: &(usize, Point2<f64>, Point2<f64>),
) -> bool {
    a.0 == b.0 && (a.1 == b.1 || a.1 == b.2 || a.2 == b.1 || a.2 == b.2)
}

fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Proper crossing test: touching at an endpoint does not count
fn segments_cross(p1: &Point2<f64>, p2: &Point2<f64>, q1: &Point2<f64>, q2: &Point2<f64>) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    ((d1 > EPSILON_2D && d2 < -EPSILON_2D) || (d1 < -EPSILON_2D && d2 > EPSILON_2D))
        && ((d3 > EPSILON_2D && d4 < -EPSILON_2D) || (d3 < -EPSILON_2D && d4 > EPSILON_2D))
}

/// Convert a region to i_overlay path format
fn region_to_paths(region: &Region2D) -> Vec<Vec<[f64; 2]>> {
    let mut paths = Vec::new();
    for part in &region.parts {
        if part.outer.len() < 3 {
            continue;
        }
        paths.push(contour_to_path(&part.outer));
        for hole in part.holes.iter().filter(|h| h.len() >= 3) {
            paths.push(contour_to_path(hole));
        }
    }
    paths
}

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Vec<Point2<f64>> {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

/// Convert i_overlay result shapes back to a region
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
fn shapes_to_region(shapes: &[Vec<Vec<[f64; 2]>>]) -> Region2D {
    let mut parts = Vec::with_capacity(shapes.len());

    for shape in shapes {
        let Some(outer_path) = shape.first() else {
            continue;
        };
        let outer = path_to_contour(outer_path);
        if outer.len() < 3 || ring_signed_area(&outer).abs() <= MIN_AREA_THRESHOLD {
            continue;
        }

        let mut profile = Profile2D::new(ensure_ccw(&outer));
        for hole_path in shape.iter().skip(1) {
            let hole = path_to_contour(hole_path);
            if hole.len() >= 3 && ring_signed_area(&hole).abs() > MIN_AREA_THRESHOLD {
                profile.add_hole(ensure_cw(&hole));
            }
        }
        parts.push(profile);
    }

    Region2D { parts }
}
