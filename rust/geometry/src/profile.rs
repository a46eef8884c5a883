// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Profile definitions and triangulation

use crate::error::{Error, Result};
use nalgebra::Point2;

/// 2D Profile with optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Profile2D {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Enclosed area: outer ring minus holes
    pub fn area(&self) -> f64 {
        let outer = ring_signed_area(&self.outer).abs();
        let holes: f64 = self.holes.iter().map(|h| ring_signed_area(h).abs()).sum();
        outer - holes
    }

    /// Axis-aligned bounds of the outer ring as `(min, max)`
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.outer.first()?;
        let (min, max) = self.outer.iter().skip(1).fold((first, first), |(mut min, mut max), p| {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            (min, max)
        });
        Some((min, max))
    }

    /// Triangulate the profile using earcutr
    /// Returns triangle indices into the flattened vertex array
    pub fn triangulate(&self) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::InvalidProfile(
                "Profile must have at least 3 vertices".to_string(),
            ));
        }

        // Flatten vertices for earcutr
        let mut vertices = Vec::with_capacity(
            (self.outer.len() + self.holes.iter().map(|h| h.len()).sum::<usize>()) * 2,
        );

        for p in &self.outer {
            vertices.push(p.x);
            vertices.push(p.y);
        }

        let mut hole_indices = Vec::with_capacity(self.holes.len());
        for hole in self.holes.iter().filter(|h| h.len() >= 3) {
            hole_indices.push(vertices.len() / 2);
            for p in hole {
                vertices.push(p.x);
                vertices.push(p.y);
            }
        }

        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

        let points = vertices
            .chunks_exact(2)
            .map(|c| Point2::new(c[0], c[1]))
            .collect();

        Ok(Triangulation { points, indices })
    }
}

/// Triangulated profile result
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All vertices (outer + holes)
    pub points: Vec<Point2<f64>>,
    /// Triangle indices
    pub indices: Vec<usize>,
}

/// Signed area of a closed ring (shoelace)
/// Positive = counter-clockwise, Negative = clockwise
pub fn ring_signed_area(ring: &[Point2<f64>]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let n = ring.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].x * ring[j].y;
        area -= ring[j].x * ring[i].y;
    }

    area * 0.5
}

/// Create an axis-aligned rectangular profile from its corners
#[inline]
pub fn create_rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Profile2D {
    let (x0, x1) = (min_x.min(max_x), min_x.max(max_x));
    let (y0, y1) = (min_y.min(max_y), min_y.max(max_y));

    Profile2D::new(vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_profile() {
        let profile = create_rect(0.0, 0.0, 10.0, 5.0);
        assert_eq!(profile.outer.len(), 4);
        assert_eq!(profile.holes.len(), 0);
        assert!(ring_signed_area(&profile.outer) > 0.0);
        assert!((profile.area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_corners_are_normalized() {
        // y-flipped boxes arrive with max < min
        let profile = create_rect(0.0, 0.0, 10.0, -5.0);
        let (min, max) = profile.bounds().unwrap();
        assert_eq!(min, Point2::new(0.0, -5.0));
        assert_eq!(max, Point2::new(10.0, 0.0));
    }

    #[test]
    fn test_area_subtracts_holes() {
        let mut profile = create_rect(0.0, 0.0, 10.0, 10.0);
        let mut hole = create_rect(2.0, 2.0, 4.0, 4.0).outer;
        hole.reverse();
        profile.add_hole(hole);
        assert!((profile.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangulate_rect() {
        let profile = create_rect(0.0, 0.0, 10.0, 5.0);
        let tri = profile.triangulate().unwrap();

        assert_eq!(tri.points.len(), 4);
        assert_eq!(tri.indices.len(), 6);
    }

    #[test]
    fn test_triangulate_with_hole() {
        let mut profile = create_rect(0.0, 0.0, 10.0, 10.0);
        let mut hole = create_rect(3.0, 3.0, 7.0, 7.0).outer;
        hole.reverse();
        profile.add_hole(hole);

        let tri = profile.triangulate().unwrap();
        assert_eq!(tri.points.len(), 8);
        assert!(tri.indices.len() > 6);
        assert_eq!(tri.indices.len() % 3, 0);
    }

    #[test]
    fn test_triangulate_degenerate() {
        let profile = Profile2D::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert!(profile.triangulate().is_err());
    }
}
