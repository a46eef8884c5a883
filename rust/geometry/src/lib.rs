// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan geometry kernel
//!
//! Two capabilities used by the reconstruction pipeline:
//!
//! - a 2D kernel ([`Region2D`]) providing union, difference, intersection,
//!   area and validity repair over multi-part polygons, backed by `i_overlay`
//! - a mesh kernel providing extrusion, affine transforms, concatenation and
//!   boolean subtraction ([`ClippingProcessor`]), backed by earcut and `csgrs`

pub mod bool2d;
pub mod csg;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod profile;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use bool2d::Region2D;
pub use csg::{box_mesh, ClippingProcessor};
pub use error::{Error, Result};
pub use extrusion::{apply_transform, extrude_profile};
pub use mesh::Mesh;
pub use profile::{create_rect, Profile2D};
pub use triangulation::triangulate_polygon;
