// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for the reconstruction pipeline
pub type Result<T> = std::result::Result<T, ReconstructError>;

/// Errors that abort a reconstruction run
#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error("No walls left after refinement")]
    NoWalls,

    #[error("Scene has no meshes to export")]
    EmptyScene,

    #[error("Cannot load asset {path}: {reason}")]
    Asset { path: PathBuf, reason: String },

    #[error("Cannot load texture {path}: {reason}")]
    Texture { path: PathBuf, reason: String },

    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] floorplan_geometry::Error),
}
