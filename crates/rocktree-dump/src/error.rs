//! Error types for octant queries and OBJ output.

use std::path::PathBuf;

use thiserror::Error;

use crate::octant::OctantBox;

/// Errors raised while mapping coordinates to octant paths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OctantError {
    #[error("invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid bounding box: {0:?}")]
    InvalidBoundingBox(OctantBox),

    #[error("octant {path} recorded with box {recorded:?}, then {found:?}")]
    InconsistentBox {
        path: String,
        recorded: OctantBox,
        found: OctantBox,
    },
}

/// Errors raised while writing a node to the OBJ model.
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("node {node} mesh {mesh}: strip window at {strip_index} mixes octant layers")]
    VertexLayerMismatch {
        node: String,
        mesh: usize,
        strip_index: usize,
    },

    #[error("node {node} mesh {mesh}: index {index} out of range for {len} vertices")]
    InvalidIndex {
        node: String,
        mesh: usize,
        index: usize,
        len: usize,
    },

    #[error("node {node} mesh {mesh}: {normals} normals for {vertices} vertices")]
    NormalCountMismatch {
        node: String,
        mesh: usize,
        normals: usize,
        vertices: usize,
    },

    #[error("node {node} mesh {mesh}: {source}")]
    Texture {
        node: String,
        mesh: usize,
        #[source]
        source: rocktree::Error,
    },
}
