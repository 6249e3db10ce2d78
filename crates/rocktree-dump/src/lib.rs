//! Download a latitude/longitude bounding box of Google Earth 3D mesh data
//! and export it as a textured Wavefront OBJ model.
//!
//! A run has three stages:
//!
//! 1. [`OctantQuery`] walks the octant tree through the bulk metadata index
//!    and collects, per depth, the octants that exist inside the area.
//! 2. [`NodeSearcher`] starts from the octants at the start depth and
//!    descends with bounded concurrency, downloading each node after its
//!    children so that parent triangles covered by a child can be skipped.
//! 3. [`ObjWriter`] appends every downloaded node to one model, with a
//!    material and texture file per mesh.

pub mod app;
pub mod config;
pub mod coords;
mod error;
pub mod limiter;
pub mod navigator;
pub mod normalize;
pub mod obj;
pub mod octant;
pub mod query;
pub mod search;

#[cfg(test)]
mod testing;

pub use app::{DumpApp, DumpSource, DumpSummary};
pub use config::{DEFAULT_PARALLELISM, DEFAULT_START_DEPTH, DumpConfig, MAX_OCTANT_DEPTH};
pub use coords::{CoordError, parse_bbox, parse_dms};
pub use error::{ObjError, OctantError};
pub use limiter::{Admission, BranchLimiter};
pub use navigator::{BulkNavigator, NodeLocation};
pub use normalize::center_scale_obj;
pub use obj::{Counters, ObjWriter};
pub use octant::OctantBox;
pub use query::{FoundOctants, OctantQuery};
pub use search::{NodeSearcher, SearchConfig, SearchObserver};
