//! Run configuration.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rocktree::DEFAULT_BASE_URL;

use crate::search::SearchConfig;

/// Deepest octant level served by the dataset.
pub const MAX_OCTANT_DEPTH: usize = 21;

/// Default number of concurrent search branches.
pub const DEFAULT_PARALLELISM: usize = 16;

/// Depth of the octants the download starts from.
pub const DEFAULT_START_DEPTH: usize = 19;

/// Longest side of the normalized model.
pub const DEFAULT_SCALE: f64 = 10.0;

/// Root of every run's output directory.
pub const DOWNLOAD_DIR: &str = "downloaded_files";

/// Everything one dump run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpConfig {
    /// Endpoint prefix for planetoid, bulk and node requests.
    pub url_prefix: String,
    /// Deepest octant level searched and downloaded.
    pub max_depth: usize,
    /// Level whose octants seed the download.
    pub start_depth: usize,
    pub search: SearchConfig,
    pub output_dir: PathBuf,
    /// Keep fetched bulks and nodes in memory for the run.
    pub cache: bool,
    /// Save each node's protobuf response under `raw/`.
    pub dump_raw: bool,
    /// Save a JSON summary of each node under `json/`.
    pub dump_json: bool,
    /// Also write a recentred, rescaled copy of the model.
    pub normalize: bool,
    pub scale: f64,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            url_prefix: DEFAULT_BASE_URL.to_owned(),
            max_depth: MAX_OCTANT_DEPTH,
            start_depth: DEFAULT_START_DEPTH,
            search: SearchConfig::default(),
            output_dir: default_output_dir(),
            cache: false,
            dump_raw: false,
            dump_json: false,
            normalize: false,
            scale: DEFAULT_SCALE,
        }
    }
}

/// `downloaded_files/obj/<unix seconds>`.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    PathBuf::from(DOWNLOAD_DIR)
        .join("obj")
        .join(seconds.to_string())
}
