//! Bulk metadata: the paged index of the octree.

use std::collections::HashMap;

use glam::DVec3;
use rocktree_decode::{TextureFormat, unpack_path_and_flags};
use rocktree_proto as proto;

/// Node metadata flag bits.
pub mod flags {
    pub const RICH3D_LEAF: u32 = 1;
    pub const RICH3D_NODATA: u32 = 2;
    /// No bulk is rooted at this node.
    pub const LEAF: u32 = 4;
    /// No geometry is stored at this node.
    pub const NODATA: u32 = 8;
    /// Node data must be requested with an explicit imagery epoch.
    pub const USE_IMAGERY_EPOCH: u32 = 16;
}

/// Relative depth covered by one bulk.
pub const BULK_DEPTH: usize = 4;

/// Request for one bulk page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BulkRequest {
    /// Path of the bulk's head node (`""` for the root bulk).
    pub path: String,
    pub epoch: u32,
}

impl BulkRequest {
    pub fn new(path: impl Into<String>, epoch: u32) -> Self {
        Self {
            path: path.into(),
            epoch,
        }
    }

    /// The root bulk at the planetoid's root epoch.
    #[must_use]
    pub fn root(epoch: u32) -> Self {
        Self::new("", epoch)
    }
}

/// One entry of a bulk page.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetadata {
    /// Full octant path.
    pub path: String,
    /// Depth relative to the bulk head (1-4).
    pub level: usize,
    pub flags: u32,
    /// Node data epoch.
    pub epoch: u32,
    /// Epoch of the bulk rooted at this node, when it carries one.
    pub bulk_metadata_epoch: Option<u32>,
    /// Imagery epoch to request, when the node asks for one.
    pub imagery_epoch: Option<u32>,
    /// Preferred texture format among those available.
    pub texture_format: TextureFormat,
    /// Whether geometry is stored at this node.
    pub has_data: bool,
    /// Whether a child bulk is rooted at this node.
    pub has_bulk: bool,
}

/// A decoded bulk page.
#[derive(Debug, Clone)]
pub struct BulkMetadata {
    /// Path of the head node.
    pub path: String,
    pub epoch: u32,
    pub head_node_center: DVec3,
    pub meters_per_texel: Vec<f32>,
    pub nodes: Vec<NodeMetadata>,
    /// Paths of nodes that root a deeper bulk.
    pub child_bulk_paths: Vec<String>,
    index_by_path: HashMap<String, usize>,
}

impl BulkMetadata {
    /// Decode a bulk page fetched for `request`.
    #[must_use]
    pub fn from_proto(proto: &proto::BulkMetadata, request: &BulkRequest) -> Self {
        let head = proto.head_node_key.as_ref();
        let path = head
            .and_then(|key| key.path.clone())
            .unwrap_or_else(|| request.path.clone());
        let epoch = head.and_then(|key| key.epoch).unwrap_or(request.epoch);

        let default_formats = proto.default_available_texture_formats.unwrap_or_default();
        let default_imagery_epoch = proto.default_imagery_epoch.unwrap_or_default();

        let nodes: Vec<NodeMetadata> = proto
            .node_metadata
            .iter()
            .map(|meta| {
                let unpacked = unpack_path_and_flags(meta.path_and_flags.unwrap_or_default());
                let flags = unpacked.flags;
                let formats = meta.available_texture_formats.unwrap_or(default_formats);
                NodeMetadata {
                    path: format!("{path}{}", unpacked.path),
                    level: unpacked.level,
                    flags,
                    epoch: meta.epoch.unwrap_or_default(),
                    bulk_metadata_epoch: meta.bulk_metadata_epoch,
                    imagery_epoch: (flags & flags::USE_IMAGERY_EPOCH != 0)
                        .then(|| meta.imagery_epoch.unwrap_or(default_imagery_epoch)),
                    texture_format: preferred_texture_format(formats),
                    has_data: flags & flags::NODATA == 0,
                    has_bulk: unpacked.level == BULK_DEPTH && flags & flags::LEAF == 0,
                }
            })
            .collect();

        let child_bulk_paths = nodes
            .iter()
            .filter(|node| node.has_bulk)
            .map(|node| node.path.clone())
            .collect();
        let index_by_path = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.path.clone(), i))
            .collect();

        Self {
            path,
            epoch,
            head_node_center: dvec3_or_zero(&proto.head_node_center),
            meters_per_texel: proto.meters_per_texel.clone(),
            nodes,
            child_bulk_paths,
            index_by_path,
        }
    }

    /// Index of the node with the given full path.
    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.index_by_path.get(path).copied()
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&NodeMetadata> {
        self.nodes.get(index)
    }

    /// Whether geometry is stored at `index`.
    #[must_use]
    pub fn has_node_at(&self, index: usize) -> bool {
        self.node(index).is_some_and(|node| node.has_data)
    }

    /// Whether a child bulk is rooted at `index`.
    #[must_use]
    pub fn has_bulk_at(&self, index: usize) -> bool {
        self.node(index).is_some_and(|node| node.has_bulk)
    }
}

/// Prefer crunched DXT1 when offered, JPEG otherwise.
fn preferred_texture_format(available: u32) -> TextureFormat {
    let crn_bit = 1 << (TextureFormat::CrnDxt1 as u32 - 1);
    if available & crn_bit != 0 {
        TextureFormat::CrnDxt1
    } else {
        TextureFormat::Jpg
    }
}

fn dvec3_or_zero(values: &[f64]) -> DVec3 {
    match values {
        [x, y, z, ..] => DVec3::new(*x, *y, *z),
        _ => DVec3::ZERO,
    }
}
