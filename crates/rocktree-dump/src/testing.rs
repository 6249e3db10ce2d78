//! In-memory [`DataSource`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use glam::DMat4;
use rocktree::{
    BulkMetadata, BulkRequest, DataSource, Error, Mesh, Node, NodeRequest, Planetoid, Result,
    Vertex,
};
use rocktree_proto as proto;

/// Serves bulks and nodes registered up front; anything else is not found.
#[derive(Debug, Default)]
pub struct MemorySource {
    root_epoch: u32,
    bulks: Mutex<HashMap<(String, u32), BulkMetadata>>,
    nodes: Mutex<HashMap<String, Node>>,
    bulk_fetches: AtomicUsize,
    node_fetches: AtomicUsize,
}

/// Pack a path relative to its bulk head with flags.
fn path_and_flags(relative: &str, flags: u32) -> u32 {
    let mut digits = 0;
    for (i, digit) in relative.bytes().enumerate() {
        digits |= u32::from(digit - b'0') << (3 * i);
    }
    let level = relative.len() as u32;
    (level - 1) | (digits << 2) | (flags << (2 + 3 * level))
}

impl MemorySource {
    pub fn new(root_epoch: u32) -> Self {
        Self {
            root_epoch,
            ..Self::default()
        }
    }

    /// Register a bulk rooted at `path`. Entries are `(full path, flags,
    /// child bulk epoch)`.
    pub fn add_bulk(&self, path: &str, epoch: u32, entries: &[(&str, u32, Option<u32>)]) {
        let proto = proto::BulkMetadata {
            node_metadata: entries
                .iter()
                .map(|&(full, flags, bulk_epoch)| proto::NodeMetadata {
                    path_and_flags: Some(path_and_flags(&full[path.len()..], flags)),
                    epoch: Some(epoch),
                    bulk_metadata_epoch: bulk_epoch,
                    ..Default::default()
                })
                .collect(),
            head_node_key: Some(proto::NodeKey {
                path: Some(path.to_owned()),
                epoch: Some(epoch),
            }),
            ..Default::default()
        };
        let bulk = BulkMetadata::from_proto(&proto, &BulkRequest::new(path, epoch));
        self.bulks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((path.to_owned(), epoch), bulk);
    }

    /// Register node data for `path`.
    pub fn add_node(&self, node: Node) {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.path.clone(), node);
    }

    pub fn bulk_fetches(&self) -> usize {
        self.bulk_fetches.load(Ordering::SeqCst)
    }

    pub fn node_fetches(&self) -> usize {
        self.node_fetches.load(Ordering::SeqCst)
    }
}

impl DataSource for MemorySource {
    async fn fetch_planetoid(&self) -> Result<Planetoid> {
        Ok(Planetoid {
            radius: 6_371_010.0,
            root_epoch: self.root_epoch,
        })
    }

    async fn fetch_bulk(&self, request: &BulkRequest) -> Result<BulkMetadata> {
        self.bulk_fetches.fetch_add(1, Ordering::SeqCst);
        self.bulks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(request.path.clone(), request.epoch))
            .cloned()
            .ok_or_else(|| Error::NotFound {
                url: format!("bulk {}@{}", request.path, request.epoch),
            })
    }

    async fn fetch_node(&self, request: &NodeRequest) -> Result<Node> {
        self.node_fetches.fetch_add(1, Ordering::SeqCst);
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.path)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                url: format!("node {}", request.path),
            })
    }
}

/// A node with one untextured mesh: a single triangle per octant layer in
/// `layers`, vertices at small integer positions.
pub fn triangle_node(path: &str, layers: &[u8]) -> Node {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (i, &w) in layers.iter().enumerate() {
        let base = (3 * i) as u8;
        for k in 0..3 {
            vertices.push(Vertex {
                x: base + k,
                y: k,
                z: w,
                w,
                uv: [0; 4],
            });
        }
        let first = u16::from(base);
        // Degenerate bridge between triangles keeps them in one strip.
        if i > 0 {
            let last = indices.last().copied().unwrap_or_default();
            indices.extend([last, first]);
        }
        indices.extend([first, first + 1, first + 2]);
    }

    Node {
        path: path.to_owned(),
        meshes: vec![Mesh {
            vertices,
            indices,
            normals: None,
            uv_transform: None,
            layer_bounds: None,
            texture: None,
        }],
        matrix_globe_from_mesh: DMat4::IDENTITY,
    }
}
