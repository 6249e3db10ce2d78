//! Resolve octant paths against the bulk hierarchy.

use std::sync::Arc;

use rocktree::{BULK_DEPTH, BulkMetadata, BulkRequest, DataSource, NodeRequest};

/// Where a path's metadata lives: the deepest bulk covering it and the
/// node's index in that bulk.
#[derive(Debug, Clone)]
pub struct NodeLocation {
    pub bulk: Arc<BulkMetadata>,
    pub index: usize,
}

impl NodeLocation {
    /// Request for the node's geometry.
    #[must_use]
    pub fn node_request(&self) -> Option<NodeRequest> {
        NodeRequest::from_metadata(&self.bulk, self.index)
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.bulk.has_node_at(self.index)
    }
}

/// Walks bulks from the root epoch down to the one holding a path.
///
/// Bulks are fetched on every lookup; caching belongs to the
/// [`DataSource`].
#[derive(Debug)]
pub struct BulkNavigator<S> {
    source: Arc<S>,
    root_epoch: u32,
}

impl<S> Clone for BulkNavigator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            root_epoch: self.root_epoch,
        }
    }
}

impl<S: DataSource> BulkNavigator<S> {
    pub fn new(source: Arc<S>, root_epoch: u32) -> Self {
        Self { source, root_epoch }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn root_epoch(&self) -> u32 {
        self.root_epoch
    }

    /// Find the bulk entry for `path`, whether or not it stores geometry.
    ///
    /// Walks `path` in 4-digit strides. Each stride fetches the bulk rooted
    /// at the previous stride's prefix, after checking that the previous
    /// bulk actually advertises it. Paths with anything but digits `0..=7`,
    /// absent entries and fetch failures are reported as `None`.
    pub async fn locate(&self, path: &str) -> Option<NodeLocation> {
        if !path.bytes().all(|digit| (b'0'..=b'7').contains(&digit)) {
            tracing::debug!("{:?} is not an octant path", path);
            return None;
        }

        let mut location: Option<NodeLocation> = None;
        let mut epoch = self.root_epoch;

        let mut i = BULK_DEPTH;
        while i < path.len() + BULK_DEPTH {
            let bulk_path = &path[..i - BULK_DEPTH];
            let sub_path = &path[..i.min(path.len())];

            if let Some(parent) = &location {
                // The previous stride's sub-path is this stride's bulk path.
                let Some(meta) = parent.bulk.node(parent.index).filter(|meta| meta.has_bulk)
                else {
                    tracing::debug!("No bulk at {}", bulk_path);
                    return None;
                };
                let Some(bulk_epoch) = meta.bulk_metadata_epoch else {
                    tracing::debug!("Bulk at {} has no epoch", bulk_path);
                    return None;
                };
                epoch = bulk_epoch;
            }

            let bulk = match self
                .source
                .fetch_bulk(&BulkRequest::new(bulk_path, epoch))
                .await
            {
                Ok(bulk) => bulk,
                Err(e) => {
                    tracing::debug!("Bulk {} @ {} unavailable: {}", bulk_path, epoch, e);
                    return None;
                }
            };

            let Some(index) = bulk.index_of(sub_path) else {
                tracing::debug!("{} not in bulk {}", sub_path, bulk_path);
                return None;
            };
            location = Some(NodeLocation {
                bulk: Arc::new(bulk),
                index,
            });
            i += BULK_DEPTH;
        }

        location
    }

    /// Find the bulk entry for `path` if it stores geometry.
    pub async fn resolve(&self, path: &str) -> Option<NodeLocation> {
        self.locate(path)
            .await
            .filter(NodeLocation::has_data)
    }
}
