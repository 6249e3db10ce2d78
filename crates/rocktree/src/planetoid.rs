//! Planetoid metadata.

use rocktree_proto as proto;

use crate::error::{Error, Result};

/// Planet-wide metadata: the entry point for bulk traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Planetoid {
    /// Planet radius in meters.
    pub radius: f32,
    /// Epoch of the root bulk (path `""`).
    pub root_epoch: u32,
}

impl Planetoid {
    pub(crate) fn from_proto(proto: &proto::PlanetoidMetadata) -> Result<Self> {
        let root_epoch = proto
            .root_node_metadata
            .as_ref()
            .and_then(|root| root.bulk_metadata_epoch)
            .ok_or(Error::MissingField("root_node_metadata.bulk_metadata_epoch"))?;

        Ok(Self {
            radius: proto.radius.unwrap_or_default(),
            root_epoch,
        })
    }
}
