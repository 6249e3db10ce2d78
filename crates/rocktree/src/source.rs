//! Abstraction over where rocktree data comes from.

use std::future::Future;

use crate::bulk::{BulkMetadata, BulkRequest};
use crate::cache::Cache;
use crate::client::Client;
use crate::error::Result;
use crate::node::{Node, NodeRequest};
use crate::planetoid::Planetoid;

/// Provider of decoded planetoid, bulk and node data.
///
/// [`Client`] is the network implementation; tests substitute in-memory
/// fixtures.
pub trait DataSource: Send + Sync {
    fn fetch_planetoid(&self) -> impl Future<Output = Result<Planetoid>> + Send;

    fn fetch_bulk(&self, request: &BulkRequest)
    -> impl Future<Output = Result<BulkMetadata>> + Send;

    fn fetch_node(&self, request: &NodeRequest) -> impl Future<Output = Result<Node>> + Send;
}

impl<C: Cache> DataSource for Client<C> {
    fn fetch_planetoid(&self) -> impl Future<Output = Result<Planetoid>> + Send {
        Client::fetch_planetoid(self)
    }

    fn fetch_bulk(
        &self,
        request: &BulkRequest,
    ) -> impl Future<Output = Result<BulkMetadata>> + Send {
        Client::fetch_bulk(self, request)
    }

    fn fetch_node(&self, request: &NodeRequest) -> impl Future<Output = Result<Node>> + Send {
        Client::fetch_node(self, request)
    }
}
