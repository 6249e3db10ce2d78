//! High-level async client for fetching and decoding Google Earth mesh data.
//!
//! The [`Client`] downloads planetoid, bulk and node payloads over HTTP,
//! retries transient failures with exponential backoff, and decodes the
//! protobuf messages into [`Planetoid`], [`BulkMetadata`] and [`Node`].
//!
//! Code that only needs the data, not the transport, should depend on the
//! [`DataSource`] trait so it can be driven by an in-memory fixture.

mod bulk;
mod cache;
mod client;
mod error;
mod node;
mod planetoid;
mod retry;
mod source;

pub use bulk::{BULK_DEPTH, BulkMetadata, BulkRequest, NodeMetadata, flags};
pub use cache::{Cache, MemoryCache, NoCache};
pub use client::{Client, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use node::{Mesh, Node, NodeRequest, Texture};
pub use planetoid::Planetoid;
pub use retry::RetryPolicy;
pub use source::DataSource;

pub use rocktree_decode::{TextureFormat, UvTransform, Vertex};
