//! HTTP client for the rocktree endpoints.

use prost::Message;
use rocktree_proto as proto;

use crate::bulk::{BulkMetadata, BulkRequest};
use crate::cache::{Cache, NoCache};
use crate::error::{Error, Result};
use crate::node::{Node, NodeRequest};
use crate::planetoid::Planetoid;
use crate::retry::RetryPolicy;

/// Default endpoint prefix for Earth data.
pub const DEFAULT_BASE_URL: &str = "https://kh.google.com/rt/earth/";

/// Fetches and decodes rocktree payloads.
///
/// Every request goes through the cache first, then over HTTP with the
/// configured [`RetryPolicy`]. Successful bodies are stored in the cache.
#[derive(Debug, Clone)]
pub struct Client<C: Cache = NoCache> {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    cache: C,
}

impl Client<NoCache> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache(NoCache)
    }
}

impl Default for Client<NoCache> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cache> Client<C> {
    pub fn with_cache(cache: C) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            retry: RetryPolicy::default(),
            cache,
        }
    }

    /// Use a different endpoint prefix. A trailing slash is added if missing.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    #[must_use]
    pub fn planetoid_url(&self) -> String {
        format!("{}PlanetoidMetadata", self.base_url)
    }

    #[must_use]
    pub fn bulk_url(&self, request: &BulkRequest) -> String {
        format!(
            "{}BulkMetadata/pb=!1m2!1s{}!2u{}",
            self.base_url, request.path, request.epoch
        )
    }

    #[must_use]
    pub fn node_url(&self, request: &NodeRequest) -> String {
        let imagery = request
            .imagery_epoch
            .map(|epoch| format!("!3u{epoch}"))
            .unwrap_or_default();
        format!(
            "{}NodeData/pb=!1m2!1s{}!2u{}!2e{}{}!4b0",
            self.base_url, request.path, request.epoch, request.texture_format as i32, imagery
        )
    }

    /// Fetch a response body, consulting the cache and retrying transient
    /// failures.
    pub async fn fetch_bytes_from_url(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(bytes) = self.cache.get(url) {
            tracing::trace!("Cache hit: {}", url);
            return Ok(bytes);
        }

        let bytes = self.retry.run(url, || self.fetch_once(url)).await?;
        self.cache.insert(url, &bytes);
        Ok(bytes)
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let http_error = |source| Error::Http {
            url: url.to_owned(),
            source,
        };

        let response = self.http.get(url).send().await.map_err(http_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_error)?;
        Ok(body.to_vec())
    }

    pub async fn fetch_planetoid(&self) -> Result<Planetoid> {
        let bytes = self.fetch_bytes_from_url(&self.planetoid_url()).await?;
        let proto = proto::PlanetoidMetadata::decode(bytes.as_slice())?;
        let planetoid = Planetoid::from_proto(&proto)?;
        tracing::info!(
            "Loaded planetoid: radius={:.0}m, root_epoch={}",
            planetoid.radius,
            planetoid.root_epoch
        );
        Ok(planetoid)
    }

    pub async fn fetch_bulk(&self, request: &BulkRequest) -> Result<BulkMetadata> {
        let bytes = self.fetch_bytes_from_url(&self.bulk_url(request)).await?;
        let proto = proto::BulkMetadata::decode(bytes.as_slice())?;
        let bulk = BulkMetadata::from_proto(&proto, request);
        tracing::debug!(
            "Loaded bulk '{}' @ {}: {} nodes",
            bulk.path,
            bulk.epoch,
            bulk.nodes.len()
        );
        Ok(bulk)
    }

    pub async fn fetch_node(&self, request: &NodeRequest) -> Result<Node> {
        let bytes = self.fetch_bytes_from_url(&self.node_url(request)).await?;
        Node::from_bytes(&bytes, request.path.clone())
    }
}
