//! Recursive node discovery and download with bounded concurrency.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rocktree::{DataSource, Node};
use tokio::task::JoinSet;

use crate::config::DEFAULT_PARALLELISM;
use crate::limiter::{Admission, BranchLimiter};
use crate::navigator::BulkNavigator;

/// Receives search progress.
pub trait SearchObserver: Send + Sync + 'static {
    /// An existing node was found; its children are about to be searched.
    fn node_found(&self, path: &str);

    /// A node's data arrived after all 8 children were searched. `exclude`
    /// lists, ascending, the child digits that exist and therefore replace
    /// the triangles tagged with that octant.
    fn node_downloaded(&self, path: &str, node: &Node, exclude: &[u8]) -> anyhow::Result<()>;
}

/// Search tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Branches in flight, including the calling one. 1 searches serially.
    pub parallelism: usize,
    /// Queue only the starting octant's children at the front; deeper
    /// branches wait at the back.
    pub prioritize_root: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            prioritize_root: false,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn serial() -> Self {
        Self {
            parallelism: 1,
            ..Self::default()
        }
    }
}

type Branch = Pin<Box<dyn Future<Output = bool> + Send>>;

/// Walks the octree below a path, downloading every node that exists.
pub struct NodeSearcher<S, O> {
    navigator: BulkNavigator<S>,
    limiter: BranchLimiter,
    config: SearchConfig,
    observer: O,
}

/// Returns a limiter slot when a child branch ends, even by panic.
struct SlotRelease<S: DataSource + 'static, O: SearchObserver>(Arc<NodeSearcher<S, O>>);

impl<S: DataSource + 'static, O: SearchObserver> Drop for SlotRelease<S, O> {
    fn drop(&mut self) {
        self.0.limiter.release();
    }
}

impl<S: DataSource + 'static, O: SearchObserver> NodeSearcher<S, O> {
    pub fn new(source: Arc<S>, root_epoch: u32, config: SearchConfig, observer: O) -> Arc<Self> {
        Arc::new(Self {
            navigator: BulkNavigator::new(source, root_epoch),
            limiter: BranchLimiter::new(config.parallelism.saturating_sub(1)),
            config,
            observer,
        })
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Search `path` and everything below it, up to `max_depth` digits.
    ///
    /// Returns whether `path` exists in the index.
    pub async fn search(self: &Arc<Self>, path: &str, max_depth: usize) -> bool {
        Arc::clone(self)
            .branch(path.to_owned(), max_depth, path.len())
            .await
    }

    fn admission(&self, parent_depth: usize, start_depth: usize) -> Admission {
        if self.config.prioritize_root && parent_depth > start_depth {
            Admission::Back
        } else {
            Admission::Front
        }
    }

    fn branch(self: Arc<Self>, path: String, max_depth: usize, start_depth: usize) -> Branch {
        Box::pin(async move {
            if path.len() > max_depth {
                return false;
            }
            let Some(location) = self.navigator.resolve(&path).await else {
                return false;
            };

            tracing::info!("Found {}", path);
            self.observer.node_found(&path);

            let admission = self.admission(path.len(), start_depth);
            let mut children = JoinSet::new();
            for digit in 0..8u8 {
                let searcher = Arc::clone(&self);
                let child = format!("{path}{digit}");
                children.spawn(async move {
                    let _slot = SlotRelease(Arc::clone(&searcher));
                    (digit, searcher.branch(child, max_depth, start_depth).await)
                });
                self.limiter.acquire(admission).await;
            }

            let mut exclude = Vec::new();
            while let Some(joined) = children.join_next().await {
                match joined {
                    Ok((digit, true)) => exclude.push(digit),
                    Ok((_, false)) => {}
                    Err(e) => tracing::warn!("Branch under {} failed: {}", path, e),
                }
            }
            exclude.sort_unstable();

            let Some(request) = location.node_request() else {
                tracing::warn!("No node metadata for {}", path);
                return false;
            };
            let node = match self.navigator.source().fetch_node(&request).await {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!("Failed to download {}: {}", path, e);
                    return false;
                }
            };

            tracing::info!("Downloaded {} (excluding {:?})", path, exclude);
            if let Err(e) = self.observer.node_downloaded(&path, &node, &exclude) {
                tracing::error!("Failed to store {}: {:#}", path, e);
                return false;
            }
            true
        })
    }
}
