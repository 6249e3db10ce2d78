//! A complete dump run: query, search, write, post-process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use rocktree::{
    BulkMetadata, BulkRequest, Cache, Client, DataSource, Node, NodeRequest, Planetoid,
};

use crate::config::DumpConfig;
use crate::navigator::BulkNavigator;
use crate::normalize;
use crate::obj::{Counters, ObjWriter};
use crate::octant::OctantBox;
use crate::query::{FoundOctants, OctantQuery};
use crate::search::{NodeSearcher, SearchObserver};

/// [`Client`] that can also keep every node response on disk.
#[derive(Debug)]
pub struct DumpSource<C: Cache> {
    client: Client<C>,
    raw_dir: Option<PathBuf>,
}

impl<C: Cache> DumpSource<C> {
    /// Save raw node responses as `{raw_dir}/{path}.pb` when `raw_dir` is set.
    pub fn new(client: Client<C>, raw_dir: Option<PathBuf>) -> Self {
        Self { client, raw_dir }
    }

    pub fn client(&self) -> &Client<C> {
        &self.client
    }
}

impl<C: Cache> DataSource for DumpSource<C> {
    async fn fetch_planetoid(&self) -> rocktree::Result<Planetoid> {
        self.client.fetch_planetoid().await
    }

    async fn fetch_bulk(&self, request: &BulkRequest) -> rocktree::Result<BulkMetadata> {
        self.client.fetch_bulk(request).await
    }

    async fn fetch_node(&self, request: &NodeRequest) -> rocktree::Result<Node> {
        let Some(raw_dir) = &self.raw_dir else {
            return self.client.fetch_node(request).await;
        };

        let bytes = self
            .client
            .fetch_bytes_from_url(&self.client.node_url(request))
            .await?;
        let raw_path = raw_dir.join(format!("{}.pb", request.path));
        if let Err(e) = fs::write(&raw_path, &bytes) {
            tracing::warn!("Failed to save {}: {}", raw_path.display(), e);
        }
        Node::from_bytes(&bytes, request.path.clone())
    }
}

/// Search observer that writes downloaded nodes to the model.
#[derive(Debug)]
pub struct DumpApp {
    writer: ObjWriter,
    json_dir: Option<PathBuf>,
    found: AtomicUsize,
    downloaded: AtomicUsize,
}

impl DumpApp {
    /// Save a JSON summary of each node as `{json_dir}/{path}.json` when
    /// `json_dir` is set.
    pub fn new(writer: ObjWriter, json_dir: Option<PathBuf>) -> Self {
        Self {
            writer,
            json_dir,
            found: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
        }
    }

    pub fn writer(&self) -> &ObjWriter {
        &self.writer
    }

    pub fn found(&self) -> usize {
        self.found.load(Ordering::Relaxed)
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::Relaxed)
    }
}

impl SearchObserver for DumpApp {
    fn node_found(&self, _path: &str) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    fn node_downloaded(&self, path: &str, node: &Node, exclude: &[u8]) -> anyhow::Result<()> {
        self.writer.write_node(path, node, exclude)?;
        self.downloaded.fetch_add(1, Ordering::Relaxed);

        // The node is already in the model, so a failed dump is not a
        // failed download.
        let dumped = self
            .json_dir
            .as_deref()
            .map_or(Ok(()), |json_dir| write_node_json(json_dir, path, node, exclude));
        if let Err(e) = dumped {
            tracing::warn!("Failed to dump {}: {:#}", path, e);
        }
        Ok(())
    }
}

fn write_node_json(
    json_dir: &Path,
    path: &str,
    node: &Node,
    exclude: &[u8],
) -> anyhow::Result<()> {
    let json_path = json_dir.join(format!("{path}.json"));
    let json = serde_json::to_string_pretty(&node_json(node, exclude))?;
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))
}

/// Summary of a node's meshes for inspection.
fn node_json(node: &Node, exclude: &[u8]) -> serde_json::Value {
    let matrix = node.matrix_globe_from_mesh.to_cols_array();
    serde_json::json!({
        "path": node.path,
        "exclude": exclude,
        "matrix_globe_from_mesh": matrix.as_slice(),
        "mesh_count": node.meshes.len(),
        "meshes": node.meshes.iter().enumerate().map(|(i, m)| {
            serde_json::json!({
                "index": i,
                "vertex_count": m.vertices.len(),
                "index_count": m.indices.len(),
                "has_normals": m.normals.is_some(),
                "layer_bounds": m.layer_bounds.map(|bounds| bounds.to_vec()),
                "uv_offset": m.uv_transform.map(|t| [t.offset.x, t.offset.y]),
                "uv_scale": m.uv_transform.map(|t| [t.scale.x, t.scale.y]),
                "texture": m.texture.as_ref().map(|t| serde_json::json!({
                    "format": format!("{:?}", t.format),
                    "width": t.width,
                    "height": t.height,
                    "bytes": t.data.len(),
                })),
                "first_vertices": m.vertices.iter().take(5).map(|v| {
                    serde_json::json!({
                        "x": v.x, "y": v.y, "z": v.z, "w": v.w, "u": v.u(), "v": v.v()
                    })
                }).collect::<Vec<_>>(),
                "first_indices": m.indices.iter().take(20).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
    })
}

/// What a dump run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpSummary {
    /// Octants returned by the bounding box query.
    pub octants: usize,
    /// Octants the download started from.
    pub starting_octants: Vec<String>,
    pub found: usize,
    pub downloaded: usize,
    pub counters: Counters,
    pub output_dir: PathBuf,
    /// Normalized model, when requested.
    pub normalized: Option<PathBuf>,
}

/// Octants inside `rect` that exist in the index.
pub async fn find_octants<S: DataSource>(
    source: Arc<S>,
    root_epoch: u32,
    rect: OctantBox,
    max_depth: usize,
) -> anyhow::Result<FoundOctants> {
    let query = OctantQuery::new(BulkNavigator::new(source, root_epoch));
    let found = query
        .bounding_box(rect, max_depth)
        .await
        .context("Invalid bounding box")?;
    Ok(found)
}

fn create_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// Download every node under `rect` into `config.output_dir`.
///
/// `config.dump_raw` is honoured by the caller through [`DumpSource`].
pub async fn run<S: DataSource + 'static>(
    source: Arc<S>,
    config: &DumpConfig,
    rect: OctantBox,
) -> anyhow::Result<DumpSummary> {
    let planetoid = source
        .fetch_planetoid()
        .await
        .context("Failed to fetch planetoid metadata")?;

    let found = find_octants(
        Arc::clone(&source),
        planetoid.root_epoch,
        rect,
        config.max_depth,
    )
    .await?;
    let starting_octants = found.starting_paths(config.start_depth);
    tracing::info!(
        "{} octants in area, starting from {}",
        found.len(),
        starting_octants.len()
    );

    let writer = ObjWriter::create(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    let json_dir = if config.dump_json {
        let dir = config.output_dir.join("json");
        create_dir(&dir)?;
        Some(dir)
    } else {
        None
    };

    let searcher = NodeSearcher::new(
        source,
        planetoid.root_epoch,
        config.search,
        DumpApp::new(writer, json_dir),
    );
    for path in &starting_octants {
        searcher.search(path, config.max_depth).await;
    }

    let app = searcher.observer();
    tracing::info!(
        "Found {} octants, downloaded {}",
        app.found(),
        app.downloaded()
    );

    let normalized = if config.normalize {
        let input = app.writer().obj_path();
        let output = normalize::normalized_path(&input);
        normalize::center_scale_obj(&input, &output, config.scale)
            .with_context(|| format!("Failed to normalize {}", input.display()))?;
        Some(output)
    } else {
        None
    };

    Ok(DumpSummary {
        octants: found.len(),
        starting_octants,
        found: app.found(),
        downloaded: app.downloaded(),
        counters: app.writer().counters(),
        output_dir: config.output_dir.clone(),
        normalized,
    })
}

/// Create `{output_dir}/raw` for raw node dumps.
pub fn raw_dir(config: &DumpConfig) -> anyhow::Result<Option<PathBuf>> {
    if !config.dump_raw {
        return Ok(None);
    }
    let dir = config.output_dir.join("raw");
    create_dir(&dir)?;
    Ok(Some(dir))
}

#[cfg(test)]
mod tests {
    use prost::Message;
    use rocktree::{MemoryCache, RetryPolicy, TextureFormat};
    use rocktree_proto as proto;

    use super::*;
    use crate::search::SearchConfig;
    use crate::testing::{MemorySource, triangle_node};

    fn config(dir: &Path) -> DumpConfig {
        DumpConfig {
            output_dir: dir.join("model"),
            start_depth: 3,
            max_depth: 4,
            search: SearchConfig::serial(),
            ..DumpConfig::default()
        }
    }

    fn source() -> Arc<MemorySource> {
        let source = MemorySource::new(1);
        source.add_bulk(
            "",
            1,
            &[
                ("30", 0, None),
                ("302", 0, None),
                ("306", 0, None),
                ("3020", flags_leaf(), None),
            ],
        );
        for path in ["30", "302", "306", "3020"] {
            source.add_node(triangle_node(path, &[0, 2]));
        }
        Arc::new(source)
    }

    fn flags_leaf() -> u32 {
        rocktree::flags::LEAF
    }

    #[tokio::test]
    async fn empty_area_produces_an_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(MemorySource::new(1));
        source.add_bulk("", 1, &[]);

        let rect = OctantBox::new(1.0, 0.0, 1.0, 0.0);
        let summary = run(source, &config(dir.path()), rect).await.unwrap();

        assert_eq!(summary.octants, 0);
        assert_eq!(summary.found, 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("model/model.obj")).unwrap(),
            "mtllib model.mtl\n"
        );
    }

    #[tokio::test]
    async fn downloads_from_the_start_depth() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.dump_json = true;
        config.normalize = true;

        let rect = OctantBox::new(60.0, 50.0, 30.0, 10.0);
        let summary = run(source(), &config, rect).await.unwrap();

        assert_eq!(summary.starting_octants, vec!["302", "306"]);
        assert_eq!(summary.found, 3);
        assert_eq!(summary.downloaded, 3);
        assert_eq!(summary.counters.vertices, 18);

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(config.output_dir.join("json/302.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["exclude"], serde_json::json!([0]));
        assert_eq!(json["meshes"][0]["vertex_count"], serde_json::json!(6));

        let normalized = summary.normalized.unwrap();
        assert_eq!(normalized, config.output_dir.join("model.sc.obj"));
        assert!(normalized.exists());
    }

    #[test]
    fn failed_json_dump_keeps_the_node() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ObjWriter::create(dir.path().join("model")).unwrap();
        // A file where the dump directory should be.
        let json_dir = dir.path().join("json");
        fs::write(&json_dir, "").unwrap();
        let app = DumpApp::new(writer, Some(json_dir));

        app.node_downloaded("21", &triangle_node("21", &[0]), &[])
            .unwrap();

        assert_eq!(app.downloaded(), 1);
        assert_eq!(app.writer().counters().vertices, 3);
    }

    #[tokio::test]
    async fn invalid_area_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rect = OctantBox::new(0.0, 1.0, 1.0, 0.0);
        assert!(run(source(), &config(dir.path()), rect).await.is_err());
    }

    #[tokio::test]
    async fn raw_responses_are_saved() {
        let dir = tempfile::tempdir().unwrap();
        let body = proto::NodeData {
            matrix_globe_from_mesh: glam::DMat4::IDENTITY.to_cols_array().to_vec(),
            ..Default::default()
        }
        .encode_to_vec();

        let client = Client::with_cache(MemoryCache::new())
            .with_base_url("http://127.0.0.1:9/")
            .with_retry(RetryPolicy::NONE);
        let request = NodeRequest::new("3020", 4, TextureFormat::Jpg, None);
        client.cache().insert(&client.node_url(&request), &body);

        let source = DumpSource::new(client, Some(dir.path().to_owned()));
        let node = source.fetch_node(&request).await.unwrap();

        assert_eq!(node.path, "3020");
        assert_eq!(fs::read(dir.path().join("3020.pb")).unwrap(), body);
    }
}
