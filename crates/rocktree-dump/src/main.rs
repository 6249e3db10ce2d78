//! Download a bounding box of Google Earth mesh data as an OBJ model.
//!
//! Run: `cargo run -p rocktree-dump -- --bbox "43.7235,10.3945,43.7225,10.3965"`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rocktree::{Cache, Client, DataSource, MemoryCache, NoCache};
use rocktree_dump::app::{self, DumpSource};
use rocktree_dump::config::{DEFAULT_SCALE, default_output_dir};
use rocktree_dump::{
    DEFAULT_PARALLELISM, DEFAULT_START_DEPTH, DumpConfig, MAX_OCTANT_DEPTH, OctantBox,
    SearchConfig, parse_bbox, parse_dms,
};
use tracing_subscriber::EnvFilter;

/// Download Google Earth 3D mesh data inside a bounding box.
#[derive(Parser, Debug)]
#[command(name = "rocktree-dump")]
#[command(about = "Downloads Google Earth 3D meshes inside a bounding box as a textured OBJ model")]
struct Args {
    /// Bounding box as "lat1,lon1,lat2,lon2"; corners in any order.
    #[arg(long, conflicts_with_all = ["from", "to"], required_unless_present_all = ["from", "to"])]
    bbox: Option<String>,

    /// First corner in degrees-minutes-seconds, e.g. 43°43'23"N 10°23'45"E.
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Opposite corner in degrees-minutes-seconds.
    #[arg(long, requires = "from")]
    to: Option<String>,

    /// Deepest octant level to download.
    #[arg(long, default_value_t = MAX_OCTANT_DEPTH)]
    max_depth: usize,

    /// Octant level the download starts from.
    #[arg(long, default_value_t = DEFAULT_START_DEPTH)]
    start_depth: usize,

    /// Concurrent search branches.
    #[arg(long, default_value_t = DEFAULT_PARALLELISM)]
    parallelism: usize,

    /// Search one branch at a time.
    #[arg(long, conflicts_with = "parallelism")]
    serial: bool,

    /// Queue deeper branches behind the starting octant's children.
    #[arg(long)]
    prioritize_root: bool,

    /// Output directory [default: downloaded_files/obj/<unix seconds>].
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Endpoint prefix for all requests.
    #[arg(long, default_value = rocktree::DEFAULT_BASE_URL)]
    url_prefix: String,

    /// Keep fetched bulks and nodes in memory.
    #[arg(long)]
    cache: bool,

    /// Save every node response under raw/.
    #[arg(long)]
    dump_raw: bool,

    /// Save a JSON summary of every node under json/.
    #[arg(long)]
    dump_json: bool,

    /// Also write a recentred and rescaled model.sc.obj.
    #[arg(long)]
    normalize: bool,

    /// Longest side of the normalized model.
    #[arg(long, default_value_t = DEFAULT_SCALE)]
    scale: f64,

    /// Print the octants inside the area as JSON and exit.
    #[arg(long)]
    octants_only: bool,
}

impl Args {
    fn area(&self) -> Result<OctantBox> {
        if let Some(bbox) = &self.bbox {
            return parse_bbox(bbox).context("Invalid --bbox");
        }
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            anyhow::bail!("Either --bbox or both --from and --to are required");
        };
        let from = parse_dms(from).context("Invalid --from")?;
        let to = parse_dms(to).context("Invalid --to")?;
        OctantBox::from_corners(from, to).context("Invalid bounding box")
    }

    fn config(&self) -> DumpConfig {
        DumpConfig {
            url_prefix: self.url_prefix.clone(),
            max_depth: self.max_depth,
            start_depth: self.start_depth,
            search: SearchConfig {
                parallelism: if self.serial { 1 } else { self.parallelism },
                prioritize_root: self.prioritize_root,
            },
            output_dir: self.output_dir.clone().unwrap_or_else(default_output_dir),
            cache: self.cache,
            dump_raw: self.dump_raw,
            dump_json: self.dump_json,
            normalize: self.normalize,
            scale: self.scale,
        }
    }
}

async fn octants_only<S: DataSource>(
    source: Arc<S>,
    config: &DumpConfig,
    rect: OctantBox,
) -> Result<()> {
    let planetoid = source
        .fetch_planetoid()
        .await
        .context("Failed to fetch planetoid metadata")?;
    let found = app::find_octants(source, planetoid.root_epoch, rect, config.max_depth).await?;
    println!("{}", serde_json::to_string_pretty(&found.to_json())?);
    Ok(())
}

async fn dump<C: Cache + 'static>(
    client: Client<C>,
    config: &DumpConfig,
    rect: OctantBox,
    only_octants: bool,
) -> Result<()> {
    let client = client.with_base_url(config.url_prefix.as_str());
    if only_octants {
        return octants_only(Arc::new(client), config, rect).await;
    }

    let source = Arc::new(DumpSource::new(client, app::raw_dir(config)?));
    let summary = app::run(source, config, rect).await?;

    println!("Octants in area: {}", summary.octants);
    println!("Nodes downloaded: {}", summary.downloaded);
    println!(
        "Vertices: {}, UVs: {}, normals: {}",
        summary.counters.vertices, summary.counters.uvs, summary.counters.normals
    );
    println!("Output: {}", summary.output_dir.display());
    if let Some(normalized) = summary.normalized {
        println!("Normalized: {}", normalized.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let rect = args.area()?;
    let config = args.config();
    tracing::info!(
        "Area N {} S {} E {} W {}, depths {}..={}",
        rect.north,
        rect.south,
        rect.east,
        rect.west,
        config.start_depth,
        config.max_depth
    );

    if config.cache {
        dump(Client::with_cache(MemoryCache::new()), &config, rect, args.octants_only).await
    } else {
        dump(Client::<NoCache>::new(), &config, rect, args.octants_only).await
    }
}
