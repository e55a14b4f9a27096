use anyhow::{bail, Context, Result};
use cardiokg_core::config::EngineConfig;
use cardiokg_core::ingest::extractor::{GwasTsvReader, OpenTargetsReader, RecordReader, WikiPathwaysReader};
use cardiokg_core::ingest::{IngestReport, IngestionPipeline};
use cardiokg_core::persistence;
use cardiokg_core::shared::{ConcurrentIngestor, Source, SourceBatch};
use cardiokg_core::{CentralityKind, GraphQuery, GraphStatistics, SharedGraph};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: cardiokg <command>
  build                              ingest source files and write the snapshot
  stats                              node/edge counts by kind and relation
  neighborhood <id> [radius]         ego subgraph (default radius 1)
  paths <source> <target> [max]      simple paths (default max length 3)
  shortest <source> <target>         one shortest path
  common <a> <b>                     common neighbors
  centrality <kind> [k]              degree | betweenness | eigenvector | pagerank
  view                               node/edge list for renderers";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = EngineConfig::from_env();
    let arg = |i: usize| args.get(i).map(String::as_str);

    match arg(0) {
        Some("build") => build(&config).await,
        Some("stats") => with_graph(&config, |q| emit(&q.statistics())),
        Some("neighborhood") => {
            let id = required(arg(1), "node id")?;
            let radius = optional(arg(2), 1)?;
            with_graph(&config, |q| emit(&q.neighborhood(id, radius)?))
        }
        Some("paths") => {
            let (source, target) = (required(arg(1), "source")?, required(arg(2), "target")?);
            let max = optional(arg(3), 3)?;
            with_graph(&config, |q| emit(&q.simple_paths(source, target, max)?))
        }
        Some("shortest") => {
            let (source, target) = (required(arg(1), "source")?, required(arg(2), "target")?);
            with_graph(&config, |q| emit(&q.shortest_path(source, target)?))
        }
        Some("common") => {
            let (a, b) = (required(arg(1), "first node")?, required(arg(2), "second node")?);
            with_graph(&config, |q| emit(&q.common_neighbors(a, b)?))
        }
        Some("centrality") => {
            let kind: CentralityKind = required(arg(1), "centrality kind")?.parse()?;
            let k = optional(arg(2), 10)?;
            with_graph(&config, |q| emit(&q.top_central(kind, k)?))
        }
        Some("view") => with_graph(&config, |q| emit(&q.graph_view())),
        _ => {
            eprintln!("{USAGE}");
            bail!("missing or unknown command");
        }
    }
}

async fn build(config: &EngineConfig) -> Result<()> {
    let mut sources = Vec::new();
    if let Some(path) = existing(config.gwas_path()) {
        sources.push(Source::new("gwas", move || {
            GwasTsvReader::new().read_path(&path).map(SourceBatch::Gwas)
        }));
    }
    if let Some(path) = existing(config.pathways_path()) {
        sources.push(Source::new("wikipathways", move || {
            WikiPathwaysReader.read_path(&path).map(SourceBatch::Pathways)
        }));
    }
    if let Some(path) = existing(config.opentargets_path()) {
        sources.push(Source::new("opentargets", move || {
            OpenTargetsReader.read_path(&path).map(SourceBatch::TargetAssociations)
        }));
    }
    if sources.is_empty() {
        bail!("no source files found under {}", config.data_dir.display());
    }

    let graph = SharedGraph::default();
    let pipeline = IngestionPipeline::new(config.disease_filter.clone());
    let report = ConcurrentIngestor::new(graph.clone(), pipeline).ingest(sources).await?;

    let store = graph.read();
    if let Some(parent) = config.snapshot_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    persistence::save(&store, &config.snapshot_path)?;
    info!(
        snapshot = %config.snapshot_path.display(),
        nodes = store.node_count(),
        edges = store.edge_count(),
        "knowledge graph built"
    );

    #[derive(Serialize)]
    struct BuildSummary {
        report: IngestReport,
        statistics: GraphStatistics,
    }
    emit(&BuildSummary {
        report,
        statistics: GraphQuery::new(&store).statistics(),
    })
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        warn!(path = %path.display(), "source file not found, skipping");
        None
    }
}

fn with_graph<F>(config: &EngineConfig, run: F) -> Result<()>
where
    F: FnOnce(GraphQuery<'_>) -> Result<()>,
{
    let store = persistence::load(&config.snapshot_path)
        .with_context(|| format!("loading snapshot {}", config.snapshot_path.display()))?;
    run(GraphQuery::with_options(&store, config.centrality))
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    value.with_context(|| format!("missing {what}\n{USAGE}"))
}

fn optional(value: Option<&str>, default: usize) -> Result<usize> {
    match value {
        Some(v) => v.parse().with_context(|| format!("expected a number, got {v}")),
        None => Ok(default),
    }
}
