use crate::error::{GraphError, Result};
use crate::ingest::{GwasAssociation, IngestReport, IngestionPipeline, PathwayRecord, TargetAssociation};
use crate::store::GraphStore;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Cloneable handle to the single graph instance.
///
/// Readers share the lock; every mutation goes through [`SharedGraph::apply`]
/// so queries never see a half-merged record.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<GraphStore>>,
}

impl SharedGraph {
    pub fn new(store: GraphStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply<T>(&self, mutate: impl FnOnce(&mut GraphStore) -> T) -> T {
        mutate(&mut self.write())
    }

    /// Swaps in a freshly loaded graph wholesale.
    pub fn replace(&self, store: GraphStore) {
        *self.write() = store;
    }
}

/// Records produced by one source loader.
#[derive(Debug)]
pub enum SourceBatch {
    Gwas(Vec<Result<GwasAssociation>>),
    Pathways(Vec<Result<PathwayRecord>>),
    TargetAssociations(Vec<Result<TargetAssociation>>),
}

type LoadFn = Box<dyn FnOnce() -> Result<SourceBatch> + Send + 'static>;

/// A named loader run on its own worker.
pub struct Source {
    name: String,
    load: LoadFn,
}

impl Source {
    pub fn new<F>(name: impl Into<String>, load: F) -> Self
    where
        F: FnOnce() -> Result<SourceBatch> + Send + 'static,
    {
        Self {
            name: name.into(),
            load: Box::new(load),
        }
    }
}

#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    pub result: Result<IngestReport>,
}

/// Loads sources in parallel and applies them one batch at a time through a
/// single consumer.
pub struct ConcurrentIngestor {
    graph: SharedGraph,
    pipeline: IngestionPipeline,
}

impl ConcurrentIngestor {
    pub fn new(graph: SharedGraph, pipeline: IngestionPipeline) -> Self {
        Self { graph, pipeline }
    }

    /// Outcomes are returned sorted by source name, one per source. A loader
    /// that panics yields a `Source` error under its own name.
    pub async fn run(&self, sources: Vec<Source>) -> Vec<SourceOutcome> {
        let (tx, mut rx) = mpsc::channel::<(String, Result<SourceBatch>)>(sources.len().max(1));
        let mut loaders = Vec::with_capacity(sources.len());
        for source in sources {
            let tx = tx.clone();
            let name = source.name.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let batch = (source.load)();
                if tx.blocking_send((source.name, batch)).is_err() {
                    warn!("ingestion consumer went away before batch was delivered");
                }
            });
            loaders.push((name, handle));
        }
        drop(tx);

        let mut outcomes = Vec::new();
        while let Some((source, batch)) = rx.recv().await {
            let result = batch.and_then(|batch| self.graph.apply(|store| self.apply_batch(store, batch)));
            match &result {
                Ok(report) => info!(source = %source, ingested = report.ingested, "source applied"),
                Err(e) => warn!(source = %source, error = %e, "source failed"),
            }
            outcomes.push(SourceOutcome { source, result });
        }

        for (source, handle) in loaders {
            if let Err(e) = handle.await {
                warn!(source = %source, error = %e, "source loader did not finish");
                outcomes.push(SourceOutcome {
                    source,
                    result: Err(GraphError::Source(format!("loader failed: {e}"))),
                });
            }
        }
        outcomes.sort_by(|a, b| a.source.cmp(&b.source));
        outcomes
    }

    /// Runs every source and returns the merged report, or the first failure.
    pub async fn ingest(&self, sources: Vec<Source>) -> Result<IngestReport> {
        merge_outcomes(self.run(sources).await)
    }

    fn apply_batch(&self, store: &mut GraphStore, batch: SourceBatch) -> Result<IngestReport> {
        match batch {
            SourceBatch::Gwas(records) => self.pipeline.ingest_gwas_stream(store, records),
            SourceBatch::Pathways(records) => self.pipeline.ingest_pathways_stream(store, records),
            SourceBatch::TargetAssociations(records) => {
                self.pipeline.ingest_target_associations_stream(store, records)
            }
        }
    }
}

/// Sums successful reports, surfacing the first failure.
pub fn merge_outcomes(outcomes: Vec<SourceOutcome>) -> Result<IngestReport> {
    let mut total = IngestReport::default();
    for outcome in outcomes {
        total.merge(&outcome.result?);
    }
    Ok(total)
}
