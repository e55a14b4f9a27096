//! Maps normalized source records onto graph store mutations.

use crate::error::{GraphError, Result};
use crate::model::{AttrValue, Attributes, NodeKind, Relation};
use crate::store::GraphStore;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

pub mod extractor;
pub mod records;

pub use records::{
    split_gene_list, DiseaseFilter, GwasAssociation, Interaction, PathwayRecord, TargetAssociation,
};

/// Counters for one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub ingested: usize,
    pub filtered: usize,
    pub malformed: usize,
    pub skipped_edges: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: &IngestReport) {
        self.processed += other.processed;
        self.ingested += other.ingested;
        self.filtered += other.filtered;
        self.malformed += other.malformed;
        self.skipped_edges += other.skipped_edges;
        self.nodes_added += other.nodes_added;
        self.edges_added += other.edges_added;
    }

    fn node(&mut self, created: bool) {
        self.nodes_added += usize::from(created);
    }

    fn edge(&mut self, created: bool) {
        self.edges_added += usize::from(created);
    }
}

/// Source-specific mapping from records to graph mutations.
///
/// Each record is validated and its node kinds are checked against the graph
/// before anything is written, so a rejected record leaves no trace. Records
/// that fail are skipped and counted; the batch carries on.
#[derive(Debug, Clone, Default)]
pub struct IngestionPipeline {
    filter: DiseaseFilter,
}

impl IngestionPipeline {
    pub fn new(filter: DiseaseFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &DiseaseFilter {
        &self.filter
    }

    pub fn ingest_gwas<I>(&self, store: &mut GraphStore, records: I) -> IngestReport
    where
        I: IntoIterator<Item = GwasAssociation>,
    {
        let mut report = IngestReport::default();
        for record in records {
            self.gwas_record(store, &record, &mut report);
        }
        log_report("gwas", &report);
        report
    }

    /// Streaming variant: malformed items are counted, any other error aborts
    /// the call. Records applied before the failure stay in the graph.
    pub fn ingest_gwas_stream<I>(&self, store: &mut GraphStore, records: I) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<GwasAssociation>>,
    {
        let mut report = IngestReport::default();
        for record in records {
            match record {
                Ok(record) => self.gwas_record(store, &record, &mut report),
                Err(e) => skip_or_abort(e, "gwas", &mut report)?,
            }
        }
        log_report("gwas", &report);
        Ok(report)
    }

    pub fn ingest_pathways<I>(&self, store: &mut GraphStore, records: I) -> IngestReport
    where
        I: IntoIterator<Item = PathwayRecord>,
    {
        let mut report = IngestReport::default();
        for record in records {
            pathway_record(store, &record, &mut report);
        }
        log_report("pathways", &report);
        report
    }

    pub fn ingest_pathways_stream<I>(&self, store: &mut GraphStore, records: I) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<PathwayRecord>>,
    {
        let mut report = IngestReport::default();
        for record in records {
            match record {
                Ok(record) => pathway_record(store, &record, &mut report),
                Err(e) => skip_or_abort(e, "pathways", &mut report)?,
            }
        }
        log_report("pathways", &report);
        Ok(report)
    }

    pub fn ingest_target_associations<I>(&self, store: &mut GraphStore, records: I) -> IngestReport
    where
        I: IntoIterator<Item = TargetAssociation>,
    {
        let mut report = IngestReport::default();
        for record in records {
            target_record(store, &record, &mut report);
        }
        log_report("target_associations", &report);
        report
    }

    pub fn ingest_target_associations_stream<I>(
        &self,
        store: &mut GraphStore,
        records: I,
    ) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<TargetAssociation>>,
    {
        let mut report = IngestReport::default();
        for record in records {
            match record {
                Ok(record) => target_record(store, &record, &mut report),
                Err(e) => skip_or_abort(e, "target_associations", &mut report)?,
            }
        }
        log_report("target_associations", &report);
        Ok(report)
    }

    fn gwas_record(&self, store: &mut GraphStore, record: &GwasAssociation, report: &mut IngestReport) {
        report.processed += 1;
        if !self.filter.accepts(&record.disease_trait) {
            report.filtered += 1;
            return;
        }
        let outcome = record.validate().and_then(|_| {
            let disease = record.disease_trait.trim();
            let genes: Vec<&str> = record
                .genes
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty())
                .collect();
            check_kinds(
                store,
                std::iter::once((disease, NodeKind::Disease))
                    .chain(genes.iter().map(|g| (*g, NodeKind::Gene))),
            )?;

            report.node(store.upsert_node(disease, NodeKind::Disease, Attributes::new())?);
            for gene in genes {
                report.node(store.upsert_node(gene, NodeKind::Gene, Attributes::new())?);
                let mut attributes = Attributes::new();
                insert_number(&mut attributes, "p_value", record.p_value);
                insert_number(&mut attributes, "effect", record.effect);
                if let Some(study) = &record.study_accession {
                    attributes.insert("study".to_string(), AttrValue::from(study.as_str()));
                }
                report.edge(store.upsert_edge(disease, gene, Relation::GwasAssociation, attributes)?);
            }
            Ok(())
        });
        settle(outcome, "gwas", report);
    }
}

fn pathway_record(store: &mut GraphStore, record: &PathwayRecord, report: &mut IngestReport) {
    report.processed += 1;
    let outcome = record.validate().and_then(|_| {
        let pathway = record.pathway_id.trim();
        let genes: Vec<&str> = record
            .genes
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect();
        let (interactions, blank): (Vec<(&str, &str)>, Vec<(&str, &str)>) = record
            .interactions
            .iter()
            .map(|i| (i.source.trim(), i.target.trim()))
            .partition(|(source, target)| !source.is_empty() && !target.is_empty());
        check_kinds(
            store,
            std::iter::once((pathway, NodeKind::Pathway))
                .chain(genes.iter().map(|g| (*g, NodeKind::Gene))),
        )?;

        report.node(store.upsert_node_named(
            pathway,
            NodeKind::Pathway,
            record.name.as_deref(),
            Attributes::new(),
        )?);
        for gene in genes {
            report.node(store.upsert_node(gene, NodeKind::Gene, Attributes::new())?);
            report.edge(store.upsert_edge(pathway, gene, Relation::PathwayMembership, Attributes::new())?);
        }
        // Endpoints outside the member list join the graph as genes; endpoints
        // already present keep their kind.
        for (source, target) in interactions {
            for endpoint in [source, target] {
                if !store.has_node(endpoint) {
                    report.node(store.upsert_node(endpoint, NodeKind::Gene, Attributes::new())?);
                }
            }
            report.edge(store.upsert_edge(source, target, Relation::PathwayInteraction, Attributes::new())?);
        }
        for (source, target) in blank {
            warn!(pathway, from = source, to = target, "skipping interaction with blank endpoint");
            report.skipped_edges += 1;
        }
        Ok(())
    });
    settle(outcome, "pathways", report);
}

fn target_record(store: &mut GraphStore, record: &TargetAssociation, report: &mut IngestReport) {
    report.processed += 1;
    let outcome = record.validate().and_then(|_| {
        let disease = record.disease_id.trim();
        let target = record.target_id.trim();
        check_kinds(store, [(disease, NodeKind::Disease), (target, NodeKind::Gene)])?;

        report.node(store.upsert_node_named(
            disease,
            NodeKind::Disease,
            record.disease_name.as_deref(),
            Attributes::new(),
        )?);
        let mut gene_attributes = Attributes::new();
        if let Some(symbol) = &record.target_symbol {
            gene_attributes.insert("symbol".to_string(), AttrValue::from(symbol.as_str()));
        }
        report.node(store.upsert_node_named(
            target,
            NodeKind::Gene,
            record.target_name.as_deref(),
            gene_attributes,
        )?);
        let mut attributes = Attributes::new();
        insert_number(&mut attributes, "score", record.score);
        report.edge(store.upsert_edge(disease, target, Relation::TargetAssociation, attributes)?);
        Ok(())
    });
    settle(outcome, "target_associations", report);
}

/// Rejects the record if any identity would change kind, whether against the
/// graph or against another identity in the same record.
fn check_kinds<'r, I>(store: &GraphStore, wanted: I) -> Result<()>
where
    I: IntoIterator<Item = (&'r str, NodeKind)>,
{
    let mut local: HashMap<&str, NodeKind> = HashMap::new();
    for (id, kind) in wanted {
        let existing = store.kind_of(id).or_else(|| local.get(id).copied());
        if let Some(existing) = existing {
            if existing != kind {
                return Err(GraphError::KindConflict {
                    id: id.to_string(),
                    existing,
                    requested: kind,
                });
            }
        }
        local.insert(id, kind);
    }
    Ok(())
}

fn insert_number(attributes: &mut Attributes, key: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        attributes.insert(key.to_string(), AttrValue::Number(v));
    }
}

fn settle(outcome: Result<()>, source: &str, report: &mut IngestReport) {
    match outcome {
        Ok(()) => report.ingested += 1,
        Err(e) => {
            warn!(source, error = %e, "skipping record");
            report.malformed += 1;
        }
    }
}

fn skip_or_abort(e: GraphError, source: &str, report: &mut IngestReport) -> Result<()> {
    if e.is_record_local() {
        report.processed += 1;
        report.malformed += 1;
        warn!(source, error = %e, "skipping unreadable record");
        Ok(())
    } else {
        warn!(source, error = %e, ingested = report.ingested, "aborting ingestion batch");
        Err(e)
    }
}

fn log_report(source: &str, report: &IngestReport) {
    info!(
        source,
        processed = report.processed,
        ingested = report.ingested,
        filtered = report.filtered,
        malformed = report.malformed,
        nodes_added = report.nodes_added,
        edges_added = report.edges_added,
        "ingestion batch complete"
    );
}
