use cardiokg_core::ingest::extractor::{GwasTsvReader, OpenTargetsReader, RecordReader, WikiPathwaysReader};
use cardiokg_core::shared::{merge_outcomes, ConcurrentIngestor, Source, SourceBatch};
use cardiokg_core::{GraphError, GraphQuery, IngestionPipeline, NodeKind, Relation, SharedGraph};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const GWAS: &str = "STUDY ACCESSION\tDISEASE/TRAIT\tMAPPED_GENE\tP-VALUE\tOR or BETA\n\
GCST001\tCoronary Artery Disease\tAPOE, LPA\t1E-8\t1.2\n\
GCST002\tType 2 diabetes\tTCF7L2\t1E-20\t1.4\n";

const PATHWAYS: &str = r#"[{"id": "WP430", "name": "Statin pathway", "elements": [
    {"type": "gene", "name": "LDLR"},
    {"type": "gene", "name": "APOE"},
    {"type": "interaction", "source": "LDLR", "target": "APOE"}
]}]"#;

const OPENTARGETS: &str = r#"[{"data": {"disease": {
    "id": "EFO_0001645", "name": "coronary artery disease",
    "associatedTargets": {"rows": [
        {"target": {"id": "ENSG00000130203", "approvedSymbol": "APOE", "approvedName": "apolipoprotein E"}, "score": 0.81}
    ]}
}}}]"#;

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_sources_ingested_through_single_consumer() {
    let dir = tempdir().unwrap();
    let gwas = write(dir.path(), "gwas.tsv", GWAS);
    let pathways = write(dir.path(), "wikipathways.json", PATHWAYS);
    let targets = write(dir.path(), "opentargets.json", OPENTARGETS);

    let graph = SharedGraph::default();
    let ingestor = ConcurrentIngestor::new(graph.clone(), IngestionPipeline::default());
    let outcomes = ingestor
        .run(vec![
            Source::new("gwas", move || GwasTsvReader::new().read_path(&gwas).map(SourceBatch::Gwas)),
            Source::new("wikipathways", move || {
                WikiPathwaysReader.read_path(&pathways).map(SourceBatch::Pathways)
            }),
            Source::new("opentargets", move || {
                OpenTargetsReader.read_path(&targets).map(SourceBatch::TargetAssociations)
            }),
        ])
        .await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.source.as_str()).collect();
    assert_eq!(names, vec!["gwas", "opentargets", "wikipathways"]);
    let report = merge_outcomes(outcomes).unwrap();
    assert_eq!(report.filtered, 1);
    assert_eq!(report.ingested, 3);

    let store = graph.read();
    // CAD, APOE, LPA, WP430, LDLR, EFO_0001645, ENSG00000130203
    assert_eq!(store.node_count(), 7);
    assert_eq!(store.kind_of("WP430"), Some(NodeKind::Pathway));
    assert!(store.edge("LDLR", "APOE", Relation::PathwayInteraction).is_some());
    assert!(!store.has_node("TCF7L2"));

    let stats = GraphQuery::new(&store).statistics();
    assert_eq!(stats.edge_types[&Relation::GwasAssociation], 2);
    assert_eq!(stats.edge_types[&Relation::PathwayMembership], 2);
    assert_eq!(stats.edge_types[&Relation::TargetAssociation], 1);
}

#[tokio::test]
async fn test_unreadable_source_is_surfaced() {
    let dir = tempdir().unwrap();
    let gwas = write(dir.path(), "gwas.tsv", GWAS);
    let missing = dir.path().join("absent.json");

    let graph = SharedGraph::default();
    let outcomes = ConcurrentIngestor::new(graph.clone(), IngestionPipeline::default())
        .run(vec![
            Source::new("gwas", move || GwasTsvReader::new().read_path(&gwas).map(SourceBatch::Gwas)),
            Source::new("wikipathways", move || {
                WikiPathwaysReader.read_path(&missing).map(SourceBatch::Pathways)
            }),
        ])
        .await;

    assert!(outcomes[0].result.is_ok());
    assert!(matches!(outcomes[1].result, Err(GraphError::Io(_))));
    assert!(merge_outcomes(outcomes).is_err());
    // The healthy source still landed.
    assert_eq!(graph.read().node_count(), 3);
}

#[tokio::test]
async fn test_concurrent_readers_see_consistent_graph() {
    let graph = SharedGraph::default();
    graph.apply(|store| {
        store.upsert_node("APOE", NodeKind::Gene, Default::default()).unwrap();
        store.upsert_node("LPA", NodeKind::Gene, Default::default()).unwrap();
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            tokio::task::spawn_blocking(move || GraphQuery::new(&graph.read()).statistics().total_nodes)
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.await.unwrap(), 2);
    }
}

#[tokio::test]
async fn test_panicking_loader_is_reported() {
    let dir = tempdir().unwrap();
    let gwas = write(dir.path(), "gwas.tsv", GWAS);

    let graph = SharedGraph::default();
    let outcomes = ConcurrentIngestor::new(graph.clone(), IngestionPipeline::default())
        .run(vec![
            Source::new("gwas", move || GwasTsvReader::new().read_path(&gwas).map(SourceBatch::Gwas)),
            Source::new("broken", || -> cardiokg_core::Result<SourceBatch> { panic!("loader blew up") }),
        ])
        .await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.source.as_str()).collect();
    assert_eq!(names, vec!["broken", "gwas"]);
    let err = outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(err.kind(), "source_unreadable");
    assert!(outcomes[1].result.is_ok());
    assert!(merge_outcomes(outcomes).is_err());
    assert_eq!(graph.read().node_count(), 3);
}

#[tokio::test]
async fn test_ingest_merges_reports() {
    let dir = tempdir().unwrap();
    let gwas = write(dir.path(), "gwas.tsv", GWAS);
    let targets = write(dir.path(), "opentargets.json", OPENTARGETS);

    let graph = SharedGraph::default();
    let report = ConcurrentIngestor::new(graph.clone(), IngestionPipeline::default())
        .ingest(vec![
            Source::new("gwas", move || GwasTsvReader::new().read_path(&gwas).map(SourceBatch::Gwas)),
            Source::new("opentargets", move || {
                OpenTargetsReader.read_path(&targets).map(SourceBatch::TargetAssociations)
            }),
        ])
        .await
        .unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.ingested, 2);
    assert_eq!(graph.read().node_count(), 5);
}
