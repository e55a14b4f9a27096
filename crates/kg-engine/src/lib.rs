//! Typed biomedical knowledge graph.
//!
//! Genes, diseases, pathways and drugs are merged from GWAS associations,
//! pathway membership lists and target-disease evidence into one undirected
//! graph, which then answers neighborhood, path, centrality and statistics
//! queries and can be persisted as a snapshot.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod persistence;
pub mod query;
pub mod shared;
pub mod store;

pub use error::{GraphError, Result};
pub use ingest::{DiseaseFilter, IngestReport, IngestionPipeline};
pub use model::{AttrValue, Attributes, Edge, Node, NodeKind, Relation};
pub use query::{CentralityKind, CentralityOptions, GraphQuery, GraphStatistics, GraphView, Subgraph};
pub use shared::SharedGraph;
pub use store::GraphStore;
