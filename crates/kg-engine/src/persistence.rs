use crate::error::{GraphError, Result};
use crate::model::{AttrValue, Attributes, NodeKind, Relation};
use crate::store::GraphStore;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Pretty printed, self-describing JSON.
    Json,
    /// Compact bincode.
    Bincode,
}

impl SnapshotFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => SnapshotFormat::Bincode,
            _ => SnapshotFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub relation: Relation,
    pub attributes: Attributes,
}

/// On-disk form of a whole graph. Nodes are kept in insertion order so a
/// reloaded graph traverses exactly like the one that was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub format_version: u32,
    pub created_at: String,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphSnapshot {
    pub fn capture(store: &GraphStore) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            nodes: store
                .nodes()
                .map(|n| NodeRecord {
                    id: n.id.clone(),
                    kind: n.kind,
                    name: n.name.clone(),
                    attributes: n.attributes.clone(),
                })
                .collect(),
            edges: store
                .edges()
                .map(|e| EdgeRecord {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    relation: e.relation,
                    attributes: e.attributes.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a fresh store. Fails without side effects on any inconsistency.
    pub fn restore(self) -> Result<GraphStore> {
        if self.format_version != FORMAT_VERSION {
            return Err(GraphError::snapshot(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        let mut store = GraphStore::new();
        for node in self.nodes {
            let created = store
                .upsert_node_named(&node.id, node.kind, node.name.as_deref(), node.attributes)
                .map_err(|e| GraphError::snapshot(e.to_string()))?;
            if !created {
                return Err(GraphError::snapshot(format!("duplicate node {}", node.id)));
            }
        }
        for edge in self.edges {
            let created = store
                .upsert_edge(&edge.source, &edge.target, edge.relation, edge.attributes)
                .map_err(|e| GraphError::snapshot(e.to_string()))?;
            if !created {
                return Err(GraphError::snapshot(format!(
                    "duplicate {} edge {} -- {}",
                    edge.relation, edge.source, edge.target
                )));
            }
        }
        Ok(store)
    }

    /// Writes next to `path` and renames over it, so a failed save leaves any
    /// previous snapshot in place.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.check_numbers()?;
        let staging = staging_path(path);
        let written = self
            .write_to(&staging, SnapshotFormat::for_path(path))
            .and_then(|_| fs::rename(&staging, path).map_err(GraphError::from));
        if written.is_err() {
            let _ = fs::remove_file(&staging);
        }
        written
    }

    fn write_to(&self, path: &Path, format: SnapshotFormat) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            SnapshotFormat::Json => serde_json::to_writer_pretty(&mut writer, self)
                .map_err(|e| GraphError::snapshot(e.to_string()))?,
            SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, self)
                .map_err(|e| GraphError::snapshot(e.to_string()))?,
        }
        writer.flush()?;
        Ok(())
    }

    /// NaN and infinities have no JSON form and would not load back.
    fn check_numbers(&self) -> Result<()> {
        let owners = self
            .nodes
            .iter()
            .map(|n| (n.id.clone(), &n.attributes))
            .chain(self.edges.iter().map(|e| {
                (format!("{} edge {} -- {}", e.relation, e.source, e.target), &e.attributes)
            }));
        for (owner, attributes) in owners {
            for (key, value) in attributes {
                if let AttrValue::Number(v) = value {
                    if !v.is_finite() {
                        return Err(GraphError::snapshot(format!(
                            "attribute {key} of {owner} is not a finite number ({v})"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot = match SnapshotFormat::for_path(path) {
            SnapshotFormat::Json => serde_json::from_reader(reader)
                .map_err(|e| GraphError::snapshot(e.to_string()))?,
            SnapshotFormat::Bincode => bincode::deserialize_from(reader)
                .map_err(|e| GraphError::snapshot(e.to_string()))?,
        };
        Ok(snapshot)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the whole graph to `path`; `.bin` selects bincode, anything else JSON.
pub fn save(store: &GraphStore, path: &Path) -> Result<()> {
    GraphSnapshot::capture(store).save_to_file(path)?;
    info!(
        path = %path.display(),
        nodes = store.node_count(),
        edges = store.edge_count(),
        "graph saved"
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<GraphStore> {
    let store = GraphSnapshot::load_from_file(path)?.restore()?;
    info!(
        path = %path.display(),
        nodes = store.node_count(),
        edges = store.edge_count(),
        "graph loaded"
    );
    Ok(store)
}
