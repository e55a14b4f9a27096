//! Read-side queries over a [`GraphStore`].

use crate::error::{GraphError, Result};
use crate::model::{Edge, Node, NodeKind, Relation};
use crate::store::{GraphStore, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::debug;

pub mod centrality;

pub use centrality::{CentralityKind, CentralityOptions};

/// Induced subgraph around a center node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgraph {
    pub center: String,
    pub radius: usize,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Subgraph {
    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_types: BTreeMap<NodeKind, usize>,
    pub edge_types: BTreeMap<Relation, usize>,
}

/// Renderer-facing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEdge {
    pub source: String,
    pub target: String,
    pub relation: Relation,
}

/// Node/edge snapshot for layout engines; carries no attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl GraphView {
    fn from_parts<'a>(
        nodes: impl IntoIterator<Item = &'a Node>,
        edges: impl IntoIterator<Item = &'a Edge>,
    ) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|n| ViewNode {
                    id: n.id.clone(),
                    label: n.display_name().to_string(),
                    kind: n.kind,
                    color: n.kind.color(),
                })
                .collect(),
            edges: edges
                .into_iter()
                .map(|e| ViewEdge {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    relation: e.relation,
                })
                .collect(),
        }
    }
}

impl From<&Subgraph> for GraphView {
    fn from(subgraph: &Subgraph) -> Self {
        GraphView::from_parts(&subgraph.nodes, &subgraph.edges)
    }
}

/// Read-only query handle. Never mutates the store it borrows.
#[derive(Debug, Clone, Copy)]
pub struct GraphQuery<'g> {
    store: &'g GraphStore,
    options: CentralityOptions,
}

impl<'g> GraphQuery<'g> {
    pub fn new(store: &'g GraphStore) -> Self {
        Self {
            store,
            options: CentralityOptions::default(),
        }
    }

    pub fn with_options(store: &'g GraphStore, options: CentralityOptions) -> Self {
        Self { store, options }
    }

    fn require(&self, id: &str) -> Result<NodeIndex> {
        self.store
            .index_of(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// All nodes within `radius` hops of `node_id` and every edge among them.
    pub fn neighborhood(&self, node_id: &str, radius: usize) -> Result<Subgraph> {
        let start = self.require(node_id)?;

        let mut dist: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let d = dist[&current];
            if d == radius {
                continue;
            }
            for &next in self.store.adjacency(current) {
                if !dist.contains_key(&next) {
                    dist.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }

        let members: BTreeSet<NodeIndex> = dist.into_keys().collect();
        let nodes = members
            .iter()
            .map(|&idx| self.store.node_at(idx).clone())
            .collect();
        let edges = if radius == 0 {
            Vec::new()
        } else {
            self.store
                .edge_entries()
                .filter(|(key, _)| members.contains(&key.a) && members.contains(&key.b))
                .map(|(_, edge)| edge.clone())
                .collect()
        };
        debug!(node_id, radius, nodes = members.len(), "neighborhood extracted");

        Ok(Subgraph {
            center: node_id.to_string(),
            radius,
            nodes,
            edges,
        })
    }

    /// Every simple path from `source` to `target` with at most `max_length` edges.
    pub fn simple_paths(&self, source: &str, target: &str, max_length: usize) -> Result<Vec<Vec<String>>> {
        let from = self.require(source)?;
        let to = self.require(target)?;

        if from == to || max_length == 0 {
            return Ok(Vec::new());
        }
        let mut results: Vec<Vec<NodeIndex>> = Vec::new();
        let mut path = vec![from];
        let mut visited = vec![false; self.store.node_count()];
        visited[from as usize] = true;
        self.dfs_paths(from, to, max_length, &mut visited, &mut path, &mut results);

        Ok(results
            .into_iter()
            .map(|p| p.into_iter().map(|idx| self.store.node_at(idx).id.clone()).collect())
            .collect())
    }

    fn dfs_paths(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        max_length: usize,
        visited: &mut [bool],
        path: &mut Vec<NodeIndex>,
        results: &mut Vec<Vec<NodeIndex>>,
    ) {
        for &next in self.store.adjacency(current) {
            if visited[next as usize] {
                continue;
            }
            path.push(next);
            if next == target {
                results.push(path.clone());
            } else if path.len() <= max_length {
                visited[next as usize] = true;
                self.dfs_paths(next, target, max_length, visited, path, results);
                visited[next as usize] = false;
            }
            path.pop();
        }
    }

    /// One shortest path by hop count, `None` if the nodes are disconnected.
    pub fn shortest_path(&self, source: &str, target: &str) -> Result<Option<Vec<String>>> {
        let from = self.require(source)?;
        let to = self.require(target)?;

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen = vec![false; self.store.node_count()];
        seen[from as usize] = true;
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut step = to;
                while let Some(&prev) = parent.get(&step) {
                    path.push(prev);
                    step = prev;
                }
                path.reverse();
                return Ok(Some(
                    path.into_iter()
                        .map(|idx| self.store.node_at(idx).id.clone())
                        .collect(),
                ));
            }
            for &next in self.store.adjacency(current) {
                if !seen[next as usize] {
                    seen[next as usize] = true;
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        Ok(None)
    }

    /// Nodes adjacent to both `a` and `b`, excluding `a` and `b` themselves.
    pub fn common_neighbors(&self, a: &str, b: &str) -> Result<Vec<String>> {
        let ia = self.require(a)?;
        let ib = self.require(b)?;
        let mut common: Vec<String> = self
            .store
            .adjacency(ia)
            .intersection(self.store.adjacency(ib))
            .filter(|&&n| n != ia && n != ib)
            .map(|&n| self.store.node_at(n).id.clone())
            .collect();
        common.sort();
        Ok(common)
    }

    pub fn centrality(&self, kind: CentralityKind) -> Result<BTreeMap<String, f64>> {
        centrality::compute(self.store, kind, &self.options)
    }

    /// Highest scoring nodes first, ties broken by identity.
    pub fn top_central(&self, kind: CentralityKind, k: usize) -> Result<Vec<(String, f64)>> {
        let mut ranked: Vec<(String, f64)> = self.centrality(kind)?.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Counts computed fresh from the store on every call.
    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            total_nodes: self.store.node_count(),
            total_edges: self.store.edge_count(),
            ..Default::default()
        };
        for node in self.store.nodes() {
            *stats.node_types.entry(node.kind).or_insert(0) += 1;
        }
        for edge in self.store.edges() {
            *stats.edge_types.entry(edge.relation).or_insert(0) += 1;
        }
        stats
    }

    pub fn graph_view(&self) -> GraphView {
        GraphView::from_parts(self.store.nodes(), self.store.edges())
    }
}
