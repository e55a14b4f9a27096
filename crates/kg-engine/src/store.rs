use crate::error::{GraphError, Result};
use crate::model::{merge_attributes, Attributes, Edge, Node, NodeKind, Relation};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Dense node index assigned in insertion order.
pub type NodeIndex = u32;

/// Normalized edge key: `(min index, max index, relation)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub a: NodeIndex,
    pub b: NodeIndex,
    pub relation: Relation,
}

impl EdgeKey {
    fn new(x: NodeIndex, y: NodeIndex, relation: Relation) -> Self {
        Self {
            a: x.min(y),
            b: x.max(y),
            relation,
        }
    }
}

/// In-memory typed graph: node table, undirected adjacency and edge table.
///
/// Node identities are interned to dense indices so the query algorithms can
/// work on plain vectors. Neighbor sets are ordered by index, which makes
/// every traversal deterministic for a given insertion history.
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    nodes: Vec<Node>,
    id_to_index: HashMap<String, NodeIndex>,
    /// Adjacency list: NodeIndex -> distinct neighbors, any relation
    adj: Vec<BTreeSet<NodeIndex>>,
    edges: BTreeMap<EdgeKey, Edge>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the node or merges `attributes` into the existing one.
    /// Returns `true` when the node was created.
    pub fn upsert_node(&mut self, id: &str, kind: NodeKind, attributes: Attributes) -> Result<bool> {
        self.upsert_node_named(id, kind, None, attributes)
    }

    /// Like [`upsert_node`](Self::upsert_node), also setting the display name when given.
    pub fn upsert_node_named(
        &mut self,
        id: &str,
        kind: NodeKind,
        name: Option<&str>,
        attributes: Attributes,
    ) -> Result<bool> {
        if let Some(&idx) = self.id_to_index.get(id) {
            let node = &mut self.nodes[idx as usize];
            if node.kind != kind {
                return Err(GraphError::KindConflict {
                    id: id.to_string(),
                    existing: node.kind,
                    requested: kind,
                });
            }
            if let Some(name) = name {
                node.name = Some(name.to_string());
            }
            merge_attributes(&mut node.attributes, attributes);
            return Ok(false);
        }

        let idx = self.nodes.len() as NodeIndex;
        let mut node = Node::new(id, kind);
        node.name = name.map(str::to_string);
        node.attributes = attributes;
        self.nodes.push(node);
        self.adj.push(BTreeSet::new());
        self.id_to_index.insert(id.to_string(), idx);
        Ok(true)
    }

    /// Inserts the edge or merges `attributes` into the existing edge with the
    /// same endpoints and relation. Both endpoints must already exist.
    /// Returns `true` when the edge was created.
    pub fn upsert_edge(&mut self, a: &str, b: &str, relation: Relation, attributes: Attributes) -> Result<bool> {
        let dangling = |missing: &str| GraphError::DanglingReference {
            source_id: a.to_string(),
            target_id: b.to_string(),
            missing: missing.to_string(),
        };
        let ia = self.index_of(a).ok_or_else(|| dangling(a))?;
        let ib = self.index_of(b).ok_or_else(|| dangling(b))?;

        let key = EdgeKey::new(ia, ib, relation);
        if let Some(edge) = self.edges.get_mut(&key) {
            merge_attributes(&mut edge.attributes, attributes);
            return Ok(false);
        }

        let mut edge = Edge::new(a, b, relation);
        edge.attributes = attributes;
        self.edges.insert(key, edge);
        // Self-loops are kept as edges but are not adjacency.
        if ia != ib {
            self.adj[ia as usize].insert(ib);
            self.adj[ib as usize].insert(ia);
        }
        Ok(true)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.nodes[idx as usize])
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    pub fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    /// Distinct adjacent identities regardless of relation. Empty for unknown ids.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        match self.index_of(id) {
            Some(idx) => self.adj[idx as usize]
                .iter()
                .map(|&n| self.nodes[n as usize].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of distinct neighbors. Parallel edges and self-loops do not count twice.
    pub fn degree(&self, id: &str) -> usize {
        self.index_of(id)
            .map(|idx| self.adj[idx as usize].len())
            .unwrap_or(0)
    }

    pub fn edge(&self, a: &str, b: &str, relation: Relation) -> Option<&Edge> {
        let key = EdgeKey::new(self.index_of(a)?, self.index_of(b)?, relation);
        self.edges.get(&key)
    }

    /// All edges joining `a` and `b`, one per relation.
    pub fn edges_between(&self, a: &str, b: &str) -> Vec<&Edge> {
        let (Some(ia), Some(ib)) = (self.index_of(a), self.index_of(b)) else {
            return Vec::new();
        };
        let lo = EdgeKey::new(ia, ib, Relation::GwasAssociation);
        let hi = EdgeKey::new(ia, ib, Relation::TargetAssociation);
        self.edges.range(lo..=hi).map(|(_, e)| e).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx as usize]
    }

    pub(crate) fn adjacency(&self, idx: NodeIndex) -> &BTreeSet<NodeIndex> {
        &self.adj[idx as usize]
    }

    pub(crate) fn edge_entries(&self) -> impl Iterator<Item = (&EdgeKey, &Edge)> + '_ {
        self.edges.iter()
    }
}
