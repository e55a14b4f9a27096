use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed category of a graph vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Gene,
    Disease,
    Pathway,
    Drug,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Gene,
        NodeKind::Disease,
        NodeKind::Pathway,
        NodeKind::Drug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Gene => "gene",
            NodeKind::Disease => "disease",
            NodeKind::Pathway => "pathway",
            NodeKind::Drug => "drug",
        }
    }

    /// Presentation color handed to renderers.
    pub fn color(&self) -> &'static str {
        match self {
            NodeKind::Gene => "#2ecc71",
            NodeKind::Disease => "#e74c3c",
            NodeKind::Pathway => "#3498db",
            NodeKind::Drug => "#9b59b6",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed category of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    GwasAssociation,
    PathwayMembership,
    PathwayInteraction,
    TargetAssociation,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::GwasAssociation => "gwas_association",
            Relation::PathwayMembership => "pathway_membership",
            Relation::PathwayInteraction => "pathway_interaction",
            Relation::TargetAssociation => "target_association",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar attribute value. Presentation data only, never graph structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Builds an attribute bag from `(key, value)` pairs.
pub fn attrs<K, V, I>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Overwrites existing keys, adds new ones.
pub(crate) fn merge_attributes(into: &mut Attributes, from: Attributes) {
    for (key, value) in from {
        into.insert(key, value);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub attributes: Attributes,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            attributes: Attributes::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Undirected edge. `source <= target` lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relation: Relation,
    pub attributes: Attributes,
}

impl Edge {
    pub fn new(a: &str, b: &str, relation: Relation) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source: source.to_string(),
            target: target.to_string(),
            relation,
            attributes: Attributes::new(),
        }
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_endpoints_normalized() {
        let e1 = Edge::new("LPA", "APOE", Relation::GwasAssociation);
        let e2 = Edge::new("APOE", "LPA", Relation::GwasAssociation);
        assert_eq!(e1, e2);
        assert_eq!(e1.source, "APOE");
        assert!(e1.connects("LPA", "APOE"));
    }

    #[test]
    fn test_merge_overwrites_and_adds() {
        let mut bag = attrs([("a", 1.0)]);
        merge_attributes(&mut bag, attrs([("a", 2.0), ("b", 3.0)]));
        assert_eq!(bag["a"], AttrValue::Number(2.0));
        assert_eq!(bag["b"].as_number(), Some(3.0));
    }

    #[test]
    fn test_display_name_defaults_to_id() {
        let mut node = Node::new("EFO_0001645", NodeKind::Disease);
        assert_eq!(node.display_name(), "EFO_0001645");
        node.name = Some("coronary artery disease".into());
        assert_eq!(node.display_name(), "coronary artery disease");
        assert_eq!(node.kind.color(), "#e74c3c");
    }
}
