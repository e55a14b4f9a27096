use crate::error::{GraphError, Result};
use crate::store::{GraphStore, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityKind {
    Degree,
    Betweenness,
    Eigenvector,
    #[serde(rename = "pagerank")]
    PageRank,
}

impl CentralityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CentralityKind::Degree => "degree",
            CentralityKind::Betweenness => "betweenness",
            CentralityKind::Eigenvector => "eigenvector",
            CentralityKind::PageRank => "pagerank",
        }
    }
}

impl fmt::Display for CentralityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CentralityKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "degree" => Ok(CentralityKind::Degree),
            "betweenness" => Ok(CentralityKind::Betweenness),
            "eigenvector" => Ok(CentralityKind::Eigenvector),
            "pagerank" | "page_rank" => Ok(CentralityKind::PageRank),
            other => Err(GraphError::UnsupportedCentrality(other.to_string())),
        }
    }
}

/// Parameters for the iterative algorithms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralityOptions {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for CentralityOptions {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

pub fn compute(
    store: &GraphStore,
    kind: CentralityKind,
    options: &CentralityOptions,
) -> Result<BTreeMap<String, f64>> {
    let n = store.node_count();
    if n == 0 {
        return Ok(BTreeMap::new());
    }
    let scores = match kind {
        CentralityKind::Degree => degree(store),
        CentralityKind::Betweenness => betweenness(store),
        CentralityKind::Eigenvector => eigenvector(store, options)?,
        CentralityKind::PageRank => pagerank(store, options)?,
    };
    debug!(%kind, nodes = n, "centrality computed");
    Ok(scores
        .into_iter()
        .enumerate()
        .map(|(idx, score)| (store.node_at(idx as NodeIndex).id.clone(), score))
        .collect())
}

fn neighbors(store: &GraphStore, idx: usize) -> impl Iterator<Item = usize> + '_ {
    store.adjacency(idx as NodeIndex).iter().map(|&n| n as usize)
}

fn degree(store: &GraphStore) -> Vec<f64> {
    let n = store.node_count();
    if n == 1 {
        return vec![1.0];
    }
    let scale = 1.0 / (n - 1) as f64;
    (0..n)
        .map(|idx| store.adjacency(idx as NodeIndex).len() as f64 * scale)
        .collect()
}

/// Brandes' accumulation from every source, unweighted.
fn betweenness(store: &GraphStore) -> Vec<f64> {
    let n = store.node_count();
    let mut cb = vec![0.0; n];

    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[s] = 1.0;
        dist[s] = Some(0);

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or_default();
            for w in neighbors(store, v) {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                cb[w] += delta[w];
            }
        }
    }

    // Every unordered pair was counted from both ends.
    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        cb.iter_mut().for_each(|c| *c *= scale);
    } else {
        cb.iter_mut().for_each(|c| *c = 0.0);
    }
    cb
}

/// Power iteration on `A + I`, rescaled to unit sum on convergence.
fn eigenvector(store: &GraphStore, options: &CentralityOptions) -> Result<Vec<f64>> {
    let n = store.node_count();
    let mut x = vec![1.0 / n as f64; n];

    for _ in 0..options.max_iterations {
        let last = x.clone();
        for (v, &weight) in last.iter().enumerate() {
            for w in neighbors(store, v) {
                x[w] += weight;
            }
        }
        let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        x.iter_mut().for_each(|v| *v /= norm);

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * options.tolerance {
            let total: f64 = x.iter().sum();
            if total > 0.0 {
                x.iter_mut().for_each(|v| *v /= total);
            }
            return Ok(x);
        }
    }
    Err(GraphError::ConvergenceError {
        algorithm: "eigenvector",
        iterations: options.max_iterations,
    })
}

/// Damped random walk; isolated nodes jump uniformly.
fn pagerank(store: &GraphStore, options: &CentralityOptions) -> Result<Vec<f64>> {
    let n = store.node_count();
    let uniform = 1.0 / n as f64;
    let alpha = options.damping;
    let out_degree: Vec<usize> = (0..n)
        .map(|idx| store.adjacency(idx as NodeIndex).len())
        .collect();
    let mut x = vec![uniform; n];

    for _ in 0..options.max_iterations {
        let last = x;
        let dangling: f64 = (0..n).filter(|&v| out_degree[v] == 0).map(|v| last[v]).sum();
        let base = (alpha * dangling + (1.0 - alpha)) * uniform;
        x = vec![base; n];
        for v in 0..n {
            if out_degree[v] == 0 {
                continue;
            }
            let share = alpha * last[v] / out_degree[v] as f64;
            for w in neighbors(store, v) {
                x[w] += share;
            }
        }

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * options.tolerance {
            return Ok(x);
        }
    }
    Err(GraphError::ConvergenceError {
        algorithm: "pagerank",
        iterations: options.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, NodeKind, Relation};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        for id in nodes {
            store.upsert_node(id, NodeKind::Gene, Attributes::new()).unwrap();
        }
        for (a, b) in edges {
            store.upsert_edge(a, b, Relation::PathwayInteraction, Attributes::new()).unwrap();
        }
        store
    }

    fn star() -> GraphStore {
        graph(&["hub", "x", "y", "z"], &[("hub", "x"), ("hub", "y"), ("hub", "z")])
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("PageRank".parse::<CentralityKind>().unwrap(), CentralityKind::PageRank);
        assert_eq!(" degree ".parse::<CentralityKind>().unwrap(), CentralityKind::Degree);
        let err = "closeness".parse::<CentralityKind>().unwrap_err();
        assert_eq!(err.kind(), "unsupported_centrality");
    }

    #[test]
    fn test_degree_centrality() -> Result<()> {
        let scores = compute(&star(), CentralityKind::Degree, &CentralityOptions::default())?;
        assert!(close(scores["hub"], 1.0));
        assert!(close(scores["x"], 1.0 / 3.0));

        let single = graph(&["solo"], &[]);
        let scores = compute(&single, CentralityKind::Degree, &CentralityOptions::default())?;
        assert!(close(scores["solo"], 1.0));
        Ok(())
    }

    #[test]
    fn test_betweenness_path() -> Result<()> {
        let path = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let scores = compute(&path, CentralityKind::Betweenness, &CentralityOptions::default())?;
        assert!(close(scores["b"], 1.0));
        assert!(close(scores["a"], 0.0));

        let scores = compute(&star(), CentralityKind::Betweenness, &CentralityOptions::default())?;
        assert!(close(scores["hub"], 1.0));
        assert!(close(scores["z"], 0.0));
        Ok(())
    }

    #[test]
    fn test_betweenness_split_paths() -> Result<()> {
        // Square a-b-d, a-c-d: b and c each carry half of the a..d paths.
        let square = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let scores = compute(&square, CentralityKind::Betweenness, &CentralityOptions::default())?;
        for id in ["a", "b", "c", "d"] {
            assert!(close(scores[id], 1.0 / 6.0), "{id} = {}", scores[id]);
        }
        Ok(())
    }

    #[test]
    fn test_eigenvector_unit_sum_and_ranking() -> Result<()> {
        let scores = compute(&star(), CentralityKind::Eigenvector, &CentralityOptions::default())?;
        let total: f64 = scores.values().sum();
        assert!(close(total, 1.0));
        assert!(scores["hub"] > scores["x"]);
        assert!(close(scores["x"], scores["y"]));
        Ok(())
    }

    #[test]
    fn test_eigenvector_convergence_error() {
        let options = CentralityOptions {
            max_iterations: 1,
            ..Default::default()
        };
        let err = compute(&star(), CentralityKind::Eigenvector, &options).unwrap_err();
        assert!(matches!(err, GraphError::ConvergenceError { algorithm: "eigenvector", .. }));
    }

    #[test]
    fn test_pagerank_sums_to_one() -> Result<()> {
        let store = graph(&["a", "b", "c", "lonely"], &[("a", "b"), ("b", "c")]);
        let scores = compute(&store, CentralityKind::PageRank, &CentralityOptions::default())?;
        let total: f64 = scores.values().sum();
        assert!(close(total, 1.0));
        assert!(scores["b"] > scores["a"]);
        assert!(close(scores["a"], scores["c"]));
        Ok(())
    }

    #[test]
    fn test_empty_graph_has_no_scores() -> Result<()> {
        let store = GraphStore::new();
        for kind in [
            CentralityKind::Degree,
            CentralityKind::Betweenness,
            CentralityKind::Eigenvector,
            CentralityKind::PageRank,
        ] {
            assert!(compute(&store, kind, &CentralityOptions::default())?.is_empty());
        }
        Ok(())
    }
}
