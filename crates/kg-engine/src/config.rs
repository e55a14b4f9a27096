use crate::ingest::DiseaseFilter;
use crate::query::CentralityOptions;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DATA_DIR_VAR: &str = "CARDIOKG_DATA_DIR";
pub const SNAPSHOT_VAR: &str = "CARDIOKG_SNAPSHOT";
pub const DISEASE_TERMS_VAR: &str = "CARDIOKG_DISEASE_TERMS";
pub const DAMPING_VAR: &str = "CARDIOKG_PAGERANK_DAMPING";
pub const MAX_ITERATIONS_VAR: &str = "CARDIOKG_MAX_ITERATIONS";
pub const TOLERANCE_VAR: &str = "CARDIOKG_TOLERANCE";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub disease_filter: DiseaseFilter,
    pub centrality: CentralityOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            snapshot_path: data_dir.join("graph.json"),
            data_dir,
            disease_filter: DiseaseFilter::default(),
            centrality: CentralityOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Invalid values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        config.snapshot_path = lookup(SNAPSHOT_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_dir.join("graph.json"));

        if let Some(terms) = lookup(DISEASE_TERMS_VAR) {
            config.disease_filter = DiseaseFilter::new(terms.split(','));
        }

        let damping: Option<f64> = parse_var(&lookup, DAMPING_VAR);
        match damping {
            Some(d) if d > 0.0 && d < 1.0 => config.centrality.damping = d,
            Some(d) => warn!(var = DAMPING_VAR, value = d, "damping must be in (0, 1), keeping default"),
            None => {}
        }
        if let Some(iterations) = parse_var::<usize, _>(&lookup, MAX_ITERATIONS_VAR).filter(|&i| i > 0) {
            config.centrality.max_iterations = iterations;
        }
        if let Some(tolerance) = parse_var::<f64, _>(&lookup, TOLERANCE_VAR).filter(|&t| t > 0.0) {
            config.centrality.tolerance = tolerance;
        }

        config
    }

    pub fn gwas_path(&self) -> PathBuf {
        let processed = self.data_dir.join("processed").join("gwas-catalog-associations.tsv");
        if processed.exists() {
            processed
        } else {
            self.data_dir.join("raw").join("gwas-catalog-associations.tsv")
        }
    }

    pub fn pathways_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("wikipathways.json")
    }

    pub fn opentargets_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("opentargets.json")
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.snapshot_path, PathBuf::from("data/graph.json"));
        assert_eq!(config.centrality, CentralityOptions::default());
        assert!(config.disease_filter.accepts("coronary heart disease"));
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (DATA_DIR_VAR, "/srv/kg"),
            (DISEASE_TERMS_VAR, "diabetes, obesity"),
            (DAMPING_VAR, "0.9"),
            (MAX_ITERATIONS_VAR, "500"),
        ]));
        assert_eq!(config.snapshot_path, PathBuf::from("/srv/kg/graph.json"));
        assert!(config.disease_filter.accepts("Type 2 Diabetes"));
        assert!(!config.disease_filter.accepts("Coronary artery disease"));
        assert_eq!(config.centrality.damping, 0.9);
        assert_eq!(config.centrality.max_iterations, 500);
        assert_eq!(config.opentargets_path(), PathBuf::from("/srv/kg/processed/opentargets.json"));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (DAMPING_VAR, "1.5"),
            (TOLERANCE_VAR, "tiny"),
            (DISEASE_TERMS_VAR, " , "),
        ]));
        assert_eq!(config.centrality, CentralityOptions::default());
        assert_eq!(config.disease_filter, DiseaseFilter::default());
    }
}
