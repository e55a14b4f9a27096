//! Normalized record shapes consumed by the ingestion pipeline.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_DISEASE_TERMS: [&str; 4] = ["heart", "cardiac", "cardiovascular", "coronary"];

/// One GWAS Catalog association row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GwasAssociation {
    pub disease_trait: String,
    pub genes: Vec<String>,
    pub p_value: Option<f64>,
    pub effect: Option<f64>,
    pub study_accession: Option<String>,
}

impl GwasAssociation {
    pub fn new(disease_trait: impl Into<String>, genes: Vec<String>) -> Self {
        Self {
            disease_trait: disease_trait.into(),
            genes,
            p_value: None,
            effect: None,
            study_accession: None,
        }
    }

    pub fn with_p_value(mut self, p_value: f64) -> Self {
        self.p_value = Some(p_value);
        self
    }

    pub fn with_effect(mut self, effect: f64) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn with_study(mut self, study: impl Into<String>) -> Self {
        self.study_accession = Some(study.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.disease_trait.trim().is_empty() {
            return Err(GraphError::malformed("GWAS association without disease/trait"));
        }
        Ok(())
    }
}

/// Splits a mapped-gene cell into gene symbols.
///
/// GWAS Catalog separates genes with `,` or `;` and intergenic pairs with
/// ` - `. All three are split on purpose: an intergenic hit such as
/// `LPA - SLC22A3` yields two gene nodes rather than one node named after the
/// pair. Blank entries are dropped after trimming.
pub fn split_gene_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .flat_map(|part| part.split(" - "))
        .map(str::trim)
        .filter(|gene| !gene.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub source: String,
    pub target: String,
}

/// One pathway with its member genes and declared interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwayRecord {
    pub pathway_id: String,
    pub name: Option<String>,
    pub genes: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl PathwayRecord {
    pub fn validate(&self) -> Result<()> {
        if self.pathway_id.trim().is_empty() {
            return Err(GraphError::malformed("pathway record without id"));
        }
        Ok(())
    }
}

/// One target-disease evidence row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAssociation {
    pub disease_id: String,
    pub disease_name: Option<String>,
    pub target_id: String,
    pub target_symbol: Option<String>,
    pub target_name: Option<String>,
    pub score: Option<f64>,
}

impl TargetAssociation {
    pub fn validate(&self) -> Result<()> {
        if self.disease_id.trim().is_empty() {
            return Err(GraphError::malformed("target association without disease id"));
        }
        if self.target_id.trim().is_empty() {
            return Err(GraphError::malformed(format!(
                "target association for {} without target id",
                self.disease_id
            )));
        }
        Ok(())
    }
}

/// Case-insensitive substring filter over disease/trait text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseFilter {
    terms: Vec<String>,
}

impl Default for DiseaseFilter {
    fn default() -> Self {
        Self {
            terms: DEFAULT_DISEASE_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl DiseaseFilter {
    /// Terms are trimmed and lowercased. If none survive, the default
    /// cardiovascular terms apply; use [`DiseaseFilter::accept_all`] to turn
    /// filtering off.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            warn!("no usable disease terms, using defaults");
            return Self::default();
        }
        Self { terms }
    }

    pub fn accept_all() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn accepts(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        self.terms.iter().any(|term| text.contains(term.as_str()))
    }
}
