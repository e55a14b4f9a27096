//! Readers for already-downloaded source files.
//!
//! Each reader yields one `Result` per record: row-level problems come back as
//! `MalformedRecord` items, while a file that cannot be read or decoded as a
//! whole fails the call with `Source` or `Io`.

use crate::error::{GraphError, Result};
use crate::ingest::records::{
    split_gene_list, GwasAssociation, Interaction, PathwayRecord, TargetAssociation,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub trait RecordReader {
    type Record;

    fn read<R: Read>(&self, reader: R) -> Result<Vec<Result<Self::Record>>>;

    fn read_path(&self, path: &Path) -> Result<Vec<Result<Self::Record>>> {
        let file = File::open(path)?;
        self.read(BufReader::new(file))
    }
}

/// GWAS Catalog association export (tab separated, with header).
pub struct GwasTsvReader {
    pub delimiter: u8,
}

impl Default for GwasTsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl GwasTsvReader {
    pub const TRAIT_COLUMN: &'static str = "DISEASE/TRAIT";
    pub const GENE_COLUMN: &'static str = "MAPPED_GENE";
    pub const P_VALUE_COLUMN: &'static str = "P-VALUE";
    pub const EFFECT_COLUMN: &'static str = "OR or BETA";
    pub const STUDY_COLUMN: &'static str = "STUDY ACCESSION";

    pub fn new() -> Self {
        Self { delimiter: b'\t' }
    }
}

impl RecordReader for GwasTsvReader {
    type Record = GwasAssociation;

    fn read<R: Read>(&self, reader: R) -> Result<Vec<Result<GwasAssociation>>> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(source_error)?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let trait_idx = column(Self::TRAIT_COLUMN)
            .ok_or_else(|| GraphError::Source(format!("missing column {}", Self::TRAIT_COLUMN)))?;
        let gene_idx = column(Self::GENE_COLUMN)
            .ok_or_else(|| GraphError::Source(format!("missing column {}", Self::GENE_COLUMN)))?;
        let p_idx = column(Self::P_VALUE_COLUMN);
        let effect_idx = column(Self::EFFECT_COLUMN);
        let study_idx = column(Self::STUDY_COLUMN);

        let mut records = Vec::new();
        for (line, row) in rdr.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(source_error(e)),
                Err(e) => {
                    records.push(Err(GraphError::malformed(format!("row {}: {}", line + 1, e))));
                    continue;
                }
            };
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            };

            let Some(disease) = cell(Some(trait_idx)) else {
                records.push(Err(GraphError::malformed(format!(
                    "row {}: empty {}",
                    line + 1,
                    Self::TRAIT_COLUMN
                ))));
                continue;
            };
            let genes = cell(Some(gene_idx)).map(split_gene_list).unwrap_or_default();
            records.push(Ok(GwasAssociation {
                disease_trait: disease.to_string(),
                genes,
                p_value: cell(p_idx).and_then(|v| v.parse().ok()),
                effect: cell(effect_idx).and_then(|v| v.parse().ok()),
                study_accession: cell(study_idx).map(str::to_string),
            }));
        }
        Ok(records)
    }
}

#[derive(Deserialize)]
struct RawPathway {
    id: String,
    name: Option<String>,
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    source: Option<String>,
    target: Option<String>,
}

/// WikiPathways JSON export: an array of pathways with typed elements.
#[derive(Default)]
pub struct WikiPathwaysReader;

impl RecordReader for WikiPathwaysReader {
    type Record = PathwayRecord;

    fn read<R: Read>(&self, reader: R) -> Result<Vec<Result<PathwayRecord>>> {
        let entries: Vec<serde_json::Value> = serde_json::from_reader(reader).map_err(source_error)?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let raw: RawPathway = serde_json::from_value(entry)
                    .map_err(|e| GraphError::malformed(format!("pathway: {}", e)))?;
                let mut record = PathwayRecord {
                    pathway_id: raw.id,
                    name: raw.name,
                    genes: Vec::new(),
                    interactions: Vec::new(),
                };
                for element in raw.elements {
                    match (element.kind.as_str(), element.name, element.source, element.target) {
                        ("gene", Some(name), _, _) => record.genes.push(name),
                        ("interaction", _, Some(source), Some(target)) => {
                            record.interactions.push(Interaction { source, target })
                        }
                        _ => {}
                    }
                }
                Ok(record)
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct OtResponse {
    data: OtData,
}

#[derive(Deserialize)]
struct OtData {
    disease: OtDisease,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtDisease {
    id: String,
    name: Option<String>,
    associated_targets: OtRows,
}

#[derive(Deserialize)]
struct OtRows {
    rows: Vec<OtRow>,
}

#[derive(Deserialize)]
struct OtRow {
    target: OtTarget,
    score: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtTarget {
    id: String,
    approved_symbol: Option<String>,
    approved_name: Option<String>,
}

/// Open Targets GraphQL responses, one per queried disease.
#[derive(Default)]
pub struct OpenTargetsReader;

impl RecordReader for OpenTargetsReader {
    type Record = TargetAssociation;

    fn read<R: Read>(&self, reader: R) -> Result<Vec<Result<TargetAssociation>>> {
        let responses: Vec<serde_json::Value> = serde_json::from_reader(reader).map_err(source_error)?;

        let mut records = Vec::new();
        for response in responses {
            let response: OtResponse = match serde_json::from_value(response) {
                Ok(r) => r,
                Err(e) => {
                    records.push(Err(GraphError::malformed(format!("open targets response: {}", e))));
                    continue;
                }
            };
            let disease = response.data.disease;
            for row in disease.associated_targets.rows {
                records.push(Ok(TargetAssociation {
                    disease_id: disease.id.clone(),
                    disease_name: disease.name.clone(),
                    target_id: row.target.id,
                    target_symbol: row.target.approved_symbol,
                    target_name: row.target.approved_name,
                    score: row.score,
                }));
            }
        }
        Ok(records)
    }
}

fn source_error(e: impl std::fmt::Display) -> GraphError {
    GraphError::Source(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWAS_TSV: &str = "STUDY ACCESSION\tDISEASE/TRAIT\tMAPPED_GENE\tP-VALUE\tOR or BETA\n\
GCST001\tCoronary Artery Disease\tAPOE, LPA\t1E-8\t1.2\n\
GCST002\t\tPCSK9\t2E-9\t\n\
GCST003\tHeart failure\t\t3E-7\tNR\n";

    #[test]
    fn test_gwas_tsv_rows() -> Result<()> {
        let rows = GwasTsvReader::new().read(GWAS_TSV.as_bytes())?;
        assert_eq!(rows.len(), 3);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.disease_trait, "Coronary Artery Disease");
        assert_eq!(first.genes, vec!["APOE", "LPA"]);
        assert_eq!(first.p_value, Some(1e-8));
        assert_eq!(first.effect, Some(1.2));
        assert_eq!(first.study_accession.as_deref(), Some("GCST001"));

        assert!(matches!(rows[1], Err(GraphError::MalformedRecord(_))));

        let third = rows[2].as_ref().unwrap();
        assert!(third.genes.is_empty());
        assert_eq!(third.effect, None);
        Ok(())
    }

    #[test]
    fn test_gwas_tsv_missing_column_is_systemic() {
        let err = GwasTsvReader::new()
            .read("STUDY ACCESSION\tP-VALUE\nGCST001\t1E-8\n".as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), "source_unreadable");
    }

    #[test]
    fn test_wikipathways_elements() -> Result<()> {
        let json = r#"[
            {"id": "WP1", "name": "Cholesterol", "elements": [
                {"type": "gene", "name": "APOE"},
                {"type": "gene", "name": "LDLR"},
                {"type": "interaction", "source": "APOE", "target": "LDLR"},
                {"type": "label", "name": "ignored"}
            ]},
            {"name": "no id"}
        ]"#;
        let records = WikiPathwaysReader.read(json.as_bytes())?;
        let wp1 = records[0].as_ref().unwrap();
        assert_eq!(wp1.genes, vec!["APOE", "LDLR"]);
        assert_eq!(wp1.interactions.len(), 1);
        assert!(records[1].is_err());
        Ok(())
    }

    #[test]
    fn test_open_targets_rows() -> Result<()> {
        let json = r#"[{"data": {"disease": {
            "id": "EFO_0001645", "name": "coronary artery disease",
            "associatedTargets": {"rows": [
                {"target": {"id": "ENSG00000130203", "approvedSymbol": "APOE", "approvedName": "apolipoprotein E"}, "score": 0.8},
                {"target": {"id": "ENSG00000198670", "approvedSymbol": "LPA"}, "score": 0.7}
            ]}
        }}}, {"errors": []}]"#;
        let records = OpenTargetsReader.read(json.as_bytes())?;
        assert_eq!(records.len(), 3);
        let apoe = records[0].as_ref().unwrap();
        assert_eq!(apoe.disease_id, "EFO_0001645");
        assert_eq!(apoe.target_symbol.as_deref(), Some("APOE"));
        assert_eq!(records[1].as_ref().unwrap().target_name, None);
        assert!(records[2].is_err());
        Ok(())
    }

    #[test]
    fn test_unreadable_json_is_systemic() {
        let err = OpenTargetsReader.read("{not json".as_bytes()).unwrap_err();
        assert!(!err.is_record_local());
    }
}
