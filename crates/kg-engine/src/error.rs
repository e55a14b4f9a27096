use crate::model::NodeKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("edge {source_id} -- {target_id} references missing node {missing}")]
    DanglingReference {
        source_id: String,
        target_id: String,
        missing: String,
    },

    #[error("node {id} already exists as {existing}, cannot re-insert as {requested}")]
    KindConflict {
        id: String,
        existing: NodeKind,
        requested: NodeKind,
    },

    #[error("unsupported centrality: {0}")]
    UnsupportedCentrality(String),

    #[error("{algorithm} centrality did not converge within {iterations} iterations")]
    ConvergenceError {
        algorithm: &'static str,
        iterations: usize,
    },

    #[error("snapshot format error: {0}")]
    SnapshotFormat(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The input batch as a whole could not be read.
    #[error("source unreadable: {0}")]
    Source(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Stable code for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphError::NodeNotFound(_) => "node_not_found",
            GraphError::DanglingReference { .. } => "dangling_reference",
            GraphError::KindConflict { .. } => "kind_conflict",
            GraphError::UnsupportedCentrality(_) => "unsupported_centrality",
            GraphError::ConvergenceError { .. } => "convergence_error",
            GraphError::SnapshotFormat(_) => "snapshot_format_error",
            GraphError::MalformedRecord(_) => "malformed_record",
            GraphError::Source(_) => "source_unreadable",
            GraphError::Io(_) => "io",
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        GraphError::MalformedRecord(message.into())
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        GraphError::SnapshotFormat(message.into())
    }

    /// Errors that only invalidate a single record rather than the batch.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            GraphError::MalformedRecord(_) | GraphError::KindConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(GraphError::NodeNotFound("APOE".into()).kind(), "node_not_found");
        assert_eq!(GraphError::snapshot("bad").kind(), "snapshot_format_error");
        let io = GraphError::from(std::io::Error::other("disk"));
        assert_eq!(io.kind(), "io");
        assert!(!io.is_record_local());
        assert!(GraphError::malformed("blank id").is_record_local());
    }

    #[test]
    fn test_error_messages() {
        let err = GraphError::KindConflict {
            id: "APOE".into(),
            existing: NodeKind::Gene,
            requested: NodeKind::Disease,
        };
        assert_eq!(
            err.to_string(),
            "node APOE already exists as gene, cannot re-insert as disease"
        );
    }
}
