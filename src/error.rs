use crate::models::RunSummary;
use std::fmt;
use thiserror::Error;

/// Pipeline stage in which a fatal error occurred. Reported to the caller so
/// operators can tell a schema problem from a store problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Clean,
    Enrich,
    Persist,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Clean => "clean",
            Stage::Enrich => "enrich",
            Stage::Persist => "persist",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

/// Fatal, run-aborting errors. Row-level problems (bad rating, enrichment
/// failure on a single record) are not errors at this level; they are counted
/// in the [`RunSummary`] and the batch continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required columns entirely missing from the input. Raised before any
    /// row is processed.
    #[error("schema error at stage {stage}: {message}")]
    Schema { stage: Stage, message: String },

    /// Input file unreadable or unparsable at the container level.
    #[error("i/o error at stage {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    /// Store unavailable or batch transaction failed. The batch was rolled
    /// back; the in-memory summary computed up to that point is attached for
    /// diagnostics.
    #[error("persistence error at stage {stage}: {source}")]
    Persistence {
        stage: Stage,
        #[source]
        source: anyhow::Error,
        summary: RunSummary,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Schema { stage, .. } => *stage,
            PipelineError::Io { stage, .. } => *stage,
            PipelineError::Persistence { stage, .. } => *stage,
        }
    }
}

/// Per-row, recoverable failures. A row hitting one of these is excluded (or
/// passed through with null enrichment) and counted; it never aborts a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("rating missing or unparsable")]
    MissingRating,

    #[error("rating {value} outside valid scale {min}..={max}")]
    RatingOutOfRange { value: f64, min: f64, max: f64 },

    #[error("no identity-bearing fields present")]
    MissingIdentity,

    #[error("enrichment failed: {0}")]
    Enrichment(String),
}
