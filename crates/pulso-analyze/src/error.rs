use pulso_core::ParseError;
use pulso_model::ModelError;
use thiserror::Error;

/// Why an analysis run (or one of its batches) failed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("model call for batch {batch} failed: {source}")]
    ModelInvocation {
        batch: usize,
        ids: Vec<String>,
        source: ModelError,
    },

    #[error("batch {batch}: {source}")]
    Parse { batch: usize, source: ParseError },

    #[error("model returned no category for '{id}'")]
    MissingCategory { id: String },
}

impl AnalysisError {
    /// Batch index the error belongs to, if any.
    pub fn batch(&self) -> Option<usize> {
        match self {
            AnalysisError::ModelInvocation { batch, .. } | AnalysisError::Parse { batch, .. } => {
                Some(*batch)
            }
            AnalysisError::MissingCategory { .. } => None,
        }
    }
}
