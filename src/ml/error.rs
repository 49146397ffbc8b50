use crate::data::hierarchy::HierarchyError;
use crate::infra::checkpoint::CheckpointError;

/// Failures while building or running a tree model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("backbone '{0}' cannot featurize; joint models need an embedding")]
    MissingFeaturize(String),

    #[error("final layer expects {expected} input features but the nodes produce {actual}")]
    DimensionMismatch {
        expected: usize,
        actual:   usize,
    },

    #[error("targets have {columns} columns but the model has {heads} heads")]
    TargetMismatch {
        heads:   usize,
        columns: usize,
    },
}
