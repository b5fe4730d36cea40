pub mod experiment;
pub mod features;
pub mod ranking;
pub mod recommendation;

use thiserror::Error;

use self::experiment::ExpGroup;

/// Errors produced inside the recommendation pipeline.
///
/// `UserNotFound` is recoverable (the orchestrator turns it into an empty
/// result); everything else aborts the request.
#[derive(Debug, Error)]
pub enum RecsError {
    #[error("user {0} not found in user feature table")]
    UserNotFound(i64),

    #[error("missing feature columns for group {group}: {columns:?}")]
    MissingFeatureColumns {
        group: ExpGroup,
        columns: Vec<String>,
    },

    #[error("unknown experiment group: {0}")]
    UnknownGroup(String),

    #[error("model inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, RecsError>;
