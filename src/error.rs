//!
//! Error type shared by all fallible operations of the crate
//!
use thiserror::Error;

///
/// Errors returned from model construction, inference, estimation and I/O.
///
#[derive(Debug, Error)]
pub enum HmmError {
    /// sizes of vectors/matrices given to a constructor are inconsistent
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// state index out of `[0, n_states)`
    #[error("invalid state {state} (number of states is {n_states})")]
    InvalidState { state: usize, n_states: usize },

    /// parameters rejected by a distribution or model
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// mixture weights must be non-negative
    #[error("negative weight {weight} at component {index}")]
    NegativeWeight { index: usize, weight: f64 },

    /// number of estimators does not match the number of emission classes
    #[error("expected {expected} estimators but got {actual}")]
    EstimatorCount { expected: usize, actual: usize },

    /// every path of the model has zero probability for the sequence
    #[error("all paths have zero probability")]
    ZeroProbability,

    /// every emission class assigns zero probability to an observation
    #[error("probability is zero for all models on observation {0}")]
    ZeroObservation(f64),

    /// distribution name not found in the registry
    #[error("unknown distribution `{0}`")]
    UnknownDistribution(String),

    /// track has no sequence with this name
    #[error("unknown sequence `{0}`")]
    UnknownSequence(String),

    /// malformed model configuration tree
    #[error("invalid config: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, HmmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let e = HmmError::InvalidState {
            state: 4,
            n_states: 3,
        };
        assert_eq!(e.to_string(), "invalid state 4 (number of states is 3)");
        let e = HmmError::ZeroObservation(2.5);
        assert_eq!(
            e.to_string(),
            "probability is zero for all models on observation 2.5"
        );
        let e: HmmError = serde_json::from_str::<Vec<f64>>("[1,").unwrap_err().into();
        assert!(matches!(e, HmmError::Json(_)));
    }
}
