use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or advancing a VOF case.
#[derive(Debug, Error)]
pub enum VoFError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot find required field {name} in {}", path.display())]
    MissingField { name: String, path: PathBuf },

    #[error("Size of {name} is {found}, expected {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown patch: {0}")]
    UnknownPatch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No cached momentum matrix: {0} must follow the momentum predictor")]
    MissingMomentumMatrix(String),

    #[error("Non-finite value in field {0}")]
    NonFinite(String),

    #[error("Continuity error cannot be removed by adjusting the outflow: {0}")]
    Continuity(String),

    #[error("Logger initialisation failed: {0}")]
    Logger(#[from] log::SetLoggerError),
}
