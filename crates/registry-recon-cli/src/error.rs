//! Errors raised while preparing or writing a batch.

use registry_recon::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line {line}: {reason}")]
    InvalidRow { line: usize, reason: String },

    #[error("Invalid parameter {0:?}: expected key=value")]
    InvalidParam(String),

    #[error("Parameters file must contain a JSON object")]
    InvalidParamsFile,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type CliResult<T> = Result<T, CliError>;
