use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while opening or streaming a record split.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot read records at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed record file {path}: {reason}")]
    Format { path: PathBuf, reason: String },
    #[error("patch shape mismatch: expected {expected:?}, records have {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },
    #[error("record split at {0} is empty")]
    Empty(PathBuf),
    #[error("record feed thread panicked")]
    ProducerPanicked,
}

/// Failures while evaluating or updating the model on a batch.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("batch is empty")]
    EmptyBatch,
    #[error("batch rows have {found} features, model expects {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("batch has {inputs} inputs but {labels} labels")]
    LabelCount { inputs: usize, labels: usize },
    #[error("label {label} out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },
    #[error("dropout rate must lie in [0, 1), got {0}")]
    InvalidDropout(f64),
}

/// Failures while writing or restoring checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint i/o at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("checkpoint encoding at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no checkpoint found at {0}")]
    NotFound(PathBuf),
    #[error("checkpoint at {path} belongs to net {found}, expected {expected}")]
    NetMismatch { path: PathBuf, expected: String, found: String },
    #[error("checkpoint at {path} is tagged epoch {found}, expected {expected}")]
    EpochMismatch { path: PathBuf, expected: usize, found: usize },
}

/// Failures while loading or validating run parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read parameters {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse parameters {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid parameters: {0}")]
    Invalid(String),
}

/// Anything that aborts a training run. End of stream is not an error.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
