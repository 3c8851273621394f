use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::network::spec::NetworkSpec;
use crate::optim::OptimizerConfig;
use crate::records::stream::StreamOptions;

/// Run parameters, read from a JSON file.
///
/// The first block of fields is required. `optimizer`, `network` and
/// `seed` fall back to defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub train_path: PathBuf,
    pub validate_path: PathBuf,
    pub classes_num: usize,
    pub patch_shape: Vec<usize>,
    /// Shuffle buffer capacity.
    pub capacity: usize,
    pub min_after_dequeue: usize,
    pub batch_size: usize,
    pub num_epoches: usize,
    /// Number of records in the training split.
    pub train_num: usize,
    /// Number of records in the validation split.
    pub validate_num: usize,

    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub network: NetworkSpec,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Parameters {
    /// Loads and validates a parameters file. Relative split paths are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Parameters, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let mut params: Parameters = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        if let Some(base) = path.parent() {
            params.train_path = base.join(&params.train_path);
            params.validate_path = base.join(&params.validate_path);
        }
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        if self.num_epoches == 0 {
            return invalid("num_epoches must be at least 1".into());
        }
        if self.classes_num < 2 {
            return invalid(format!("classes_num must be at least 2, got {}", self.classes_num));
        }
        if self.classes_num > 256 {
            return invalid(format!("classes_num must fit a u8 label, got {}", self.classes_num));
        }
        if self.patch_shape.is_empty() || self.patch_shape.contains(&0) {
            return invalid(format!("patch_shape must be non-empty with positive dims, got {:?}", self.patch_shape));
        }
        if self.patch_shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d)).is_none() {
            return invalid(format!("patch_shape {:?} overflows the patch length", self.patch_shape));
        }
        if self.min_after_dequeue >= self.capacity {
            return invalid(format!(
                "min_after_dequeue ({}) must be below capacity ({})",
                self.min_after_dequeue, self.capacity
            ));
        }
        let lr = self.optimizer.learning_rate();
        if !(lr.is_finite() && lr > 0.0) {
            return invalid(format!("learning rate must be positive, got {}", lr));
        }
        if self.network.hidden_layers.contains(&0) {
            return invalid("hidden layer widths must be positive".into());
        }
        Ok(())
    }

    /// Flattened length of one patch.
    pub fn patch_len(&self) -> usize {
        self.patch_shape.iter().product()
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            batch_size: self.batch_size,
            num_epochs: self.num_epoches,
            patch_shape: self.patch_shape.clone(),
            capacity: self.capacity,
            min_after_dequeue: self.min_after_dequeue,
            seed: self.seed,
        }
    }
}
