use std::path::PathBuf;

use serde::{Serialize, Deserialize};

/// Per-epoch summary emitted when an epoch closes.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the trainer
/// sends one `EpochStats` value per completed epoch. Means are `None` when
/// the corresponding segment contained no batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    pub train_loss: Option<f64>,
    pub train_accuracy: Option<f64>,
    pub train_batches: usize,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    pub val_batches: usize,
    /// Directory the checkpoint was written into.
    pub checkpoint_dir: PathBuf,
    /// Wall-clock duration of this epoch, including validation and the
    /// checkpoint write, in milliseconds.
    pub elapsed_ms: u64,
}
