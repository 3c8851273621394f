use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::config::parameters::Parameters;
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `Trainer` run.
///
/// # Fields
/// - `net`         — network identifier; names the model directory and the
///                   checkpoint files
/// - `save_path`   — root output directory; checkpoints land under
///                   `{save_path}/{net}/epoch-{N}`
/// - `parameters`  — data, shuffle and optimisation parameters
/// - `progress_tx` — optional channel sender; one `EpochStats` is sent per
///                   completed epoch. A dropped receiver is ignored.
pub struct TrainConfig {
    pub net: String,
    pub save_path: PathBuf,
    pub parameters: Parameters,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel.
    pub fn new(net: impl Into<String>, save_path: impl Into<PathBuf>, parameters: Parameters) -> Self {
        TrainConfig {
            net: net.into(),
            save_path: save_path.into(),
            parameters,
            progress_tx: None,
        }
    }

    /// `{save_path}/{net}`
    pub fn model_dir(&self) -> PathBuf {
        model_dir(&self.save_path, &self.net)
    }
}

pub fn model_dir(save_path: &Path, net: &str) -> PathBuf {
    save_path.join(net)
}
