pub mod store;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CheckpointError;
use crate::network::network::Network;

pub use store::JsonCheckpointStore;

const EPOCH_DIR_PREFIX: &str = "epoch-";

/// Durable storage for model parameters, keyed by epoch number.
pub trait CheckpointStore {
    /// Persists `network` into `dir` (which already exists) tagged with
    /// `epoch`. Returns the path of the written checkpoint.
    fn save(&self, network: &Network, dir: &Path, epoch: usize) -> Result<PathBuf, CheckpointError>;

    /// Restores the parameters saved into `dir` for `epoch`.
    fn restore(&self, dir: &Path, epoch: usize) -> Result<Network, CheckpointError>;
}

/// `{model_dir}/epoch-{epoch}`
pub fn epoch_dir(model_dir: &Path, epoch: usize) -> PathBuf {
    model_dir.join(format!("{}{}", EPOCH_DIR_PREFIX, epoch))
}

/// Removes `dir` recursively if it exists, then creates it empty.
pub fn prepare_epoch_dir(dir: &Path) -> Result<(), CheckpointError> {
    let io_err = |source| CheckpointError::Io { path: dir.to_path_buf(), source };
    if dir.is_dir() {
        fs::remove_dir_all(dir).map_err(io_err)?;
    }
    fs::create_dir_all(dir).map_err(io_err)
}

/// Highest `N` among the `epoch-N` directories under `model_dir`, if any.
pub fn latest_epoch(model_dir: &Path) -> Result<Option<usize>, CheckpointError> {
    let io_err = |source| CheckpointError::Io { path: model_dir.to_path_buf(), source };
    if !model_dir.is_dir() {
        return Ok(None);
    }
    let mut latest = None;
    for entry in fs::read_dir(model_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.path().is_dir() {
            continue;
        }
        let epoch = entry.file_name()
            .to_str()
            .and_then(|name| name.strip_prefix(EPOCH_DIR_PREFIX))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(n) = epoch {
            latest = latest.max(Some(n));
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_dir_naming() {
        assert_eq!(epoch_dir(Path::new("models/cnn"), 3), PathBuf::from("models/cnn/epoch-3"));
    }

    #[test]
    fn prepare_discards_previous_contents() {
        let root = tempfile::tempdir().unwrap();
        let dir = epoch_dir(root.path(), 1);
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("stale.json"), "old").unwrap();
        prepare_epoch_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn latest_epoch_ignores_unrelated_entries() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(latest_epoch(root.path()).unwrap(), None);
        for n in [1, 10, 2] {
            fs::create_dir_all(epoch_dir(root.path(), n)).unwrap();
        }
        fs::create_dir_all(root.path().join("epoch-x")).unwrap();
        fs::write(root.path().join("epoch-99"), "not a dir").unwrap();
        assert_eq!(latest_epoch(root.path()).unwrap(), Some(10));
    }
}
