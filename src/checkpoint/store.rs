use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointStore;
use crate::error::CheckpointError;
use crate::network::network::Network;

#[derive(Serialize)]
struct CheckpointRef<'a> {
    net: &'a str,
    epoch: usize,
    network: &'a Network,
}

#[derive(Deserialize)]
struct CheckpointRecord {
    net: String,
    epoch: usize,
    network: Network,
}

/// Writes one pretty-printed JSON file per checkpoint, named
/// `{net}-{epoch}.json` inside the epoch directory.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    net: String,
}

impl JsonCheckpointStore {
    pub fn new(net: impl Into<String>) -> Self {
        JsonCheckpointStore { net: net.into() }
    }

    pub fn file_path(&self, dir: &Path, epoch: usize) -> PathBuf {
        dir.join(format!("{}-{}.json", self.net, epoch))
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn save(&self, network: &Network, dir: &Path, epoch: usize) -> Result<PathBuf, CheckpointError> {
        let path = self.file_path(dir, epoch);
        let file = File::create(&path)
            .map_err(|source| CheckpointError::Io { path: path.clone(), source })?;
        let record = CheckpointRef { net: &self.net, epoch, network };
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &record)
            .map_err(|source| CheckpointError::Json { path: path.clone(), source })?;
        let io_err = |source| CheckpointError::Io { path: path.clone(), source };
        writer.flush().map_err(io_err)?;
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        Ok(path)
    }

    fn restore(&self, dir: &Path, epoch: usize) -> Result<Network, CheckpointError> {
        let path = self.file_path(dir, epoch);
        if !path.is_file() {
            return Err(CheckpointError::NotFound(path));
        }
        let file = File::open(&path)
            .map_err(|source| CheckpointError::Io { path: path.clone(), source })?;
        let record: CheckpointRecord = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| CheckpointError::Json { path: path.clone(), source })?;
        if record.net != self.net {
            return Err(CheckpointError::NetMismatch { path, expected: self.net.clone(), found: record.net });
        }
        if record.epoch != epoch {
            return Err(CheckpointError::EpochMismatch { path, expected: epoch, found: record.epoch });
        }
        Ok(record.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::spec::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn save_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new("cnn");
        let net = NetworkSpec::default().build(4, 3, &mut StdRng::seed_from_u64(8));
        let path = store.save(&net, dir.path(), 2).unwrap();
        assert_eq!(path, dir.path().join("cnn-2.json"));

        let restored = store.restore(dir.path(), 2).unwrap();
        assert_eq!(restored.input_size(), 4);
        assert_eq!(restored.output_size(), 3);
    }

    #[test]
    fn restore_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonCheckpointStore::new("cnn").restore(dir.path(), 1).unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[test]
    fn restore_rejects_checkpoint_of_another_net() {
        let dir = tempfile::tempdir().unwrap();
        let net = NetworkSpec::default().build(4, 2, &mut StdRng::seed_from_u64(1));
        let written = JsonCheckpointStore::new("cnn").save(&net, dir.path(), 1).unwrap();
        std::fs::rename(&written, dir.path().join("rnn-1.json")).unwrap();

        let err = JsonCheckpointStore::new("rnn").restore(dir.path(), 1).unwrap_err();
        assert!(matches!(err, CheckpointError::NetMismatch { ref found, .. } if found == "cnn"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_reports_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new("cnn");
        std::os::unix::fs::symlink("/dev/full", store.file_path(dir.path(), 1)).unwrap();

        let net = NetworkSpec { hidden_layers: vec![2], ..NetworkSpec::default() }
            .build(2, 2, &mut StdRng::seed_from_u64(0));
        let err = store.save(&net, dir.path(), 1).unwrap_err();
        assert!(matches!(err, CheckpointError::Io { .. } | CheckpointError::Json { .. }));
    }
}
