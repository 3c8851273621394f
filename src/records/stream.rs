use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::error::RecordError;
use crate::math::matrix::Matrix;
use crate::records::batch::Batch;
use crate::records::idx::{self, Split};
use crate::records::shuffle::ShuffleQueue;
use crate::records::{BatchStream, RecordSource};

/// Batches the feed thread may run ahead of the consumer.
const PREFETCH_BATCHES: usize = 4;

/// How a split is streamed: batch size, number of passes, expected patch
/// shape and shuffle-buffer bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    pub batch_size: usize,
    pub num_epochs: usize,
    pub patch_shape: Vec<usize>,
    pub capacity: usize,
    pub min_after_dequeue: usize,
    /// Seed for the shuffle buffer; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// Pull-based batch stream fed by a background thread.
///
/// The thread walks the split `num_epochs` times, mixes records through a
/// `ShuffleQueue` and sends full batches over a bounded channel; a trailing
/// partial batch is dropped. When it runs out the channel disconnects and
/// `next_batch` reports end of stream.
pub struct RecordStream {
    rx: Option<Receiver<Batch>>,
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    path: PathBuf,
}

impl RecordStream {
    /// Starts feeding `split` according to `options`.
    pub fn spawn(split: Split, options: &StreamOptions, path: PathBuf) -> RecordStream {
        let (tx, rx) = mpsc::sync_channel(PREFETCH_BATCHES);
        let stop = Arc::new(AtomicBool::new(false));
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let queue = ShuffleQueue::new(options.capacity, options.min_after_dequeue, rng);
        let feeder = Feeder {
            split,
            queue,
            batch_size: options.batch_size,
            num_epochs: options.num_epochs,
            pending: Vec::with_capacity(options.batch_size),
            tx,
            stop: Arc::clone(&stop),
        };
        let handle = thread::spawn(move || feeder.run());
        RecordStream { rx: Some(rx), handle: Some(handle), stop, path }
    }

    fn join_feeder(&mut self) -> Result<(), RecordError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| RecordError::ProducerPanicked),
            None => Ok(()),
        }
    }
}

impl BatchStream for RecordStream {
    fn next_batch(&mut self) -> Result<Option<Batch>, RecordError> {
        let rx = match &self.rx {
            Some(rx) => rx,
            None => return Ok(None),
        };
        match rx.recv() {
            Ok(batch) => Ok(Some(batch)),
            Err(_) => {
                self.rx = None;
                self.join_feeder()?;
                debug!("record stream {} exhausted", self.path.display());
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        if self.rx.is_none() && self.handle.is_none() {
            return;
        }
        self.stop.store(true, Ordering::Relaxed);
        // Dropping the receiver unblocks a feeder waiting on a full channel.
        self.rx = None;
        if let Err(e) = self.join_feeder() {
            warn!("closing record stream {}: {}", self.path.display(), e);
        }
        debug!("record stream {} closed", self.path.display());
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// State owned by the feed thread.
struct Feeder {
    split: Split,
    queue: ShuffleQueue<usize, StdRng>,
    batch_size: usize,
    num_epochs: usize,
    pending: Vec<usize>,
    tx: SyncSender<Batch>,
    stop: Arc<AtomicBool>,
}

impl Feeder {
    fn run(mut self) {
        for _ in 0..self.num_epochs {
            for index in 0..self.split.len() {
                if self.stop.load(Ordering::Relaxed) {
                    return;
                }
                if self.queue.is_full() && !self.drain() {
                    return;
                }
                self.queue.push(index);
            }
        }
        self.queue.close();
        self.drain();
    }

    /// Moves every dequeuable record into batches. Returns `false` once the
    /// consumer has gone away.
    fn drain(&mut self) -> bool {
        while let Some(index) = self.queue.pop() {
            self.pending.push(index);
            if self.pending.len() == self.batch_size && !self.send_pending() {
                return false;
            }
        }
        true
    }

    fn send_pending(&mut self) -> bool {
        let rows = self.pending.iter().map(|&i| self.split.patches[i].clone()).collect();
        let labels = self.pending.iter().map(|&i| self.split.labels[i]).collect();
        self.pending.clear();
        self.tx.send(Batch::new(Matrix::from_data(rows), labels)).is_ok()
    }
}

/// Record source reading IDX split directories from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdxRecordSource;

impl RecordSource for IdxRecordSource {
    type Stream = RecordStream;

    fn open(&self, split_path: &Path, options: &StreamOptions) -> Result<RecordStream, RecordError> {
        let split = idx::load_split(split_path)?;
        if split.patch_shape != options.patch_shape {
            return Err(RecordError::ShapeMismatch {
                expected: options.patch_shape.clone(),
                found: split.patch_shape,
            });
        }
        if split.is_empty() {
            return Err(RecordError::Empty(split_path.to_path_buf()));
        }
        debug!(
            "opened {} ({} records, patch {:?})",
            split_path.display(),
            split.len(),
            split.patch_shape
        );
        Ok(RecordStream::spawn(split, options, split_path.to_path_buf()))
    }
}
