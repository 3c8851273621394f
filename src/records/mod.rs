pub mod batch;
pub mod idx;
pub mod shuffle;
pub mod stream;

use std::path::Path;

use crate::error::RecordError;

pub use batch::Batch;
pub use shuffle::ShuffleQueue;
pub use stream::{IdxRecordSource, RecordStream, StreamOptions};

/// A lazily produced sequence of batches for one split.
pub trait BatchStream {
    /// Blocks until the next batch is ready. `Ok(None)` marks end of stream,
    /// which is an ordinary outcome rather than an error.
    fn next_batch(&mut self) -> Result<Option<Batch>, RecordError>;

    /// Stops any background feeding and releases its resources. Must be
    /// safe to call more than once.
    fn close(&mut self);
}

/// Opens batch streams over named splits.
pub trait RecordSource {
    type Stream: BatchStream;

    fn open(&self, split_path: &Path, options: &StreamOptions) -> Result<Self::Stream, RecordError>;
}
