pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod records;
pub mod checkpoint;
pub mod config;
pub mod session;
pub mod train;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use network::{Network, NetworkSpec};
pub use optim::OptimizerConfig;
pub use records::{Batch, BatchStream, IdxRecordSource, RecordSource, StreamOptions};
pub use checkpoint::{CheckpointStore, JsonCheckpointStore};
pub use config::Parameters;
pub use session::{Model, Session};
pub use train::{StopReason, TrainConfig, Trainer, TrainingReport};
pub use error::{CheckpointError, ConfigError, ModelError, RecordError, TrainError};
