pub mod controller;
pub mod epoch_stats;
pub mod metrics;
pub mod schedule;
pub mod train_config;

pub use controller::{evaluate_stream, RunState, StopReason, Trainer, TrainingReport};
pub use epoch_stats::EpochStats;
pub use metrics::{MetricAccumulator, SegmentMeans, StepMetrics};
pub use schedule::{epoch_iters, EpochSchedule};
pub use train_config::TrainConfig;
