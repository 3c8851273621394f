use std::fs;
use std::time::Instant;

use tracing::{info, warn};

use crate::checkpoint::{self, CheckpointStore};
use crate::error::{CheckpointError, TrainError};
use crate::records::{BatchStream, RecordSource};
use crate::session::Model;
use crate::train::epoch_stats::EpochStats;
use crate::train::metrics::{MetricAccumulator, SegmentMeans};
use crate::train::schedule::EpochSchedule;
use crate::train::train_config::TrainConfig;

/// Dropout rate for every training-split forward pass.
pub const TRAIN_DROPOUT: f64 = 0.5;
/// Dropout rate for every validation-split forward pass.
pub const VALIDATE_DROPOUT: f64 = 0.0;

/// Counters advanced once per iteration by the trainer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub train_steps: usize,
    pub epoch_steps: usize,
    pub validate_steps: usize,
    /// 0-based index of the epoch in progress.
    pub epoch: usize,
}

/// Why the loop ended. Neither is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every scheduled epoch closed.
    Completed,
    /// A record stream ran dry first.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub stop_reason: StopReason,
    pub state: RunState,
    pub epochs: Vec<EpochStats>,
}

/// Drives the train / validate / checkpoint cycle.
pub struct Trainer {
    config: TrainConfig,
    train_schedule: EpochSchedule,
    validate_schedule: EpochSchedule,
}

impl Trainer {
    /// Validates the parameters and precomputes both epoch schedules.
    pub fn new(config: TrainConfig) -> Result<Trainer, TrainError> {
        let p = &config.parameters;
        p.validate()?;
        let train_schedule = EpochSchedule::new(p.num_epoches, p.train_num, p.batch_size);
        let validate_schedule = EpochSchedule::new(p.num_epoches, p.validate_num, p.batch_size);
        Ok(Trainer { config, train_schedule, validate_schedule })
    }

    pub fn train_schedule(&self) -> &EpochSchedule {
        &self.train_schedule
    }

    pub fn validate_schedule(&self) -> &EpochSchedule {
        &self.validate_schedule
    }

    /// Runs until every epoch has closed or a stream is exhausted.
    ///
    /// Both streams are closed before returning, whatever the outcome.
    pub fn run<M, R, C>(&self, model: &mut M, source: &R, store: &C) -> Result<TrainingReport, TrainError>
    where
        M: Model,
        R: RecordSource,
        C: CheckpointStore,
    {
        let model_dir = self.config.model_dir();
        fs::create_dir_all(&model_dir)
            .map_err(|e| CheckpointError::Io { path: model_dir.clone(), source: e })?;

        let p = &self.config.parameters;
        let options = p.stream_options();
        let mut train = source.open(&p.train_path, &options)?;
        let mut validate = match source.open(&p.validate_path, &options) {
            Ok(stream) => stream,
            Err(e) => {
                train.close();
                return Err(e.into());
            }
        };

        info!("Training and validating {} ...", self.config.net);
        let result = self.drive(model, store, &mut train, &mut validate);

        train.close();
        validate.close();

        match &result {
            Ok(report) if report.stop_reason == StopReason::Exhausted => {
                info!("Training has stopped: input exhausted after {} steps.", report.state.train_steps);
            }
            Ok(report) => {
                info!("Training finished: {} epochs, {} steps.", report.epochs.len(), report.state.train_steps);
            }
            Err(e) => warn!("Training aborted: {}", e),
        }
        result
    }

    fn drive<M, C, T, V>(
        &self,
        model: &mut M,
        store: &C,
        train: &mut T,
        validate: &mut V,
    ) -> Result<TrainingReport, TrainError>
    where
        M: Model,
        C: CheckpointStore,
        T: BatchStream,
        V: BatchStream,
    {
        let mut run = Run {
            state: RunState::default(),
            train_metrics: MetricAccumulator::default(),
            epochs: Vec::new(),
            epoch_start: Instant::now(),
        };

        // Epochs scheduled for zero batches close before anything is pulled.
        if !self.close_due_epochs(&mut run, model, store, validate)? {
            return Ok(run.finish(StopReason::Exhausted));
        }

        loop {
            if run.state.epoch >= self.train_schedule.len() {
                return Ok(run.finish(StopReason::Completed));
            }

            let batch = match train.next_batch()? {
                Some(batch) => batch,
                None => return Ok(run.finish(StopReason::Exhausted)),
            };

            let m = model.evaluate(&batch, TRAIN_DROPOUT)?;
            run.train_metrics.push(m);
            run.state.train_steps += 1;
            run.state.epoch_steps += 1;
            info!(
                "[Epoch {}] Train Step {}: Loss: {:.10}, Accuracy: {:.10}",
                run.state.epoch + 1,
                run.state.epoch_steps,
                m.loss,
                m.accuracy
            );

            let validation_fed = self.close_due_epochs(&mut run, model, store, validate)?;

            model.optimizer_step(&batch, TRAIN_DROPOUT)?;

            if !validation_fed {
                return Ok(run.finish(StopReason::Exhausted));
            }
        }
    }

    /// Closes every epoch whose cumulative threshold has been reached.
    /// Returns `false` if the validation stream ran dry.
    fn close_due_epochs<M, C, V>(
        &self,
        run: &mut Run,
        model: &mut M,
        store: &C,
        validate: &mut V,
    ) -> Result<bool, TrainError>
    where
        M: Model,
        C: CheckpointStore,
        V: BatchStream,
    {
        while run.state.epoch < self.train_schedule.len()
            && run.state.train_steps >= self.train_schedule.threshold(run.state.epoch)
        {
            let stats = match self.close_epoch(run, model, store, validate)? {
                Some(stats) => stats,
                None => return Ok(false),
            };
            if let Some(tx) = &self.config.progress_tx {
                let _ = tx.send(stats.clone());
            }
            run.epochs.push(stats);
        }
        Ok(true)
    }

    /// Validation segment, means, checkpoint, then advance. Returns `None`
    /// without checkpointing if validation input runs out.
    fn close_epoch<M, C, V>(
        &self,
        run: &mut Run,
        model: &mut M,
        store: &C,
        validate: &mut V,
    ) -> Result<Option<EpochStats>, TrainError>
    where
        M: Model,
        C: CheckpointStore,
        V: BatchStream,
    {
        let epoch = run.state.epoch;
        let epoch_no = epoch + 1;

        let mut val_metrics = MetricAccumulator::default();
        while run.state.validate_steps < self.validate_schedule.threshold(epoch) {
            let batch = match validate.next_batch()? {
                Some(batch) => batch,
                None => return Ok(None),
            };
            val_metrics.push(model.evaluate(&batch, VALIDATE_DROPOUT)?);
            run.state.validate_steps += 1;
        }

        let train_means = run.train_metrics.take_means();
        let val_means = val_metrics.take_means();
        log_segment(epoch_no, "Train", &train_means);
        log_segment(epoch_no, "Validate", &val_means);

        let ckpt_dir = checkpoint::epoch_dir(&self.config.model_dir(), epoch_no);
        checkpoint::prepare_epoch_dir(&ckpt_dir)?;
        store.save(model.parameters(), &ckpt_dir, epoch_no)?;
        info!("[Epoch {}] Model was saved in: {}", epoch_no, ckpt_dir.display());

        let stats = EpochStats {
            epoch: epoch_no,
            total_epochs: self.train_schedule.len(),
            train_loss: train_means.loss,
            train_accuracy: train_means.accuracy,
            train_batches: train_means.batches,
            val_loss: val_means.loss,
            val_accuracy: val_means.accuracy,
            val_batches: val_means.batches,
            checkpoint_dir: ckpt_dir,
            elapsed_ms: run.epoch_start.elapsed().as_millis() as u64,
        };

        run.state.epoch += 1;
        run.state.epoch_steps = 0;
        run.epoch_start = Instant::now();
        Ok(Some(stats))
    }
}

/// Mutable bookkeeping of one `Trainer::run`.
struct Run {
    state: RunState,
    train_metrics: MetricAccumulator,
    epochs: Vec<EpochStats>,
    epoch_start: Instant,
}

impl Run {
    fn finish(self, stop_reason: StopReason) -> TrainingReport {
        TrainingReport { stop_reason, state: self.state, epochs: self.epochs }
    }
}

fn log_segment(epoch_no: usize, stage: &str, means: &SegmentMeans) {
    match (means.loss, means.accuracy) {
        (Some(loss), Some(accuracy)) => info!(
            "[Epoch {}] {} Stage: Mean Loss: {:.10}, Mean Accuracy: {:.10}",
            epoch_no, stage, loss, accuracy
        ),
        _ => warn!("[Epoch {}] {} Stage: no batches, means n/a", epoch_no, stage),
    }
}

/// Streams `stream` to its end with dropout disabled and reduces the
/// per-batch metrics to means. The stream is closed before returning.
pub fn evaluate_stream<M, S>(model: &mut M, stream: &mut S) -> Result<SegmentMeans, TrainError>
where
    M: Model,
    S: BatchStream,
{
    let mut metrics = MetricAccumulator::default();
    let result = drain_into(model, stream, &mut metrics);
    stream.close();
    result.map(|()| metrics.take_means())
}

fn drain_into<M, S>(model: &mut M, stream: &mut S, metrics: &mut MetricAccumulator) -> Result<(), TrainError>
where
    M: Model,
    S: BatchStream,
{
    while let Some(batch) = stream.next_batch()? {
        metrics.push(model.evaluate(&batch, VALIDATE_DROPOUT)?);
    }
    Ok(())
}
