use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use btc_train::checkpoint::{self, CheckpointStore};
use btc_train::train::{evaluate_stream, train_config::model_dir};
use btc_train::{
    IdxRecordSource, JsonCheckpointStore, Parameters, RecordSource, Session, StopReason,
    TrainConfig, Trainer,
};

#[derive(Parser, Debug)]
#[command(
    name = "btc-train",
    version,
    about = "Train a brain-tumor patch classifier with per-epoch validation and checkpoints."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train for the configured number of epochs, checkpointing each one.
    Train(TrainArgs),
    /// Restore a checkpoint and score it on the validation split.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Parameters file (JSON).
    #[arg(long, default_value = "parameters.json")]
    config: PathBuf,
    /// Network identifier; names the model directory and checkpoint files.
    #[arg(long, default_value = "cnn")]
    net: String,
    /// Root directory for checkpoints.
    #[arg(long, default_value = "models")]
    save_path: PathBuf,
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Epoch to restore; defaults to the latest checkpoint.
    #[arg(long)]
    epoch: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("btc_train=info".parse()?),
        )
        .init();

    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::Evaluate(args) => evaluate(args),
    }
}

fn train(args: TrainArgs) -> Result<()> {
    let RunArgs { config, net, save_path } = args.run;
    let params = Parameters::load(&config)?;

    let mut session = Session::new(
        &params.network,
        &params.optimizer,
        params.patch_len(),
        params.classes_num,
        params.seed,
    );
    let store = JsonCheckpointStore::new(net.clone());
    let trainer = Trainer::new(TrainConfig::new(net, save_path, params))?;

    let report = trainer.run(&mut session, &IdxRecordSource, &store)?;
    drop(session);

    match report.stop_reason {
        StopReason::Completed => println!(
            "Completed {} epochs ({} training steps).",
            report.epochs.len(),
            report.state.train_steps
        ),
        StopReason::Exhausted => println!(
            "Stopped after {} of {} epochs: input exhausted.",
            report.epochs.len(),
            trainer.train_schedule().len()
        ),
    }
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let RunArgs { config, net, save_path } = args.run;
    let params = Parameters::load(&config)?;
    let dir = model_dir(&save_path, &net);

    let epoch = match args.epoch {
        Some(epoch) => epoch,
        None => match checkpoint::latest_epoch(&dir)? {
            Some(epoch) => epoch,
            None => bail!("no checkpoints under {}", dir.display()),
        },
    };

    let store = JsonCheckpointStore::new(net);
    let network = store
        .restore(&checkpoint::epoch_dir(&dir, epoch), epoch)
        .with_context(|| format!("restoring epoch {}", epoch))?;
    if network.input_size() != params.patch_len() {
        bail!(
            "checkpoint expects {} inputs but patch_shape {:?} flattens to {}",
            network.input_size(),
            params.patch_shape,
            params.patch_len()
        );
    }
    let mut session = Session::from_network(network, &params.optimizer, params.seed);

    let mut options = params.stream_options();
    options.num_epochs = 1;
    let mut stream = IdxRecordSource.open(&params.validate_path, &options)?;
    let means = evaluate_stream(&mut session, &mut stream)?;

    match (means.loss, means.accuracy) {
        (Some(loss), Some(accuracy)) => println!(
            "Epoch {}: {} batches, mean loss {:.10}, mean accuracy {:.10}",
            epoch, means.batches, loss, accuracy
        ),
        _ => println!("Epoch {}: validation split produced no full batch", epoch),
    }
    Ok(())
}
