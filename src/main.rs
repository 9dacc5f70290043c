//! CIFAR Active Learning CLI
//!
//! Entry point for the loss-prediction active-learning experiments and the
//! autoencoder pretraining variant.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cifar_al::backend::{backend_name, default_device, TrainingBackend};
use cifar_al::dataset::cifar::{CifarDataset, DatasetKind, CIFAR10_CLASS_NAMES};
use cifar_al::training::{ActiveLearningLoop, ExperimentConfig};
use cifar_al::utils::logging::{init_logging, LogConfig};
use cifar_al::utils::CheckpointStore;
use cifar_al::vae::{pretrain, VaeConfig, VaePretrainConfig};

/// CIFAR Active Learning
///
/// Pool-based active learning for CIFAR image classification: a
/// loss-prediction module ranks the unlabeled pool each cycle and the
/// hardest samples get labeled first.
#[derive(Parser, Debug)]
#[command(name = "cifar_al")]
#[command(version = "0.1.0")]
#[command(about = "Loss-prediction active learning with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the active-learning experiment
    Train {
        /// Dataset to run on (cifar10 or cifar100)
        #[arg(long, default_value = "cifar10")]
        dataset: String,

        /// Directory holding the unpacked CIFAR binaries
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Output directory for accuracy records and selection dumps
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Independent trials with fresh random splits
        #[arg(long, default_value = "3")]
        trials: usize,

        /// Label-acquisition cycles per trial
        #[arg(long, default_value = "10")]
        cycles: usize,

        /// Training epochs per cycle
        #[arg(short, long, default_value = "200")]
        epochs: usize,

        /// Seed labeled-set size
        #[arg(long, default_value = "1000")]
        initial_labeled: usize,

        /// Samples labeled per cycle
        #[arg(short, long, default_value = "1000")]
        budget: usize,

        /// Per-class minimum of new labels per cycle (enables the
        /// class-floor selection policy)
        #[arg(long)]
        per_class_min: Option<usize>,

        /// Mini-batch size (must be even)
        #[arg(long, default_value = "128")]
        batch_size: usize,

        /// Initial learning rate
        #[arg(long, default_value = "0.1")]
        lr: f64,

        /// Epochs at which the learning rate decays
        #[arg(long, value_delimiter = ',', default_value = "160")]
        milestones: Vec<usize>,

        /// Epoch after which ranking gradients stop reaching the backbone
        #[arg(long, default_value = "120")]
        detach_after: usize,

        /// Carry model parameters across cycles instead of retraining
        /// from scratch
        #[arg(long, default_value = "false")]
        warm_start: bool,

        /// Dump proxy-vs-oracle selection comparisons per cycle
        #[arg(long, default_value = "false")]
        oracle_dumps: bool,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Pretrain the variational autoencoder on the full training split
    PretrainVae {
        /// Dataset to pretrain on (cifar10 or cifar100)
        #[arg(long, default_value = "cifar10")]
        dataset: String,

        /// Directory holding the unpacked CIFAR binaries
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory for the best-loss checkpoint
        #[arg(short, long, default_value = "trained/weights")]
        checkpoint_dir: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value = "100")]
        epochs: usize,

        /// Batch size for training
        #[arg(long, default_value = "128")]
        batch_size: usize,

        /// Learning rate
        #[arg(long, default_value = "0.001")]
        lr: f64,

        /// Size of the latent embedding
        #[arg(long, default_value = "64")]
        embedding_dim: usize,
    },

    /// Show dataset statistics
    Stats {
        /// Dataset to inspect (cifar10 or cifar100)
        #[arg(long, default_value = "cifar10")]
        dataset: String,

        /// Directory holding the unpacked CIFAR binaries
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            dataset,
            data_dir,
            output_dir,
            trials,
            cycles,
            epochs,
            initial_labeled,
            budget,
            per_class_min,
            batch_size,
            lr,
            milestones,
            detach_after,
            warm_start,
            oracle_dumps,
            seed,
        } => {
            let config = ExperimentConfig {
                dataset: dataset.parse()?,
                data_dir,
                output_dir,
                trials,
                cycles,
                epochs,
                initial_labeled,
                budget,
                per_class_min,
                batch_size,
                lr,
                milestones,
                detach_after_epoch: detach_after,
                warm_start,
                oracle_dumps,
                seed,
                ..ExperimentConfig::default()
            };
            cmd_train(config)?;
        }

        Commands::PretrainVae {
            dataset,
            data_dir,
            checkpoint_dir,
            epochs,
            batch_size,
            lr,
            embedding_dim,
        } => {
            let kind: DatasetKind = dataset.parse()?;
            cmd_pretrain_vae(kind, &data_dir, &checkpoint_dir, epochs, batch_size, lr, embedding_dim)?;
        }

        Commands::Stats { dataset, data_dir } => {
            let kind: DatasetKind = dataset.parse()?;
            cmd_stats(kind, &data_dir)?;
        }
    }

    Ok(())
}

fn cmd_train(config: ExperimentConfig) -> Result<()> {
    info!(
        "Running {} trials x {} cycles on {} with backend {}",
        config.trials,
        config.cycles,
        config.dataset,
        backend_name()
    );

    let train = CifarDataset::load(&config.data_dir, config.dataset, true)?;
    let test = CifarDataset::load(&config.data_dir, config.dataset, false)?;

    let al = ActiveLearningLoop::<TrainingBackend>::new(config, train, test, default_device())?;
    let results = al.run()?;

    println!("{}", "Experiment finished".green().bold());
    for result in &results {
        let last = result.accuracies.last().copied().unwrap_or(0.0);
        println!(
            "  trial {}: final accuracy {} with {} labeled samples",
            result.trial + 1,
            format!("{:.2}%", last).cyan(),
            result.final_labeled
        );
    }
    Ok(())
}

fn cmd_pretrain_vae(
    kind: DatasetKind,
    data_dir: &PathBuf,
    checkpoint_dir: &PathBuf,
    epochs: usize,
    batch_size: usize,
    lr: f64,
    embedding_dim: usize,
) -> Result<()> {
    info!("Pretraining VAE on {} with backend {}", kind, backend_name());

    let train = CifarDataset::load(data_dir, kind, true)?;
    let test = CifarDataset::load(data_dir, kind, false)?;
    let store = CheckpointStore::new(checkpoint_dir);

    let config = VaePretrainConfig::new(VaeConfig::new().with_embedding_dim(embedding_dim))
        .with_epochs(epochs)
        .with_batch_size(batch_size)
        .with_lr(lr);

    let best = pretrain::<TrainingBackend>(&config, &train, &test, &store, &default_device())?;
    println!(
        "{} best held-out reconstruction loss: {:.3}",
        "Pretraining finished.".green().bold(),
        best
    );
    Ok(())
}

fn cmd_stats(kind: DatasetKind, data_dir: &PathBuf) -> Result<()> {
    let train = CifarDataset::load(data_dir, kind, true)?;
    let test = CifarDataset::load(data_dir, kind, false)?;

    use burn::data::dataset::Dataset;
    println!("{}", format!("{} statistics", kind).cyan().bold());
    println!("  train samples: {}", train.len());
    println!("  test samples:  {}", test.len());
    println!("  classes:       {}", kind.num_classes());

    let distribution = train.class_distribution();
    for (class, count) in distribution.iter().enumerate() {
        let name = match kind {
            DatasetKind::Cifar10 => CIFAR10_CLASS_NAMES[class].to_string(),
            DatasetKind::Cifar100 => format!("class {}", class),
        };
        println!("  {:>12}: {}", name, count);
    }
    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ==========================================================
   CIFAR Active Learning
   Loss-prediction sample selection with Burn + Rust
 ==========================================================
  "#
        .green()
    );
}
