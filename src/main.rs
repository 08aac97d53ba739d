use std::path::PathBuf;

use clap::{Parser, Subcommand};

use softmax_sgd::config::EpochConfig;
use softmax_sgd::io;
use softmax_sgd::matrix::Matrix;
use softmax_sgd::BatchedSoftmaxUpdater;

/// Softmax regression trained one epoch per invocation; the epoch loop and the
/// learning-rate schedule stay with the caller.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an all-zero parameter matrix of shape (n, k)
    Init {
        /// parameter file to create
        #[arg(long)]
        theta: PathBuf,
        /// input dimension
        #[arg(short = 'n', long)]
        features: usize,
        /// number of classes
        #[arg(short = 'k', long)]
        classes: usize,
    },
    /// Run one epoch of mini-batch SGD and store the updated parameters
    Epoch {
        /// design matrix (m, n)
        #[arg(long)]
        x: PathBuf,
        /// labels (m,)
        #[arg(long)]
        y: PathBuf,
        /// parameter matrix (n, k); rewritten in place unless --out is given
        #[arg(long)]
        theta: PathBuf,
        /// learning rate
        #[arg(long, default_value_t = EpochConfig::default().lr)]
        lr: f32,
        /// minibatch size
        #[arg(long, default_value_t = EpochConfig::default().batch)]
        batch: usize,
        /// where to write the updated parameters
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Init { theta, features, classes } => {
            log::info!("init theta ({features}, {classes}) -> {}", theta.display());
            io::save_matrix(&theta, &Matrix::zeros(features, classes))
        }
        Command::Epoch { x, y, theta, lr, batch, out } => {
            let updater = BatchedSoftmaxUpdater::new(EpochConfig::new(lr, batch)?)?;
            let out = out.unwrap_or_else(|| theta.clone());
            io::epoch_files(&updater, &x, &y, &theta, &out)?;
            Ok(())
        }
    }
}
