//! CLI options.

use std::path::PathBuf;

use clap::{Args, Parser};

pub mod parsers;

#[derive(Parser)]
#[command(version, about, rename_all = "kebab-case")]
pub struct Opts {
    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
pub enum Subcommand {
    Train(TrainOpts),
    Infer(InferOpts),
}

/// Trains the model on a rating set
#[derive(Args)]
pub struct TrainOpts {
    #[command(flatten)]
    pub model: ModelOpts,

    /// Training rating set
    #[arg(long = "train", env = "FUNK_TRAINER_TRAIN_SET")]
    pub train_path: PathBuf,

    /// Validation rating set
    #[arg(long = "valid", env = "FUNK_TRAINER_VALID_SET")]
    pub valid_path: PathBuf,

    /// Number of training epochs
    #[arg(long, default_value = "30")]
    pub n_epochs: usize,

    /// Checkpoint directory
    #[arg(long, default_value = "models", env = "FUNK_TRAINER_MODEL_DIR")]
    pub model_dir: PathBuf,

    /// Directory for the validation RMSE curve
    #[arg(long, default_value = "results", env = "FUNK_TRAINER_RESULTS_DIR")]
    pub results_dir: PathBuf,

    /// Cross-validation fold identifier, used to name the artifacts
    #[arg(long, default_value = "0")]
    pub fold: u32,
}

/// Scores query items against a trained checkpoint
#[derive(Args)]
pub struct InferOpts {
    /// Trained model checkpoint
    #[arg(long = "model")]
    pub model_path: PathBuf,

    /// Training rating set, used for the neighbor adjustment
    #[arg(long = "train", env = "FUNK_TRAINER_TRAIN_SET")]
    pub train_path: PathBuf,

    /// Query set with the candidate items per user
    #[arg(long = "queries")]
    pub query_path: PathBuf,

    /// Item attribute vectors, required when the model blends neighbor scores
    #[arg(long = "attributes")]
    pub attribute_path: Option<PathBuf>,

    /// Output file for the predicted scores
    #[arg(long = "output", default_value = "results/result.txt")]
    pub output_path: PathBuf,
}

/// Model sizing and SGD hyperparameters.
#[derive(Args, Clone)]
pub struct ModelOpts {
    /// User population size
    #[arg(long, value_parser = parsers::non_zero_usize)]
    pub n_users: usize,

    /// Item population size
    #[arg(long, value_parser = parsers::non_zero_usize)]
    pub n_items: usize,

    /// Latent factor count
    #[arg(long, default_value = "100", value_parser = parsers::non_zero_usize)]
    pub n_factors: usize,

    /// Learning rate
    #[arg(long = "lr", default_value = "0.0005")]
    pub learning_rate: f64,

    /// Regularization strength
    #[arg(long = "regularization", default_value = "0.02")]
    pub regularization: f64,

    /// Neighbor count for the blended inference scores, `0` disables blending
    #[arg(long, default_value = "0")]
    pub n_neighbors: usize,
}
