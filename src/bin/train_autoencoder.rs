//! Train the dense autoencoder on normal transactions and write
//! autoencoder.json, scaler.json and features.txt to the model directory.

use std::path::PathBuf;

use clap::Parser;
use fds_ml_service::artifacts::ArtifactPaths;
use fds_ml_service::training::{self, AutoencoderConfig, DatasetSpec};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "train_autoencoder", about = "Train the autoencoder anomaly model")]
struct Args {
    /// Labeled transactions CSV
    #[arg(long, default_value = "sample_data/creditcard.csv")]
    csv: PathBuf,

    /// Output directory for artifacts
    #[arg(long, env = "MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    #[arg(long, default_value = "Class")]
    label_column: String,

    /// Label value of normal rows; only these are trained on
    #[arg(long, default_value = "0")]
    normal_label: String,

    /// Comma-separated feature columns (default: V1..V28,Amount)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    #[arg(long, default_value_t = 10)]
    epochs: usize,

    #[arg(long, default_value_t = 256)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    learning_rate: f64,

    #[arg(long, default_value_t = 14)]
    latent_dim: usize,

    /// Comma-separated encoder hidden widths
    #[arg(long, value_delimiter = ',', default_value = "20")]
    hidden_dims: Vec<usize>,

    #[arg(long, default_value_t = 0.2)]
    validation_split: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fds_ml_service=info,train_autoencoder=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let spec = DatasetSpec {
        label_column: args.label_column,
        normal_label: args.normal_label,
        features: args.features.unwrap_or_else(training::default_feature_columns),
    };
    let config = AutoencoderConfig {
        hidden_dims: args.hidden_dims,
        latent_dim: args.latent_dim,
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.learning_rate,
        validation_split: args.validation_split,
        seed: args.seed,
    };
    let paths = ArtifactPaths::new(&args.model_dir);

    let report = training::autoencoder::run(&args.csv, &paths, &spec, &config)?;

    tracing::info!(
        "Trained on {} of {} rows",
        report.normal_rows,
        report.total_rows
    );
    if let Some(loss) = report.history.final_loss() {
        tracing::info!("Final loss: {:.6}", loss);
    }
    if let Some(val_loss) = report.history.final_val_loss() {
        tracing::info!("Final val_loss: {:.6}", val_loss);
    }
    tracing::info!("✅ Autoencoder artifacts written to {}", paths.dir().display());

    Ok(())
}
