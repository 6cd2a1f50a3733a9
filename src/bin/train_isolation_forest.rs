//! Train the isolation forest on normal transactions, write
//! isolation_forest.json, scaler.json and features.txt, then report anomaly
//! score statistics over the full labeled dataset.

use std::path::PathBuf;

use clap::Parser;
use fds_ml_service::artifacts::ArtifactPaths;
use fds_ml_service::engine::IsolationForestParams;
use fds_ml_service::training::{self, DatasetSpec, ScoreSummary};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "train_isolation_forest", about = "Train the isolation forest anomaly model")]
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

    #[arg(long, default_value_t = 100)]
    n_estimators: usize,

    /// Rows per tree (default: min(256, n_samples))
    #[arg(long)]
    max_samples: Option<usize>,

    #[arg(long, default_value_t = 0.01)]
    contamination: f64,

    #[arg(long, default_value_t = 42)]
    random_state: u64,
}

fn log_summary(label: &str, summary: Option<&ScoreSummary>) {
    match summary {
        Some(s) => tracing::info!("{} scores: {}", label, s),
        None => tracing::info!("{} scores: no rows", label),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fds_ml_service=info,train_isolation_forest=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let spec = DatasetSpec {
        label_column: args.label_column,
        normal_label: args.normal_label,
        features: args.features.unwrap_or_else(training::default_feature_columns),
    };
    let params = IsolationForestParams {
        n_estimators: args.n_estimators,
        max_samples: args.max_samples,
        contamination: args.contamination,
        random_state: args.random_state,
    };
    let paths = ArtifactPaths::new(&args.model_dir);

    let report = training::isolation_forest::run(&args.csv, &paths, &spec, &params)?;

    tracing::info!(
        "Trained on {} of {} rows",
        report.normal_rows,
        report.total_rows
    );
    log_summary("Fraud", report.validation.anomalous.as_ref());
    log_summary("Normal", report.validation.normal.as_ref());
    tracing::info!("✅ Isolation forest artifacts written to {}", paths.dir().display());

    Ok(())
}
