//! Air quality predictor CLI
//!
//! A command-line tool for training and inspecting model bundles,
//! running predictions locally or against a running service, and
//! checking service status.

mod client;
mod commands;
mod output;

use airq_lib::trainer::{DEFAULT_K_NEIGHBORS, DEFAULT_SEED, DEFAULT_TEST_SIZE};
use airq_lib::predictor::{DEFAULT_LEARNING_RATE, DEFAULT_N_ESTIMATORS};
use airq_lib::{Sample, TrainConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, predict, service, train};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Air quality predictor CLI
#[derive(Parser)]
#[command(name = "airq")]
#[command(author, version, about = "CLI for the Air Quality Predictor", long_about = None)]
pub struct Cli {
    /// Service URL (can also be set via AIRQ_API_URL env var)
    #[arg(long, env = "AIRQ_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model bundle from a labeled CSV dataset
    Train {
        /// CSV with air_temperature, CO2, pm2_5, humidity and Air_Quality_Label columns
        #[arg(long, short)]
        data: PathBuf,

        /// Where to write the bundle
        #[arg(long, short, default_value = airq_lib::DEFAULT_BUNDLE_FILE)]
        output: PathBuf,

        /// Also write the evaluation report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Seed for the split and oversampling
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Fraction of each class held out for evaluation
        #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
        test_size: f64,

        /// Boosting rounds
        #[arg(long, default_value_t = DEFAULT_N_ESTIMATORS)]
        estimators: usize,

        /// Boosting learning rate
        #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
        learning_rate: f64,

        /// Neighbours considered when oversampling
        #[arg(long, default_value_t = DEFAULT_K_NEIGHBORS)]
        k_neighbors: usize,
    },

    /// Show what a bundle contains
    Inspect {
        /// Bundle path
        #[arg(long, short, default_value = airq_lib::DEFAULT_BUNDLE_FILE)]
        bundle: PathBuf,
    },

    /// Classify one reading, locally with --bundle or via the service
    Predict {
        /// Air temperature in °C
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,

        /// CO2 concentration in ppm
        #[arg(long)]
        co2: f64,

        /// PM2.5 concentration in µg/m³
        #[arg(long)]
        pm25: f64,

        /// Relative humidity in %
        #[arg(long)]
        humidity: f64,

        /// Predict locally from this bundle instead of calling the service
        #[arg(long, short)]
        bundle: Option<PathBuf>,
    },

    /// Check service health
    Health,

    /// Show service metadata
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Train {
            data,
            output,
            report,
            seed,
            test_size,
            estimators,
            learning_rate,
            k_neighbors,
        } => {
            let config = TrainConfig {
                test_size,
                seed,
                n_estimators: estimators,
                learning_rate,
                k_neighbors,
            };
            train::run(&data, &output, report.as_deref(), config, cli.format)?;
        }
        Commands::Inspect { bundle } => {
            inspect::run(&bundle, cli.format)?;
        }
        Commands::Predict {
            temperature,
            co2,
            pm25,
            humidity,
            bundle,
        } => {
            let sample = Sample::new(temperature, co2, pm25, humidity);
            match bundle {
                Some(path) => predict::local(&path, &sample, cli.format)?,
                None => {
                    let client = client::ApiClient::new(&cli.api_url)?;
                    predict::remote(&client, &sample, cli.format).await?;
                }
            }
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            service::health(&client, cli.format).await?;
        }
        Commands::Info => {
            let client = client::ApiClient::new(&cli.api_url)?;
            service::info(&client, cli.format).await?;
        }
    }

    Ok(())
}
