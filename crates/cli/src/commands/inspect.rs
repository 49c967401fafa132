//! Bundle inspection command

use airq_lib::BundleFile;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use tabled::Tabled;

use crate::output::{print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std")]
    std: String,
}

/// Print bundle metadata, scaler parameters, classes and checksum
pub fn run(path: &Path, format: OutputFormat) -> Result<()> {
    let file = BundleFile::read(path)
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    let bundle = &file.bundle;
    let model = bundle.model();

    match format {
        OutputFormat::Json => print_json(&json!({
            "path": file.path,
            "sha256": file.sha256,
            "format_version": bundle.format_version(),
            "created_at": bundle.created_at(),
            "trainer_version": bundle.trainer_version(),
            "features": bundle.feature_names(),
            "classes": bundle.classes(),
            "scaler": bundle.scaler(),
            "estimators": model.n_estimators(),
            "estimator_weights": model.estimator_weights(),
            "training_config": bundle.training_config(),
        }))?,
        OutputFormat::Table => {
            print_heading("Model Bundle");
            println!("Path:            {}", file.path.display().to_string().cyan());
            println!("SHA-256:         {}", file.sha256);
            println!("Format version:  {}", bundle.format_version());
            println!(
                "Created:         {}",
                bundle.created_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Trainer version: {}", bundle.trainer_version());
            println!("Estimators:      {}", model.n_estimators());

            if let Some(config) = bundle.training_config() {
                println!(
                    "Training:        test_size={} seed={} n_estimators={} learning_rate={} k_neighbors={}",
                    config.test_size,
                    config.seed,
                    config.n_estimators,
                    config.learning_rate,
                    config.k_neighbors
                );
            }

            print_heading("Classes");
            for (index, label) in bundle.classes().classes().iter().enumerate() {
                println!("  {} {}", format!("[{}]", index).dimmed(), label);
            }

            print_heading("Scaler");
            let scaler = bundle.scaler();
            print_table(
                bundle
                    .feature_names()
                    .iter()
                    .zip(scaler.mean().iter().zip(scaler.std()))
                    .map(|(feature, (mean, std))| FeatureRow {
                        feature: feature.clone(),
                        mean: format!("{:.4}", mean),
                        std: format!("{:.4}", std),
                    })
                    .collect(),
            );
        }
    }

    Ok(())
}
