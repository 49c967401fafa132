//! Prediction command

use airq_lib::{Prediction, PredictorService, Sample, ServiceIdentity};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_confidence, format_percent, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ProbabilityRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Probability")]
    probability: String,
}

/// Predict from a bundle on disk
pub fn local(bundle: &Path, sample: &Sample, format: OutputFormat) -> Result<()> {
    let service = PredictorService::load(bundle, ServiceIdentity::default());
    if !service.is_ready() {
        anyhow::bail!("Could not load bundle {}", bundle.display());
    }
    let prediction = service
        .predict(sample)
        .context("Prediction failed")?;
    print_prediction(&prediction, format)
}

/// Predict through the running service
pub async fn remote(client: &ApiClient, sample: &Sample, format: OutputFormat) -> Result<()> {
    let prediction = client.predict(sample).await?;
    print_prediction(&prediction, format)
}

fn print_prediction(prediction: &Prediction, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(prediction)?,
        OutputFormat::Table => {
            println!(
                "{} {} (class {}, confidence {})",
                "Prediction:".bold(),
                prediction.label.cyan(),
                prediction.prediction,
                color_confidence(prediction.confidence)
            );

            let mut rows: Vec<(&String, &f64)> = prediction.probabilities.iter().collect();
            rows.sort_by(|a, b| b.1.total_cmp(a.1));
            print_table(
                rows.into_iter()
                    .map(|(label, p)| ProbabilityRow {
                        label: label.clone(),
                        probability: format_percent(*p),
                    })
                    .collect(),
            );
        }
    }
    Ok(())
}
