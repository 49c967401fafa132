//! Model training command

use airq_lib::predictor::StandardScaler;
use airq_lib::trainer::{EvaluationReport, TrainingSummary};
use airq_lib::{
    PredictorService, Sample, ServiceIdentity, TrainConfig, Trainer, DATASET_COLUMNS,
};
use anyhow::{Context, Result};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_confidence, format_percent, print_heading, print_info, print_json, print_success,
    print_table, OutputFormat,
};

/// Reading used to check a freshly written bundle end to end
const SMOKE_SAMPLE: Sample = Sample {
    temperature: 26.5,
    co2: 450.0,
    pm25: 35.0,
    humidity: 65.0,
};

#[derive(Tabled)]
struct EncodingRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Label")]
    label: String,
}

#[derive(Tabled)]
struct DistributionRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Before")]
    before: usize,
    #[tabled(rename = "After SMOTE")]
    after: usize,
}

#[derive(Tabled)]
struct ScalerRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std")]
    std: String,
}

#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1: String,
    #[tabled(rename = "Support")]
    support: usize,
}

/// Train, save, reload and smoke-test a bundle
pub fn run(
    data: &Path,
    output: &Path,
    report_path: Option<&Path>,
    config: TrainConfig,
    format: OutputFormat,
) -> Result<()> {
    let outcome = Trainer::new(config)
        .train_from_csv(data)
        .with_context(|| format!("Training on {} failed", data.display()))?;

    outcome
        .bundle
        .save(output)
        .with_context(|| format!("Failed to write bundle to {}", output.display()))?;

    if let Some(path) = report_path {
        let body = json!({
            "summary": &outcome.summary,
            "report": &outcome.report,
            "service_accuracy": outcome.report.accuracy_percent(),
        });
        std::fs::write(path, serde_json::to_vec_pretty(&body)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    // Reload from disk so the check covers serialization too
    let service = PredictorService::load(output, ServiceIdentity::default());
    if !service.is_ready() {
        anyhow::bail!("Bundle written to {} could not be loaded back", output.display());
    }
    let smoke = service
        .predict(&SMOKE_SAMPLE)
        .context("Smoke prediction against the saved bundle failed")?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "bundle": output,
            "summary": outcome.summary,
            "scaler": outcome.bundle.scaler(),
            "report": outcome.report,
            "smoke_prediction": smoke,
            "service_accuracy": outcome.report.accuracy_percent(),
        }))?,
        OutputFormat::Table => {
            print_encoding(outcome.bundle.classes().classes());
            print_distribution(&outcome.summary);
            print_scaler(outcome.bundle.scaler());
            print_report(&outcome.report);

            print_heading("Smoke Test");
            println!(
                "Input {:?} -> {} ({})",
                SMOKE_SAMPLE.to_features(),
                smoke.label,
                color_confidence(smoke.confidence)
            );
            println!();

            print_success(&format!("Bundle saved to {}", output.display()));
            if let Some(path) = report_path {
                print_info(&format!("Report saved to {}", path.display()));
            }
            print_info(&format!(
                "Serve with AIRQ_ACCURACY={} to report this accuracy",
                outcome.report.accuracy_percent()
            ));
        }
    }

    Ok(())
}

fn print_encoding(classes: &[String]) {
    print_heading("Label Encoding");
    print_table(
        classes
            .iter()
            .enumerate()
            .map(|(index, label)| EncodingRow {
                index,
                label: label.clone(),
            })
            .collect(),
    );
}

fn print_distribution(summary: &TrainingSummary) {
    print_heading("Class Distribution (training split)");
    let labels: BTreeSet<&String> = summary
        .class_counts_before_oversampling
        .keys()
        .chain(summary.class_counts_after_oversampling.keys())
        .collect();

    print_table(
        labels
            .into_iter()
            .map(|label| DistributionRow {
                label: label.clone(),
                before: summary
                    .class_counts_before_oversampling
                    .get(label)
                    .copied()
                    .unwrap_or(0),
                after: summary
                    .class_counts_after_oversampling
                    .get(label)
                    .copied()
                    .unwrap_or(0),
            })
            .collect(),
    );
    println!(
        "Rows: {} total, {} train, {} held out",
        summary.rows, summary.train_rows, summary.test_rows
    );
}

fn print_scaler(scaler: &StandardScaler) {
    print_heading("Scaler Parameters");
    print_table(
        DATASET_COLUMNS
            .iter()
            .zip(scaler.mean().iter().zip(scaler.std()))
            .map(|(feature, (mean, std))| ScalerRow {
                feature: feature.to_string(),
                mean: format!("{:.4}", mean),
                std: format!("{:.4}", std),
            })
            .collect(),
    );
}

fn print_report(report: &EvaluationReport) {
    print_heading("Held-out Evaluation");
    println!("Accuracy:  {:.4}", report.accuracy);
    println!("Precision: {:.4}", report.weighted.precision);
    println!("Recall:    {:.4}", report.weighted.recall);
    println!("F1-Score:  {:.4}", report.weighted.f1);
    println!();

    print_table(
        report
            .classes
            .iter()
            .map(|c| ClassRow {
                label: c.label.clone(),
                precision: format_percent(c.precision),
                recall: format_percent(c.recall),
                f1: format_percent(c.f1),
                support: c.support,
            })
            .collect(),
    );
    println!(
        "Macro avg: precision {:.4}, recall {:.4}, f1 {:.4}",
        report.macro_avg.precision, report.macro_avg.recall, report.macro_avg.f1
    );
}
