//! Service status commands

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_flag, print_heading, print_json, print_success, print_warning, OutputFormat};

/// Show service health
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("Status:        {}", health.status.green());
            println!("Model loaded:  {}", color_flag(health.model_loaded));
            println!("Scaler loaded: {}", color_flag(health.scaler_loaded));
            println!("Model type:    {}", health.model_type);
            println!();

            if health.model_loaded && health.scaler_loaded {
                print_success("Service is ready to predict");
            } else {
                print_warning("Service is up but has no model; predictions will fail");
            }
        }
    }

    Ok(())
}

/// Show service metadata
pub async fn info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.info().await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            print_heading(&info.name);
            println!("Version:  {}", info.version);
            println!("Model:    {}", info.model);
            println!("Platform: {}", info.platform);
            println!(
                "Accuracy: {}",
                info.accuracy.as_deref().unwrap_or("not reported")
            );
            println!("Features: {}", info.features.join(", "));

            println!();
            println!("{}", "Classes".bold());
            if info.classes.is_empty() {
                print_warning("No classes, the service has no model loaded");
            }
            for (index, label) in info.classes.iter().enumerate() {
                println!("  {} {}", format!("[{}]", index).dimmed(), label);
            }

            println!();
            println!("{}", "Endpoints".bold());
            for (path, description) in &info.endpoints {
                println!("  {:<10} {}", path.cyan(), description);
            }
        }
    }

    Ok(())
}
