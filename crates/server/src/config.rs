//! Service configuration

use airq_lib::{ModelBundle, ServiceIdentity};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Listen port; `PORT` takes precedence over `AIRQ_PORT`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bundle location, defaults to next to the executable
    #[serde(default)]
    pub bundle_path: Option<PathBuf>,

    /// Service name reported by `/`
    #[serde(default = "default_name")]
    pub name: String,

    /// Hosting platform reported by `/`
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Held-out accuracy of the deployed bundle, e.g. `96.37%`
    #[serde(default)]
    pub accuracy: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_name() -> String {
    ServiceIdentity::default().name
}

fn default_platform() -> String {
    ServiceIdentity::default().platform
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bundle_path: None,
            name: default_name(),
            platform: default_platform(),
            accuracy: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(std::env::vars().collect())
    }

    /// Load configuration from `AIRQ_*` variables, then apply `PORT`
    pub fn from_env(vars: HashMap<String, String>) -> Result<Self> {
        let port = vars.get("PORT").cloned();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("AIRQ")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .build()
            .context("Failed to read configuration")?;

        let mut service: ServiceConfig = config
            .try_deserialize()
            .context("Invalid service configuration")?;

        if let Some(port) = port {
            service.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }

        Ok(service)
    }

    /// Where to load the bundle from
    pub fn bundle_path(&self) -> PathBuf {
        self.bundle_path
            .clone()
            .unwrap_or_else(ModelBundle::default_path)
    }

    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity {
            name: self.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: self.platform.clone(),
            accuracy: self.accuracy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_env(HashMap::new()).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.bundle_path.is_none());
        assert!(config.accuracy.is_none());
        assert!(config.bundle_path().ends_with(airq_lib::DEFAULT_BUNDLE_FILE));
    }

    #[test]
    fn test_prefixed_variables() {
        let config = ServiceConfig::from_env(vars(&[
            ("AIRQ_PORT", "9000"),
            ("AIRQ_BUNDLE_PATH", "/models/bundle.json"),
            ("AIRQ_PLATFORM", "Google Cloud Run"),
            ("AIRQ_ACCURACY", "96.37%"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.bundle_path(), PathBuf::from("/models/bundle.json"));
        assert_eq!(config.identity().platform, "Google Cloud Run");
        assert_eq!(config.identity().accuracy.as_deref(), Some("96.37%"));
    }

    #[test]
    fn test_port_overrides_prefixed_port() {
        let config =
            ServiceConfig::from_env(vars(&[("AIRQ_PORT", "9000"), ("PORT", "5000")])).unwrap();
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(ServiceConfig::from_env(vars(&[("PORT", "eighty")])).is_err());
    }
}
