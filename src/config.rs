//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.marketmerge.toml` files.

use crate::aggregator::{FailurePolicy, OrderPolicy};
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".marketmerge.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Search aggregation settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Provider settings.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Search aggregation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Behaviour when a marketplace fails to answer.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Ordering of merged results.
    #[serde(default)]
    pub order: OrderPolicy,

    /// Drop listings repeated under the same marketplace and id.
    #[serde(default)]
    pub dedupe: bool,
}

/// Marketplace provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Catalog file replacing the built-in sample listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Marketplaces to query, in order. Empty means every catalog marketplace.
    #[serde(default)]
    pub marketplaces: Vec<String>,

    /// Simulated response delay per provider, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Marketplaces that simulate an outage.
    #[serde(default)]
    pub unavailable: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            marketplaces: Vec::new(),
            latency_ms: default_latency_ms(),
            unavailable: Vec::new(),
        }
    }
}

fn default_latency_ms() -> u64 {
    250
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Relative catalog paths are resolved against the config file's directory
        if let Some(ref catalog) = config.providers.catalog {
            if catalog.is_relative() {
                if let Some(dir) = path.parent() {
                    config.providers.catalog = Some(dir.join(catalog));
                }
            }
        }

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(policy) = args.failure_policy {
            self.search.failure_policy = policy;
        }
        if let Some(order) = args.order {
            self.search.order = order;
        }
        if args.dedupe {
            self.search.dedupe = true;
        }

        if let Some(ref catalog) = args.catalog {
            self.providers.catalog = Some(catalog.clone());
        }
        if let Some(ref marketplaces) = args.marketplaces {
            self.providers.marketplaces = marketplaces.clone();
        }
        if let Some(latency) = args.latency_ms {
            self.providers.latency_ms = latency;
        }
        if let Some(ref unavailable) = args.unavailable {
            self.providers.unavailable = unavailable.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.format, OutputFormat::Text);
        assert_eq!(config.search.failure_policy, FailurePolicy::AllOrNothing);
        assert_eq!(config.search.order, OrderPolicy::Title);
        assert!(!config.search.dedupe);
        assert_eq!(config.providers.latency_ms, 250);
        assert!(config.providers.catalog.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
format = "json"

[search]
failure_policy = "partial"
order = "provider"
dedupe = true

[providers]
marketplaces = ["facebook", "nextdoor"]
latency_ms = 0
unavailable = ["nextdoor"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.search.failure_policy, FailurePolicy::Partial);
        assert_eq!(config.search.order, OrderPolicy::Provider);
        assert!(config.search.dedupe);
        assert_eq!(config.providers.marketplaces, vec!["facebook", "nextdoor"]);
        assert_eq!(config.providers.latency_ms, 0);
        assert_eq!(config.providers.unavailable, vec!["nextdoor"]);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[providers]"));
        assert!(toml_str.contains("all-or-nothing"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.providers.latency_ms, 250);
    }

    #[test]
    fn test_load_resolves_catalog_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[providers]\ncatalog = \"listings.json\"").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.providers.catalog,
            Some(dir.path().join("listings.json"))
        );
    }

    #[test]
    fn test_merge_with_args_overrides_only_given_values() {
        let mut config: Config = toml::from_str(
            r#"
[search]
failure_policy = "partial"

[providers]
latency_ms = 10
"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "marketmerge",
            "--order",
            "provider",
            "--unavailable",
            "facebook,nextdoor",
        ]);
        config.merge_with_args(&args);

        assert_eq!(config.search.failure_policy, FailurePolicy::Partial);
        assert_eq!(config.search.order, OrderPolicy::Provider);
        assert_eq!(config.providers.latency_ms, 10);
        assert_eq!(config.providers.unavailable, vec!["facebook", "nextdoor"]);
    }
}
