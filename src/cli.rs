//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::aggregator::{FailurePolicy, OrderPolicy};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// MarketMerge - one search across every marketplace
///
/// Searches Craigslist, Facebook Marketplace and Nextdoor listings at once
/// and shows the merged results sorted by title.
///
/// Examples:
///   marketmerge
///   marketmerge --keywords bike
///   marketmerge --location "oakland, ca" --format markdown
///   marketmerge --keywords sofa --show nextdoor:3
///   marketmerge --catalog listings.toml --interactive
///   marketmerge --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Keywords matched against listing titles (case-insensitive)
    #[arg(short, long, default_value = "", value_name = "TEXT")]
    pub keywords: String,

    /// Location matched against listing locations (case-insensitive)
    #[arg(short, long, default_value = "", value_name = "TEXT")]
    pub location: String,

    /// Show the detail view of one listing from the results
    ///
    /// Accepts a result number, <marketplace>:<id>, or a bare id when it
    /// is unique across marketplaces.
    #[arg(short, long, value_name = "LISTING")]
    pub show: Option<String>,

    /// Output format (text, markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .marketmerge.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listing catalog (.toml or .json) replacing the built-in sample data
    #[arg(long, value_name = "FILE", env = "MARKETMERGE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Marketplaces to search, in order (comma-separated)
    ///
    /// Example: --marketplaces facebook,craigslist
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub marketplaces: Option<Vec<String>>,

    /// Marketplaces that simulate an outage (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub unavailable: Option<Vec<String>>,

    /// Simulated response delay per marketplace in milliseconds
    #[arg(long, value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// What to do when a marketplace fails to answer
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,

    /// Result ordering (title, provider)
    #[arg(long, value_name = "ORDER")]
    pub order: Option<OrderPolicy>,

    /// Drop listings repeated under the same marketplace and id
    #[arg(long)]
    pub dedupe: bool,

    /// Start an interactive search session
    #[arg(short, long)]
    pub interactive: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .marketmerge.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text cards (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.interactive {
            if self.show.is_some() {
                return Err("--show cannot be combined with --interactive".to_string());
            }
            if self.output.is_some() {
                return Err("--output cannot be combined with --interactive".to_string());
            }
        }

        if let Some(ref show) = self.show {
            if show.trim().is_empty() {
                return Err("--show needs a listing number or id".to_string());
            }
        }

        // Validate catalog file if provided
        if let Some(ref catalog) = self.catalog {
            if !catalog.is_file() {
                return Err(format!("Catalog file does not exist: {}", catalog.display()));
            }
        }

        if let Some(ref names) = self.marketplaces {
            if names.iter().all(|n| n.trim().is_empty()) {
                return Err("--marketplaces needs at least one name".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
