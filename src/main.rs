//! MarketMerge - one search across every marketplace
//!
//! A CLI that sends a keyword/location query to several marketplace
//! listing sources at once and shows the merged, title-sorted results.
//!
//! Exit codes:
//!   0 - Success (including searches with no matching listings)
//!   1 - Runtime error (bad config, unreadable catalog, etc.)
//!   2 - Search failed because a marketplace was unavailable

use anyhow::{Context, Result};
use marketmerge::aggregator::{Aggregator, AggregatorConfig};
use marketmerge::cli::{Args, OutputFormat};
use marketmerge::config::{Config, DEFAULT_CONFIG_FILE};
use marketmerge::provider::{self, Catalog};
use marketmerge::session::{DisplayState, SearchSession};
use marketmerge::{interactive, report};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("MarketMerge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("MarketMerge failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .marketmerge.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .marketmerge.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .marketmerge.toml")?;

    println!("✅ Created .marketmerge.toml with default settings.");
    println!("   Edit it to choose marketplaces, ordering and the failure policy.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so that results on stdout can be piped.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run a search (or an interactive session). Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let catalog = match config.providers.catalog {
        Some(ref path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => {
            debug!("No catalog configured, using built-in sample listings");
            Catalog::sample()
        }
    };

    let providers = provider::build_providers(&catalog, &config.providers);
    let aggregator = Arc::new(Aggregator::new(
        providers,
        AggregatorConfig::from(&config.search),
    ));

    if args.interactive {
        interactive::run(aggregator, config.general.format).await?;
        return Ok(0);
    }

    run_search(&args, &aggregator, config.general.format).await
}

/// Run one search and write its results or the selected listing.
async fn run_search(args: &Args, aggregator: &Aggregator, format: OutputFormat) -> Result<i32> {
    let mut session = SearchSession::new();
    session.set_inputs(args.keywords.as_str(), args.location.as_str());
    let query = session.query();

    let generation = aggregator.ticket();
    session.begin(generation);

    let spinner = report::busy_spinner(!args.quiet, format!("Searching {}...", query));
    let outcome = aggregator.run(generation, &query).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let failure_code = match outcome {
        Err(ref e) if e.is_source_failure() => Some(2),
        Err(_) => Some(1),
        Ok(_) => None,
    };
    session.apply(generation, outcome);

    if let DisplayState::Failed(message) = session.state() {
        eprintln!("❌ {}", message);
        return Ok(failure_code.unwrap_or(1));
    }

    let output = match args.show {
        Some(ref selector) => {
            let listing = session
                .select(selector)
                .with_context(|| format!("Cannot show listing '{}'", selector))?;
            report::render_detail(listing, format)?
        }
        None => {
            let results = session
                .results()
                .context("Search finished without results")?;
            if !results.unavailable.is_empty() {
                warn!(
                    "{} marketplace(s) did not answer; showing partial results",
                    results.unavailable.len()
                );
            }
            report::render_results(results, format)?
        }
    };

    write_output(args.output.as_deref(), &output)?;
    Ok(0)
}

/// Write to the output file, or stdout when none is given.
fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            println!("✅ Results saved to: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
