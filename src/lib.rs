//! MarketMerge library.
//!
//! Unified search across marketplace listing sources: providers answer a
//! keyword/location query concurrently and the aggregator merges their
//! listings into one ordered result set.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod interactive;
pub mod models;
pub mod provider;
pub mod report;
pub mod session;

pub use aggregator::{AggregationError, Aggregator, AggregatorConfig, FailurePolicy, OrderPolicy};
pub use models::{Listing, Marketplace, Query, ResultSet};
pub use provider::{Catalog, CatalogProvider, Provider, ProviderError};
pub use session::{DisplayState, SearchSession};
