//! Search aggregation across marketplace providers.
//!
//! The [`Aggregator`] sends one query to every registered provider
//! concurrently, waits for all of them, then merges the answers into a
//! single ordered [`ResultSet`]. Provider failures are handled according to
//! the configured [`FailurePolicy`].

pub mod error;

pub use error::{AggregationError, AggregationResult};

use crate::models::{Listing, Marketplace, Query, ResultSet, SourceFailure};
use crate::provider::Provider;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to do when a provider fails during a search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any failing provider fails the whole search.
    #[default]
    AllOrNothing,
    /// Return listings from the providers that answered.
    Partial,
}

/// How merged listings are ordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OrderPolicy {
    /// Stable sort by title.
    #[default]
    Title,
    /// Keep provider registration order.
    Provider,
}

/// Configuration for search aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub failure_policy: FailurePolicy,
    pub order: OrderPolicy,
    /// Drop repeated `(marketplace, id)` pairs, keeping the first.
    pub dedupe: bool,
}

impl AggregatorConfig {
    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sets the ordering policy.
    #[must_use]
    pub fn with_order(mut self, order: OrderPolicy) -> Self {
        self.order = order;
        self
    }

    /// Enables or disables deduplication.
    #[must_use]
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }
}

impl From<&crate::config::SearchConfig> for AggregatorConfig {
    fn from(config: &crate::config::SearchConfig) -> Self {
        Self {
            failure_policy: config.failure_policy,
            order: config.order,
            dedupe: config.dedupe,
        }
    }
}

/// Fans a query out to every provider and merges the results.
pub struct Aggregator {
    providers: Vec<Arc<dyn Provider>>,
    config: AggregatorConfig,
    generation: AtomicU64,
}

impl Aggregator {
    /// Creates an aggregator over `providers`, queried in the given order.
    pub fn new(providers: Vec<Arc<dyn Provider>>, config: AggregatorConfig) -> Self {
        let names: Vec<String> = providers.iter().map(|p| p.name()).collect();
        info!(
            "Aggregating {} providers [{}] (failure policy: {:?}, order: {:?})",
            providers.len(),
            names.join(", "),
            config.failure_policy,
            config.order
        );

        Self {
            providers,
            config,
            generation: AtomicU64::new(0),
        }
    }

    /// Creates an aggregator with the default configuration.
    pub fn with_defaults(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self::new(providers, AggregatorConfig::default())
    }

    /// Marketplaces of the registered providers, in registration order.
    pub fn marketplaces(&self) -> Vec<Marketplace> {
        self.providers
            .iter()
            .map(|p| p.marketplace().clone())
            .collect()
    }

    /// Reserve the generation number for a new search.
    ///
    /// Numbers increase strictly, so a result carrying a lower number than
    /// the latest ticket belongs to a superseded search.
    pub fn ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Generation number of the most recently issued ticket.
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Unfiltered search used to fill the initial view.
    pub async fn populate(&self) -> AggregationResult<ResultSet> {
        self.search(&Query::default()).await
    }

    /// Search all providers under a fresh generation number.
    pub async fn search(&self, query: &Query) -> AggregationResult<ResultSet> {
        let generation = self.ticket();
        self.run(generation, query).await
    }

    /// Search all providers under a previously issued ticket.
    pub async fn run(&self, generation: u64, query: &Query) -> AggregationResult<ResultSet> {
        if self.providers.is_empty() {
            return Err(AggregationError::NoProviders);
        }

        let start = Instant::now();
        info!("Search #{} for {}", generation, query);

        let outcomes = join_all(self.providers.iter().map(|provider| async move {
            (provider.marketplace().clone(), provider.fetch(query).await)
        }))
        .await;

        let mut listings = Vec::new();
        let mut unavailable = Vec::new();

        for (marketplace, outcome) in outcomes {
            match outcome {
                Ok(found) => {
                    let received = found.len();
                    listings.extend(filter_listings(found, query));
                    debug!("{} answered with {} listings", marketplace, received);
                }
                Err(e) => {
                    warn!("{} failed during search #{}: {}", marketplace, generation, e);
                    let failure = SourceFailure {
                        marketplace,
                        reason: e.reason().to_string(),
                    };

                    match self.config.failure_policy {
                        FailurePolicy::AllOrNothing => {
                            return Err(AggregationError::SourceUnavailable {
                                marketplace: failure.marketplace,
                                reason: failure.reason,
                            });
                        }
                        FailurePolicy::Partial => unavailable.push(failure),
                    }
                }
            }
        }

        if unavailable.len() == self.providers.len() {
            return Err(AggregationError::AllSourcesUnavailable {
                sources: unavailable,
            });
        }

        if self.config.dedupe {
            let before = listings.len();
            dedupe_listings(&mut listings);
            if listings.len() < before {
                debug!("Dropped {} duplicate listings", before - listings.len());
            }
        }

        order_listings(&mut listings, self.config.order);

        info!(
            "Search #{} found {} listings in {:.0?}",
            generation,
            listings.len(),
            start.elapsed()
        );

        Ok(ResultSet::new(query.clone(), generation, listings, unavailable))
    }
}

/// Keep only listings that satisfy the query.
pub fn filter_listings(listings: Vec<Listing>, query: &Query) -> Vec<Listing> {
    listings.into_iter().filter(|l| query.matches(l)).collect()
}

/// Order listings in place. Title order is stable: ties keep their
/// concatenation order.
pub fn order_listings(listings: &mut [Listing], order: OrderPolicy) {
    match order {
        OrderPolicy::Title => listings.sort_by(|a, b| a.title.cmp(&b.title)),
        OrderPolicy::Provider => {}
    }
}

/// Remove repeated `(marketplace, id)` pairs, keeping the first occurrence.
pub fn dedupe_listings(listings: &mut Vec<Listing>) {
    let mut seen: HashSet<(Marketplace, String)> = HashSet::new();
    listings.retain(|l| seen.insert((l.marketplace.clone(), l.id.clone())));
}
