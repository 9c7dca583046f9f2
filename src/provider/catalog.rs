//! In-memory catalog providers.
//!
//! A [`Catalog`] is a flat list of listings across marketplaces, either the
//! built-in sample set or one loaded from a TOML/JSON file. It is split into
//! one [`CatalogProvider`] per marketplace, each serving an immutable
//! snapshot after a simulated response delay.

use super::{Provider, ProviderError, ProviderResult};
use crate::config::ProvidersConfig;
use crate::models::{Listing, Marketplace, Query};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported catalog format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("listing #{index} is invalid: {reason}")]
    InvalidListing { index: usize, reason: String },
}

/// A set of listings spanning one or more marketplaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub listings: Vec<Listing>,
}

/// JSON catalogs may be a bare array or an object with a `listings` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonCatalog {
    Bare(Vec<Listing>),
    Wrapped(Catalog),
}

impl Catalog {
    /// The three placeholder listings shipped with MarketMerge.
    pub fn sample() -> Self {
        let listings = vec![
            Listing {
                id: "1".to_string(),
                marketplace: Marketplace::Craigslist,
                title: "Vintage Bike".to_string(),
                price: "$120".to_string(),
                image: "https://via.placeholder.com/180?text=Image".to_string(),
                location: "San Francisco, CA".to_string(),
                description: "A classic city vintage bike in good condition.".to_string(),
                link: "https://craigslist.org/vintage-bike".to_string(),
            },
            Listing {
                id: "2".to_string(),
                marketplace: Marketplace::Facebook,
                title: "Coffee Table".to_string(),
                price: "$60".to_string(),
                image: "https://via.placeholder.com/180?text=Image".to_string(),
                location: "Oakland, CA".to_string(),
                description: "Modern wood coffee table. Gently used.".to_string(),
                link: "https://facebook.com/coffee-table".to_string(),
            },
            Listing {
                id: "3".to_string(),
                marketplace: Marketplace::Nextdoor,
                title: "Sofa Couch".to_string(),
                price: "$250".to_string(),
                image: "https://via.placeholder.com/180?text=Image".to_string(),
                location: "Berkeley, CA".to_string(),
                description: "Comfortable 3-seater, pickup only.".to_string(),
                link: "https://nextdoor.com/sofa-couch".to_string(),
            },
        ];

        Self { listings }
    }

    /// Load a catalog file, picking the parser from the file extension.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = match extension.as_str() {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
        };

        let catalog = parsed.map_err(|message| CatalogError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        catalog.validate()?;

        info!(
            "Loaded {} listings from catalog {}",
            catalog.listings.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse a catalog of `[[listings]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Parse a JSON catalog.
    pub fn from_json_str(content: &str) -> Result<Self, String> {
        match serde_json::from_str::<JsonCatalog>(content) {
            Ok(JsonCatalog::Bare(listings)) => Ok(Self { listings }),
            Ok(JsonCatalog::Wrapped(catalog)) => Ok(catalog),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Reject listings that cannot be displayed or selected.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (index, listing) in self.listings.iter().enumerate() {
            let reason = if listing.id.trim().is_empty() {
                "missing id"
            } else if listing.title.trim().is_empty() {
                "missing title"
            } else if listing.marketplace.name().is_empty() {
                "missing marketplace"
            } else {
                continue;
            };

            return Err(CatalogError::InvalidListing {
                index: index + 1,
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    /// Marketplaces present in the catalog, in order of first appearance.
    pub fn marketplaces(&self) -> Vec<Marketplace> {
        let mut seen: Vec<Marketplace> = Vec::new();
        for listing in &self.listings {
            if !seen.contains(&listing.marketplace) {
                seen.push(listing.marketplace.clone());
            }
        }
        seen
    }
}

/// Provider serving one marketplace's slice of a catalog.
#[derive(Debug, Clone)]
pub struct CatalogProvider {
    marketplace: Marketplace,
    listings: Arc<[Listing]>,
    latency: Duration,
    outage: Option<String>,
}

impl CatalogProvider {
    /// Creates a provider over the listings tagged with `marketplace`.
    pub fn new(marketplace: Marketplace, listings: impl IntoIterator<Item = Listing>) -> Self {
        let listings: Vec<Listing> = listings
            .into_iter()
            .filter(|l| l.marketplace == marketplace)
            .collect();

        Self {
            marketplace,
            listings: listings.into(),
            latency: Duration::ZERO,
            outage: None,
        }
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every fetch fail with `reason`.
    pub fn with_outage(mut self, reason: impl Into<String>) -> Self {
        self.outage = Some(reason.into());
        self
    }

    /// Number of listings in the snapshot.
    pub fn len(&self) -> usize {
        self.listings.len()
    }
}

#[async_trait]
impl Provider for CatalogProvider {
    fn marketplace(&self) -> &Marketplace {
        &self.marketplace
    }

    async fn fetch(&self, query: &Query) -> ProviderResult<Vec<Listing>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(ref reason) = self.outage {
            return Err(ProviderError::unavailable(reason.clone()));
        }

        let found: Vec<Listing> = self
            .listings
            .iter()
            .filter(|l| query.matches(l))
            .cloned()
            .collect();

        debug!(
            "{} returned {}/{} listings for {}",
            self.marketplace,
            found.len(),
            self.listings.len(),
            query
        );
        Ok(found)
    }
}

/// Register one provider per selected marketplace, in catalog order unless
/// `config.marketplaces` names an explicit order.
pub fn build_providers(catalog: &Catalog, config: &ProvidersConfig) -> Vec<Arc<dyn Provider>> {
    let available = catalog.marketplaces();

    let mut selected: Vec<Marketplace> = Vec::new();
    if config.marketplaces.is_empty() {
        selected = available.clone();
    } else {
        for name in &config.marketplaces {
            let marketplace = Marketplace::from(name.as_str());
            if !available.contains(&marketplace) {
                warn!("Marketplace '{}' has no listings in the catalog, skipping", name);
            } else if !selected.contains(&marketplace) {
                selected.push(marketplace);
            }
        }
    }

    let unavailable: Vec<Marketplace> = config
        .unavailable
        .iter()
        .map(|name| Marketplace::from(name.as_str()))
        .collect();

    for marketplace in &unavailable {
        if !selected.contains(marketplace) {
            warn!(
                "Marketplace '{}' is marked unavailable but is not registered",
                marketplace.name()
            );
        }
    }

    let latency = Duration::from_millis(config.latency_ms);

    selected
        .into_iter()
        .map(|marketplace| {
            let mut provider = CatalogProvider::new(marketplace.clone(), catalog.listings.clone())
                .with_latency(latency);
            if unavailable.contains(&marketplace) {
                provider = provider.with_outage("simulated outage");
            }
            debug!(
                "Registered provider {} with {} listings",
                marketplace,
                provider.len()
            );
            Arc::new(provider) as Arc<dyn Provider>
        })
        .collect()
}
