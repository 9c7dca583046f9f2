//! Marketplace providers.
//!
//! A [`Provider`] answers a [`Query`] with listings from a single
//! marketplace. The aggregator talks to providers only through this trait,
//! so an HTTP-backed source can replace the in-memory catalog without
//! touching the search logic.

pub mod catalog;

pub use catalog::{build_providers, Catalog, CatalogError, CatalogProvider};

use crate::models::{Listing, Marketplace, Query};
use async_trait::async_trait;
use thiserror::Error;

/// Error returned by a provider that could not produce listings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The source did not respond or refused the request.
    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },
}

impl ProviderError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Human-readable cause, without the error kind prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Unavailable { reason } => reason,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A source of listings for one marketplace.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Marketplace every listing from this provider is tagged with.
    fn marketplace(&self) -> &Marketplace;

    /// Display name used in logs and error messages.
    fn name(&self) -> String {
        self.marketplace().to_string()
    }

    /// Fetch listings matching the query.
    async fn fetch(&self, query: &Query) -> ProviderResult<Vec<Listing>>;
}
