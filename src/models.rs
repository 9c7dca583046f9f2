//! Data models for marketplace search.
//!
//! This module contains the core data structures shared by the providers,
//! the aggregator and the report renderers: listings, queries and the
//! result sets produced by a search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Marketplace a listing originates from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Marketplace {
    Craigslist,
    Facebook,
    Nextdoor,
    /// Any other source, stored by its lowercase name.
    Other(String),
}

impl Marketplace {
    /// The built-in marketplaces, in registration order.
    pub const BUILTIN: [Marketplace; 3] = [
        Marketplace::Craigslist,
        Marketplace::Facebook,
        Marketplace::Nextdoor,
    ];

    /// Lowercase identifier, as used in config files and selectors.
    pub fn name(&self) -> &str {
        match self {
            Marketplace::Craigslist => "craigslist",
            Marketplace::Facebook => "facebook",
            Marketplace::Nextdoor => "nextdoor",
            Marketplace::Other(name) => name,
        }
    }

    /// Short badge shown next to a listing.
    pub fn badge(&self) -> String {
        match self {
            Marketplace::Craigslist => "C".to_string(),
            Marketplace::Facebook => "F".to_string(),
            Marketplace::Nextdoor => "ND".to_string(),
            Marketplace::Other(name) => name
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_else(|| "?".to_string()),
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => write!(f, "{}{}", first.to_uppercase(), chars.as_str()),
            None => Ok(()),
        }
    }
}

impl From<&str> for Marketplace {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "craigslist" => Marketplace::Craigslist,
            "facebook" | "facebook marketplace" => Marketplace::Facebook,
            "nextdoor" => Marketplace::Nextdoor,
            other => Marketplace::Other(other.to_string()),
        }
    }
}

impl From<String> for Marketplace {
    fn from(s: String) -> Self {
        Marketplace::from(s.as_str())
    }
}

impl From<Marketplace> for String {
    fn from(marketplace: Marketplace) -> Self {
        marketplace.name().to_string()
    }
}

/// A single marketplace item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Identifier, unique within its marketplace.
    pub id: String,
    /// Source marketplace.
    pub marketplace: Marketplace,
    /// Short title of the item.
    pub title: String,
    /// Asking price as displayed by the source (e.g. "$120").
    pub price: String,
    /// Image URL.
    pub image: String,
    /// Free-text location (e.g. "Oakland, CA").
    pub location: String,
    /// Longer description of the item.
    pub description: String,
    /// Link to the original posting.
    pub link: String,
}

impl Listing {
    /// Returns the `marketplace:id` key identifying this listing across sources.
    pub fn key(&self) -> String {
        format!("{}:{}", self.marketplace.name(), self.id)
    }
}

/// Keyword and location filters for a search.
///
/// An empty field places no restriction on the corresponding listing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Matched against listing titles.
    pub keywords: String,
    /// Matched against listing locations.
    pub location: String,
}

impl Query {
    /// Build a query from the inputs as typed. Whitespace is significant.
    pub fn new(keywords: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: location.into(),
        }
    }

    /// Returns true if neither field filters anything.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.location.is_empty()
    }

    /// Case-insensitive substring match on title and location.
    pub fn matches(&self, listing: &Listing) -> bool {
        contains_ignore_case(&listing.title, &self.keywords)
            && contains_ignore_case(&listing.location, &self.location)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.keywords.is_empty(), self.location.is_empty()) {
            (true, true) => write!(f, "all listings"),
            (false, true) => write!(f, "\"{}\"", self.keywords),
            (true, false) => write!(f, "anything in \"{}\"", self.location),
            (false, false) => write!(f, "\"{}\" in \"{}\"", self.keywords, self.location),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A source that could not answer a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub marketplace: Marketplace,
    pub reason: String,
}

/// Counts of listings in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Total number of listings.
    pub total: usize,
    /// Listings per marketplace name.
    pub by_marketplace: BTreeMap<String, usize>,
}

impl ResultSummary {
    /// Creates a summary from a list of listings.
    pub fn from_listings(listings: &[Listing]) -> Self {
        let mut summary = Self {
            total: listings.len(),
            ..Self::default()
        };

        for listing in listings {
            *summary
                .by_marketplace
                .entry(listing.marketplace.name().to_string())
                .or_insert(0) += 1;
        }

        summary
    }
}

/// The merged, filtered and ordered output of one search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    /// Query this result set answers.
    pub query: Query,
    /// Sequence number of the search that produced it.
    pub generation: u64,
    /// When the search completed.
    pub searched_at: DateTime<Utc>,
    /// Matching listings, in display order.
    pub listings: Vec<Listing>,
    /// Listing counts.
    pub summary: ResultSummary,
    /// Sources skipped under the partial failure policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<SourceFailure>,
}

impl ResultSet {
    /// Creates a result set, computing its summary.
    pub fn new(
        query: Query,
        generation: u64,
        listings: Vec<Listing>,
        unavailable: Vec<SourceFailure>,
    ) -> Self {
        let summary = ResultSummary::from_listings(&listings);
        Self {
            query,
            generation,
            searched_at: Utc::now(),
            listings,
            summary,
            unavailable,
        }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Look up a listing by 1-based position, `marketplace:id`, or bare id.
    pub fn select(&self, selector: &str) -> Result<&Listing, SelectError> {
        let selector = selector.trim();

        if let Ok(position) = selector.parse::<usize>() {
            if let Some(listing) = position.checked_sub(1).and_then(|i| self.listings.get(i)) {
                return Ok(listing);
            }
        }

        if let Some((source, id)) = selector.split_once(':') {
            let marketplace = Marketplace::from(source);
            return self
                .listings
                .iter()
                .find(|l| l.marketplace == marketplace && l.id == id)
                .ok_or_else(|| SelectError::NotFound(selector.to_string()));
        }

        let mut matches = self.listings.iter().filter(|l| l.id == selector);
        match (matches.next(), matches.count()) {
            (Some(listing), 0) => Ok(listing),
            (Some(_), others) => Err(SelectError::Ambiguous {
                id: selector.to_string(),
                count: others + 1,
            }),
            (None, _) => Err(SelectError::NotFound(selector.to_string())),
        }
    }
}

/// Failure to pick a single listing out of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no listing matches '{0}'")]
    NotFound(String),

    #[error("id '{id}' is used by {count} marketplaces; use <marketplace>:{id}")]
    Ambiguous { id: String, count: usize },
}
