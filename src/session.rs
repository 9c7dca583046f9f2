//! Search session state.
//!
//! A [`SearchSession`] holds what a front end needs between searches: the
//! current inputs, whether a search is pending, the last failure, the
//! last applied result set and the listing open in the detail view.
//! Outcomes are applied by generation number so that a slow, superseded
//! search can never overwrite the results of a newer one.

use crate::aggregator::AggregationResult;
use crate::models::{Listing, Query, ResultSet, SelectError};
use tracing::{debug, error};

/// Message shown when a search fails.
pub const GENERIC_ERROR: &str = "Something went wrong while searching. Please try again.";

/// What a front end should display for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// Nothing has been searched yet.
    Idle,
    /// A search is in flight.
    Loading,
    /// The latest search failed.
    Failed(String),
    /// The latest search matched nothing.
    NoResults,
    /// The latest search matched this many listings.
    Results(usize),
}

/// State carried across searches.
#[derive(Debug, Default)]
pub struct SearchSession {
    keywords: String,
    location: String,
    pending: Option<u64>,
    applied: u64,
    error: Option<String>,
    results: Option<ResultSet>,
    selected: Option<usize>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the search inputs.
    pub fn set_inputs(&mut self, keywords: impl Into<String>, location: impl Into<String>) {
        self.keywords = keywords.into();
        self.location = location.into();
    }

    /// Query built from the current inputs.
    pub fn query(&self) -> Query {
        Query::new(self.keywords.as_str(), self.location.as_str())
    }

    /// Mark the search with `generation` as in flight.
    pub fn begin(&mut self, generation: u64) {
        if self.pending.map_or(true, |pending| generation > pending) {
            self.pending = Some(generation);
        }
    }

    /// Apply the outcome of search `generation`.
    ///
    /// Returns false, leaving the session untouched, if a newer search has
    /// already been started or applied.
    pub fn apply(&mut self, generation: u64, outcome: AggregationResult<ResultSet>) -> bool {
        let latest = self.pending.unwrap_or(0).max(self.applied);
        if generation < latest {
            debug!(
                "Discarding stale search #{} (latest is #{})",
                generation, latest
            );
            return false;
        }

        if self.pending == Some(generation) {
            self.pending = None;
        }
        self.applied = generation;
        self.selected = None;

        match outcome {
            Ok(results) => {
                self.error = None;
                self.results = Some(results);
            }
            Err(e) => {
                error!("Search #{} failed: {}", generation, e);
                self.error = Some(GENERIC_ERROR.to_string());
                self.results = None;
            }
        }

        true
    }

    /// Returns true while the latest search is in flight.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Current display state.
    pub fn state(&self) -> DisplayState {
        if self.is_loading() {
            return DisplayState::Loading;
        }
        if let Some(ref message) = self.error {
            return DisplayState::Failed(message.clone());
        }
        match self.results {
            None => DisplayState::Idle,
            Some(ref results) if results.is_empty() => DisplayState::NoResults,
            Some(ref results) => DisplayState::Results(results.len()),
        }
    }

    /// Last applied result set, if the latest applied search succeeded.
    pub fn results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    /// Open the detail view for a listing in the current results.
    pub fn select(&mut self, selector: &str) -> Result<&Listing, SelectError> {
        let results = self
            .results
            .as_ref()
            .ok_or_else(|| SelectError::NotFound(selector.to_string()))?;
        let listing = results.select(selector)?;

        self.selected = results
            .listings
            .iter()
            .position(|l| std::ptr::eq(l, listing));
        Ok(listing)
    }

    /// Listing open in the detail view.
    pub fn selected(&self) -> Option<&Listing> {
        let index = self.selected?;
        self.results.as_ref()?.listings.get(index)
    }

    /// Close the detail view.
    pub fn close_detail(&mut self) {
        self.selected = None;
    }
}
