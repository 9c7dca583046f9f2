//! Rendering of search results.

pub mod generator;

pub use generator::*;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown on stderr while a search is pending.
pub fn busy_spinner(enabled: bool, message: String) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}
