//! Result rendering.
//!
//! This module turns result sets and single listings into text, Markdown
//! or JSON for the terminal or an output file.

use crate::cli::OutputFormat;
use crate::models::{Listing, ResultSet, ResultSummary, SourceFailure};
use anyhow::Result;

/// Render a result set in the requested format.
pub fn render_results(results: &ResultSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_report(results)),
        OutputFormat::Markdown => Ok(generate_markdown_report(results)),
        OutputFormat::Json => generate_json_report(results),
    }
}

/// Render one listing's detail view in the requested format.
pub fn render_detail(listing: &Listing, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_detail(listing)),
        OutputFormat::Markdown => Ok(generate_markdown_detail(listing)),
        OutputFormat::Json => serde_json::to_string_pretty(listing).map_err(Into::into),
    }
}

/// Heading shown above the results.
pub fn results_header(results: &ResultSet) -> String {
    if results.is_empty() {
        "No listings found.".to_string()
    } else {
        format!("Results ({})", results.len())
    }
}

/// Generate the plain-text card list.
pub fn generate_text_report(results: &ResultSet) -> String {
    let mut output = String::new();

    output.push_str(&results_header(results));
    output.push('\n');

    if !results.query.is_empty() {
        output.push_str(&format!("Search: {}\n", results.query));
    }
    output.push('\n');

    let width = results.len().to_string().len();
    for (i, listing) in results.listings.iter().enumerate() {
        output.push_str(&format!(
            "{:>width$}. {}  {}\n",
            i + 1,
            listing.title,
            listing.price,
            width = width
        ));
        output.push_str(&format!(
            "{:>width$}  [{}] {} · {}\n",
            "",
            listing.marketplace.badge(),
            listing.marketplace,
            listing.location,
            width = width
        ));
    }

    output.push_str(&generate_unavailable_notice(&results.unavailable));

    output
}

/// Generate a Markdown results document.
pub fn generate_markdown_report(results: &ResultSet) -> String {
    let mut output = String::new();

    output.push_str("# MarketMerge Results\n\n");
    output.push_str(&format!("- **Search:** {}\n", results.query));
    output.push_str(&format!(
        "- **Searched At:** {}\n",
        results.searched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("- **Listings:** {}\n\n", results.len()));

    output.push_str(&generate_summary_section(&results.summary));

    output.push_str(&format!("## {}\n\n", results_header(results)));
    if !results.is_empty() {
        output.push_str("| # | Title | Price | Location | Marketplace |\n");
        output.push_str("|:---:|:---|---:|:---|:---|\n");
        for (i, listing) in results.listings.iter().enumerate() {
            output.push_str(&format!(
                "| {} | [{}]({}) | {} | {} | {} |\n",
                i + 1,
                escape_cell(&listing.title),
                listing.link,
                escape_cell(&listing.price),
                escape_cell(&listing.location),
                listing.marketplace
            ));
        }
        output.push('\n');
    }

    if !results.unavailable.is_empty() {
        output.push_str("## Unavailable Sources\n\n");
        for failure in &results.unavailable {
            output.push_str(&format!("- **{}:** {}\n", failure.marketplace, failure.reason));
        }
        output.push('\n');
    }

    output
}

/// Generate the per-marketplace count table.
fn generate_summary_section(summary: &ResultSummary) -> String {
    if summary.by_marketplace.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## By Marketplace\n\n");
    section.push_str("| Marketplace | Listings |\n");
    section.push_str("|:---|:---:|\n");
    for (name, count) in &summary.by_marketplace {
        section.push_str(&format!("| {} | {} |\n", name, count));
    }
    section.push('\n');
    section
}

fn generate_unavailable_notice(unavailable: &[SourceFailure]) -> String {
    if unavailable.is_empty() {
        return String::new();
    }

    let names: Vec<String> = unavailable
        .iter()
        .map(|f| f.marketplace.to_string())
        .collect();
    format!("\n⚠️  Not included (unavailable): {}\n", names.join(", "))
}

/// Generate a JSON document for the result set.
pub fn generate_json_report(results: &ResultSet) -> Result<String> {
    serde_json::to_string_pretty(results).map_err(Into::into)
}

/// Generate the plain-text detail view of a listing.
pub fn generate_text_detail(listing: &Listing) -> String {
    let mut detail = String::new();

    detail.push_str(&format!("{}\n", listing.title));
    detail.push_str(&format!("{}\n", "=".repeat(listing.title.chars().count())));
    detail.push_str(&format!("Price:       {}\n", listing.price));
    detail.push_str(&format!("Location:    {}\n", listing.location));
    detail.push_str(&format!(
        "Marketplace: [{}] {}\n",
        listing.marketplace.badge(),
        listing.marketplace
    ));
    detail.push_str(&format!("Listing:     {}\n", listing.key()));
    if !listing.image.is_empty() {
        detail.push_str(&format!("Image:       {}\n", listing.image));
    }
    if !listing.description.is_empty() {
        detail.push_str(&format!("\n{}\n", listing.description));
    }
    detail.push_str(&format!("\nView original listing: {}\n", listing.link));

    detail
}

/// Generate the Markdown detail view of a listing.
pub fn generate_markdown_detail(listing: &Listing) -> String {
    let mut detail = String::new();

    detail.push_str(&format!("# {}\n\n", listing.title));
    if !listing.image.is_empty() {
        detail.push_str(&format!("![{}]({})\n\n", listing.title, listing.image));
    }
    detail.push_str(&format!("- **Price:** {}\n", listing.price));
    detail.push_str(&format!("- **Location:** {}\n", listing.location));
    detail.push_str(&format!("- **Marketplace:** {}\n\n", listing.marketplace));
    if !listing.description.is_empty() {
        detail.push_str(&format!("{}\n\n", listing.description));
    }
    detail.push_str(&format!("[View Original Listing]({})\n", listing.link));

    detail
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Marketplace, Query};
    use crate::provider::Catalog;

    fn create_test_results() -> ResultSet {
        ResultSet::new(
            Query::new("", "ca"),
            3,
            Catalog::sample().listings,
            vec![SourceFailure {
                marketplace: Marketplace::Other("offerup".to_string()),
                reason: "simulated outage".to_string(),
            }],
        )
    }

    #[test]
    fn test_results_header() {
        let results = create_test_results();
        assert_eq!(results_header(&results), "Results (3)");

        let empty = ResultSet::new(Query::new("zzz", ""), 1, Vec::new(), Vec::new());
        assert_eq!(results_header(&empty), "No listings found.");
    }

    #[test]
    fn test_generate_text_report() {
        let text = generate_text_report(&create_test_results());

        assert!(text.starts_with("Results (3)\n"));
        assert!(text.contains("Search: anything in \"ca\""));
        assert!(text.contains("1. Vintage Bike  $120"));
        assert!(text.contains("[ND] Nextdoor · Berkeley, CA"));
        assert!(text.contains("Not included (unavailable): Offerup"));
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_results());

        assert!(markdown.contains("# MarketMerge Results"));
        assert!(markdown.contains("## By Marketplace"));
        assert!(markdown.contains("| craigslist | 1 |"));
        assert!(markdown.contains("[Coffee Table](https://facebook.com/coffee-table)"));
        assert!(markdown.contains("## Unavailable Sources"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_results()).unwrap();

        assert!(json.contains("\"listings\""));
        assert!(json.contains("\"marketplace\": \"nextdoor\""));
        assert!(json.contains("\"unavailable\""));

        let parsed: ResultSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.listings.len(), 3);
        assert_eq!(parsed.generation, 3);
    }

    #[test]
    fn test_generate_text_detail() {
        let listing = &Catalog::sample().listings[2];
        let detail = generate_text_detail(listing);

        assert!(detail.starts_with("Sofa Couch\n==========\n"));
        assert!(detail.contains("Price:       $250"));
        assert!(detail.contains("Marketplace: [ND] Nextdoor"));
        assert!(detail.contains("Listing:     nextdoor:3"));
        assert!(detail.contains("Comfortable 3-seater, pickup only."));
        assert!(detail.contains("View original listing: https://nextdoor.com/sofa-couch"));
    }

    #[test]
    fn test_render_detail_json() {
        let listing = &Catalog::sample().listings[0];
        let json = render_detail(listing, OutputFormat::Json).unwrap();
        let parsed: Listing = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, listing);
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b"), "a\\|b");
    }
}
