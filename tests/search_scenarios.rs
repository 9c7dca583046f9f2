use marketmerge::config::ProvidersConfig;
use marketmerge::provider::build_providers;
use marketmerge::{
    AggregationError, Aggregator, AggregatorConfig, Catalog, DisplayState, FailurePolicy,
    Marketplace, Query, SearchSession,
};
use std::sync::Arc;

fn sample_aggregator(unavailable: &[&str], config: AggregatorConfig) -> Aggregator {
    let providers_config = ProvidersConfig {
        latency_ms: 5,
        unavailable: unavailable.iter().map(|s| s.to_string()).collect(),
        ..ProvidersConfig::default()
    };
    let providers = build_providers(&Catalog::sample(), &providers_config);
    Aggregator::new(providers, config)
}

fn titles(results: &marketmerge::ResultSet) -> Vec<&str> {
    results.listings.iter().map(|l| l.title.as_str()).collect()
}

#[tokio::test]
async fn keyword_search_finds_the_bike() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let aggregator = sample_aggregator(&[], AggregatorConfig::default());
    let results = aggregator.search(&Query::new("bike", "")).await.unwrap();

    assert_eq!(titles(&results), vec!["Vintage Bike"]);
    assert_eq!(results.listings[0].marketplace, Marketplace::Craigslist);
}

#[tokio::test]
async fn location_search_returns_everything_sorted() {
    let aggregator = sample_aggregator(&[], AggregatorConfig::default());
    let results = aggregator.search(&Query::new("", "CA")).await.unwrap();

    assert_eq!(
        titles(&results),
        vec!["Coffee Table", "Sofa Couch", "Vintage Bike"]
    );
}

#[tokio::test]
async fn unmatched_search_is_empty() {
    let aggregator = sample_aggregator(&[], AggregatorConfig::default());
    let results = aggregator.search(&Query::new("zzz", "")).await.unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn trailing_space_in_keywords_is_part_of_the_match() {
    let aggregator = sample_aggregator(&[], AggregatorConfig::default());

    let results = aggregator.search(&Query::new("bike ", "")).await.unwrap();
    assert!(results.is_empty());

    let results = aggregator.search(&Query::new("vintage ", "")).await.unwrap();
    assert_eq!(titles(&results), vec!["Vintage Bike"]);
}

#[tokio::test]
async fn every_result_satisfies_the_filter() {
    let aggregator = sample_aggregator(&[], AggregatorConfig::default());
    let queries = [
        Query::new("o", ""),
        Query::new("", "oak"),
        Query::new("TABLE", "ca"),
        Query::new("sofa", "berkeley"),
    ];

    for query in &queries {
        let results = aggregator.search(query).await.unwrap();
        for listing in &results.listings {
            assert!(
                listing.title.to_lowercase().contains(&query.keywords.to_lowercase()),
                "{} does not match keywords {:?}",
                listing.title,
                query.keywords
            );
            assert!(listing
                .location
                .to_lowercase()
                .contains(&query.location.to_lowercase()));
        }
    }
}

#[tokio::test]
async fn empty_query_excludes_nothing() {
    let aggregator = sample_aggregator(&[], AggregatorConfig::default());
    let results = aggregator.populate().await.unwrap();

    let mut expected: Vec<String> = Catalog::sample()
        .listings
        .into_iter()
        .map(|l| l.key())
        .collect();
    let mut actual: Vec<String> = results.listings.iter().map(|l| l.key()).collect();
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn outage_fails_search_and_empties_session() {
    let aggregator = sample_aggregator(&["facebook"], AggregatorConfig::default());
    let mut session = SearchSession::new();
    session.set_inputs("", "CA");

    let generation = aggregator.ticket();
    session.begin(generation);
    let outcome = aggregator.run(generation, &session.query()).await;

    assert!(matches!(
        outcome,
        Err(AggregationError::SourceUnavailable {
            marketplace: Marketplace::Facebook,
            ..
        })
    ));

    session.apply(generation, outcome);
    assert!(matches!(session.state(), DisplayState::Failed(_)));
    assert!(session.results().is_none());
}

#[tokio::test]
async fn outage_with_partial_policy_degrades_gracefully() {
    let config = AggregatorConfig::default().with_failure_policy(FailurePolicy::Partial);
    let aggregator = sample_aggregator(&["facebook"], config);

    let results = aggregator.search(&Query::new("", "CA")).await.unwrap();
    assert_eq!(titles(&results), vec!["Sofa Couch", "Vintage Bike"]);
    assert_eq!(results.unavailable[0].marketplace, Marketplace::Facebook);
}

#[tokio::test]
async fn slow_earlier_search_does_not_overwrite_newer_one() {
    let aggregator = Arc::new(sample_aggregator(&[], AggregatorConfig::default()));
    let mut session = SearchSession::new();

    let first = aggregator.ticket();
    session.begin(first);
    let second = aggregator.ticket();
    session.begin(second);

    let newer = aggregator.run(second, &Query::new("sofa", "")).await;
    let older = aggregator.run(first, &Query::default()).await;

    assert!(session.apply(second, newer));
    assert!(!session.apply(first, older));
    assert_eq!(session.state(), DisplayState::Results(1));
    assert_eq!(session.results().unwrap().listings[0].title, "Sofa Couch");
}
