//! Interactive search session on the terminal.
//!
//! Reads commands from stdin while searches run in the background. A new
//! search may be issued before the previous one has answered; the session
//! only ever shows the results of the most recent one. `show` and end of
//! input both wait for the pending search first.

use crate::aggregator::{AggregationResult, Aggregator};
use crate::cli::OutputFormat;
use crate::models::{Query, ResultSet};
use crate::report;
use crate::session::{DisplayState, SearchSession};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  search <keywords> [@ <location>]   search every marketplace
  all                                 list everything
  show <n | marketplace:id | id>      open a listing
  close                               close the open listing
  help                                show this help
  quit                                leave";

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(Query),
    All,
    Show(String),
    Close,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "search" | "s" | "find" => {
                // Spaces around the '@' separator belong to the command syntax
                let (keywords, location) = rest.split_once('@').unwrap_or((rest, ""));
                Command::Search(Query::new(keywords.trim(), location.trim()))
            }
            "all" | "reset" => Command::All,
            "show" | "open" => {
                if rest.is_empty() {
                    return Err("show needs a listing number or id".to_string());
                }
                Command::Show(rest.to_string())
            }
            "close" => Command::Close,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{}' (try 'help')", other)),
        };

        Ok(Some(command))
    }
}

type Outcome = (u64, AggregationResult<ResultSet>);

/// Run the interactive loop on stdin until `quit` or end of input.
pub async fn run(aggregator: Arc<Aggregator>, format: OutputFormat) -> Result<()> {
    println!("MarketMerge: searching {}", marketplace_list(&aggregator));
    println!("{}\n", HELP);

    drive(aggregator, format, BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}

/// Run the command loop over `input` and return the final session.
///
/// At end of input the loop waits for the latest search to land before
/// returning, so piped commands still print their results.
pub async fn drive<R>(
    aggregator: Arc<Aggregator>,
    format: OutputFormat,
    input: R,
) -> Result<SearchSession>
where
    R: AsyncBufRead + Unpin,
{
    let mut session = SearchSession::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
    let mut lines = input.lines();
    let mut spinner: Option<ProgressBar> = None;

    // Initial population
    start_search(&aggregator, &mut session, &tx);
    print_state(&session, format, &mut spinner)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    settle(&mut session, &mut rx, format, &mut spinner).await?;
                    break;
                };

                match Command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if matches!(command, Command::Show(_)) {
                            settle(&mut session, &mut rx, format, &mut spinner).await?;
                        }
                        handle_command(command, &aggregator, &mut session, &tx, format, &mut spinner)?
                    }
                    Err(message) => println!("{}", message),
                }
            }
            Some((generation, outcome)) = rx.recv() => {
                if session.apply(generation, outcome) {
                    print_state(&session, format, &mut spinner)?;
                }
            }
        }
    }

    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }
    info!("Interactive session ended");
    Ok(session)
}

/// Apply outcomes until the latest search has answered.
async fn settle(
    session: &mut SearchSession,
    rx: &mut mpsc::UnboundedReceiver<Outcome>,
    format: OutputFormat,
    spinner: &mut Option<ProgressBar>,
) -> Result<()> {
    while session.is_loading() {
        let Some((generation, outcome)) = rx.recv().await else {
            break;
        };
        if session.apply(generation, outcome) {
            print_state(session, format, spinner)?;
        }
    }
    Ok(())
}

/// Issue a search for the session's inputs without waiting for it.
fn start_search(
    aggregator: &Arc<Aggregator>,
    session: &mut SearchSession,
    tx: &mpsc::UnboundedSender<Outcome>,
) {
    let query = session.query();
    let generation = aggregator.ticket();
    session.begin(generation);
    debug!("Started search #{} for {}", generation, query);

    let aggregator = Arc::clone(aggregator);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = aggregator.run(generation, &query).await;
        // The receiver is gone once the session has ended
        let _ = tx.send((generation, outcome));
    });
}

fn print_state(
    session: &SearchSession,
    format: OutputFormat,
    spinner: &mut Option<ProgressBar>,
) -> Result<()> {
    let state = session.state();
    if state != DisplayState::Loading {
        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
    }

    match state {
        DisplayState::Idle => {}
        DisplayState::Loading => {
            if spinner.is_none() {
                *spinner = report::busy_spinner(true, format!("Searching {}...", session.query()));
            }
        }
        DisplayState::Failed(message) => println!("❌ {}", message),
        DisplayState::NoResults | DisplayState::Results(_) => {
            if let Some(results) = session.results() {
                print!("\n{}\n", report::render_results(results, format)?);
            }
        }
    }
    Ok(())
}

fn marketplace_list(aggregator: &Aggregator) -> String {
    aggregator
        .marketplaces()
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregatorConfig;
    use crate::config::ProvidersConfig;
    use crate::provider::{build_providers, Catalog};

    fn sample_aggregator(unavailable: &[&str]) -> Arc<Aggregator> {
        let providers_config = ProvidersConfig {
            latency_ms: 20,
            unavailable: unavailable.iter().map(|s| s.to_string()).collect(),
            ..ProvidersConfig::default()
        };
        let providers = build_providers(&Catalog::sample(), &providers_config);
        Arc::new(Aggregator::new(providers, AggregatorConfig::default()))
    }

    async fn drive_script(aggregator: Arc<Aggregator>, script: &str) -> SearchSession {
        drive(aggregator, OutputFormat::Text, script.as_bytes())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_end_of_input_waits_for_pending_search() {
        let session = drive_script(sample_aggregator(&[]), "search bike\n").await;

        assert!(!session.is_loading());
        assert_eq!(session.state(), DisplayState::Results(1));
        assert_eq!(session.results().unwrap().listings[0].title, "Vintage Bike");
    }

    #[tokio::test]
    async fn test_show_waits_for_results() {
        let session = drive_script(sample_aggregator(&[]), "search bike\nshow 1\n").await;
        assert_eq!(session.selected().unwrap().title, "Vintage Bike");

        let session = drive_script(sample_aggregator(&[]), "show 2\n").await;
        assert_eq!(session.selected().unwrap().title, "Sofa Couch");
    }

    #[tokio::test]
    async fn test_close_and_all_commands() {
        let session = drive_script(
            sample_aggregator(&[]),
            "search sofa\nshow nextdoor:3\nclose\nhelp\nbogus\n",
        )
        .await;
        assert!(session.selected().is_none());
        assert_eq!(session.state(), DisplayState::Results(1));

        let session = drive_script(sample_aggregator(&[]), "search zzz\nall\n").await;
        assert_eq!(session.state(), DisplayState::Results(3));
        assert!(session.query().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_source_shows_failure() {
        let session = drive_script(sample_aggregator(&["facebook"]), "search bike\n").await;

        assert!(matches!(session.state(), DisplayState::Failed(_)));
        assert!(session.results().is_none());
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            Command::parse("search vintage bike @ San Francisco"),
            Ok(Some(Command::Search(Query::new("vintage bike", "San Francisco"))))
        );
        assert_eq!(
            Command::parse("s @ CA"),
            Ok(Some(Command::Search(Query::new("", "CA"))))
        );
        assert_eq!(
            Command::parse("search"),
            Ok(Some(Command::Search(Query::default())))
        );
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(Command::parse("ALL"), Ok(Some(Command::All)));
        assert_eq!(
            Command::parse("show facebook:2"),
            Ok(Some(Command::Show("facebook:2".to_string())))
        );
        assert_eq!(Command::parse("close"), Ok(Some(Command::Close)));
        assert_eq!(Command::parse("?"), Ok(Some(Command::Help)));
        assert_eq!(Command::parse("quit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("show").is_err());
        assert!(Command::parse("buy 3").is_err());
    }
}
