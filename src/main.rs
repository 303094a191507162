use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use vidscout::presentation::render::{render_download_options, render_history, render_results};
use vidscout::presentation::{CategoryFilter, Clipboard, CopyFeedback, SortKey, SystemClipboard};
use vidscout::{Config, FileStore, KeyValueStore, SearchSession, SubmitOutcome, VideoAnalyzer};

fn cli() -> Command {
    let sort_arg = Arg::new("sort")
        .short('s')
        .long("sort")
        .value_name("ORDER")
        .help("Sort order")
        .value_parser(["popularity", "date", "title"]);

    Command::new("vidscout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find downloadable videos on a web page")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("search")
                .about("Analyze one page and print its videos")
                .arg(Arg::new("url").value_name("URL").required(true))
                .arg(
                    Arg::new("category")
                        .long("category")
                        .value_name("CATEGORY")
                        .help("Only show this category")
                        .default_value("all"),
                )
                .arg(sort_arg)
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the displayed groups as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("interactive").about("Search repeatedly in one session"))
        .subcommand(
            Command::new("history").about("Show recent searches").arg(
                Arg::new("clear")
                    .long("clear")
                    .help("Forget all recent searches")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(Command::new("check").about("Check that the model provider is reachable"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let verbose = matches.get_flag("verbose");
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let log_filter = init_logging(verbose);

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    // the configured level applies unless --verbose or RUST_LOG chose one
    if !verbose && !rust_log_set {
        if let Err(e) = log_filter.reload(EnvFilter::new(&config.logging.log_level)) {
            warn!("Could not apply log level {:?}: {}", config.logging.log_level, e);
        }
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.storage.data_dir));

    match matches.subcommand() {
        Some(("history", sub)) => run_history(store, sub).await,
        Some(("check", _)) => run_check(&config).await,
        Some(("search", sub)) => {
            let session = open_session(&config, store).await?;
            run_search(&session, sub).await
        }
        Some(("interactive", _)) => {
            let session = open_session(&config, store).await?;
            run_interactive(&session, &config).await
        }
        _ => Err(anyhow!("unknown command")),
    }
}

/// Install the stderr subscriber before anything logs. The returned handle
/// swaps in the configured filter once the config is loaded.
fn init_logging(verbose: bool) -> reload::Handle<EnvFilter, Registry> {
    let filter = if verbose {
        EnvFilter::new("vidscout=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&Config::default().logging.log_level))
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    handle
}

async fn open_session(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<SearchSession> {
    config.validate()?;
    let analyzer = Arc::new(VideoAnalyzer::from_config(&config.llm)?);
    let session = SearchSession::new(analyzer, store).await;
    session.set_sort(config.ui.default_sort).await;
    info!("🚀 Using {:?} model {}", config.llm.provider, config.llm.model);
    Ok(session)
}

async fn run_search(session: &SearchSession, args: &ArgMatches) -> Result<()> {
    let url = args
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("URL is required"))?;

    if let Some(sort) = args.get_one::<String>("sort") {
        session.set_sort(sort.parse()?).await;
    }

    match session.submit(url).await {
        SubmitOutcome::Found(_) => {}
        SubmitOutcome::Rejected(e) => return Err(anyhow!(e.user_message())),
        SubmitOutcome::Failed(message) => return Err(anyhow!(message)),
        SubmitOutcome::Busy => return Err(anyhow!("a search is already running")),
    }

    if let Some(category) = args.get_one::<String>("category") {
        session.set_category(CategoryFilter::parse(category)).await;
    }

    let state = session.snapshot().await;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&state.visible_groups())?);
    } else {
        print!("{}", render_results(&state));
    }
    Ok(())
}

async fn run_history(store: Arc<dyn KeyValueStore>, args: &ArgMatches) -> Result<()> {
    let mut history = vidscout::SearchHistory::load(store).await;
    if args.get_flag("clear") {
        history.clear().await;
        println!("Search history cleared.");
    } else {
        print!("{}", render_history(history.entries()));
    }
    Ok(())
}

async fn run_check(config: &Config) -> Result<()> {
    println!("{}", config.summary());
    config.validate()?;

    let analyzer = VideoAnalyzer::from_config(&config.llm)?;
    if analyzer.is_available().await {
        println!("✅ {:?} is reachable", analyzer.provider_type());
        Ok(())
    } else {
        Err(anyhow!("{:?} is not reachable", analyzer.provider_type()))
    }
}

const INTERACTIVE_HELP: &str = "\
Commands:
  <url>              analyze a page
  filter <name|all>  show one category
  categories         list categories in the current results
  sort <order>       popularity, date or title
  list               show the current results
  open <n>           download options of result n
  copy <n> <m>       copy the URL of variant m of result n
  history            recent searches
  again <n>          search recent entry n again
  clear-history      forget recent searches
  help               this text
  quit               exit";

async fn run_interactive(session: &SearchSession, config: &Config) -> Result<()> {
    let clipboard = SystemClipboard;
    let feedback = CopyFeedback::new(config.ui.copy_feedback());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", INTERACTIVE_HELP);
    loop {
        print!("vidscout> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{}", INTERACTIVE_HELP),
            "list" => print!("{}", render_results(&session.snapshot().await)),
            "filter" => {
                session.set_category(CategoryFilter::parse(rest)).await;
                print!("{}", render_results(&session.snapshot().await));
            }
            "categories" => {
                let names: Vec<String> = session
                    .snapshot()
                    .await
                    .categories()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!("{}", names.join(", "));
            }
            "sort" => match rest.parse::<SortKey>() {
                Ok(sort) => {
                    session.set_sort(sort).await;
                    print!("{}", render_results(&session.snapshot().await));
                }
                Err(e) => println!("{}", e),
            },
            "open" => match group_index(rest) {
                Some(index) => show_options(session, &feedback, index).await,
                None => println!("usage: open <n>"),
            },
            "copy" => {
                let mut parts = rest.split_whitespace().map(|p| p.parse::<usize>().ok());
                match (parts.next().flatten(), parts.next().flatten()) {
                    (Some(group), Some(variant)) if group > 0 && variant > 0 => {
                        copy_variant(session, &clipboard, &feedback, group - 1, variant - 1).await
                    }
                    _ => println!("usage: copy <n> <m>"),
                }
            }
            "history" => print!("{}", render_history(&session.history().await)),
            "again" => match group_index(rest) {
                Some(index) => match session.search_history_entry(index).await {
                    Some(outcome) => report(session, outcome).await,
                    None => println!("No recent search {}", rest),
                },
                None => println!("usage: again <n>"),
            },
            "clear-history" => {
                session.clear_history().await;
                println!("Search history cleared.");
            }
            _ => {
                let outcome = session.submit(line).await;
                report(session, outcome).await;
            }
        }
    }

    let stats = session.analyzer().cache_stats().await;
    info!("Session cached {} pages ({} video groups)", stats.entries, stats.total_groups);
    Ok(())
}

/// 1-based user input to a 0-based index
fn group_index(input: &str) -> Option<usize> {
    input.parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1)
}

async fn report(session: &SearchSession, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Busy => println!("A search is already running."),
        SubmitOutcome::Rejected(e) => println!("❌ {}", e.user_message()),
        SubmitOutcome::Found(_) | SubmitOutcome::Failed(_) => {
            print!("{}", render_results(&session.snapshot().await))
        }
    }
}

async fn show_options(session: &SearchSession, feedback: &CopyFeedback, index: usize) {
    let state = session.snapshot().await;
    let Some(group) = state.visible_groups().get(index).copied().cloned() else {
        println!("No result {}", index + 1);
        return;
    };

    let mut copied = Vec::new();
    for variant in &group.variants {
        if feedback.is_copied(&variant.url).await {
            copied.push(variant.url.clone());
        }
    }
    print!("{}", render_download_options(&group, |url| copied.iter().any(|c| c == url)));
}

async fn copy_variant(
    session: &SearchSession,
    clipboard: &dyn Clipboard,
    feedback: &CopyFeedback,
    group_index: usize,
    variant_index: usize,
) {
    let state = session.snapshot().await;
    let url = state
        .visible_groups()
        .get(group_index)
        .and_then(|group| group.variants.get(variant_index))
        .map(|variant| variant.url.clone());

    match url {
        Some(url) => match feedback.copy(clipboard, &url).await {
            Ok(()) => show_options(session, feedback, group_index).await,
            Err(e) => {
                warn!("Clipboard write failed: {:#}", e);
                println!("Could not copy to the clipboard: {}", e);
            }
        },
        None => println!("No variant {} for result {}", variant_index + 1, group_index + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_can_be_replaced_after_install() {
        let handle = init_logging(false);
        info!("logged before the config is read");

        assert!(handle.reload(EnvFilter::new("vidscout=debug,warn")).is_ok());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["vidscout", "search", "https://x.test", "-v", "--sort", "title"])
            .unwrap();

        assert!(matches.get_flag("verbose"));
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "search");
        assert_eq!(sub.get_one::<String>("sort").map(String::as_str), Some("title"));
    }
}
