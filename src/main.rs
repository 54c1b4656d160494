use anyhow::{bail, Context, Result};
use arxiv_harvest::config::{find_config_file, get_config, load_config, Config};
use arxiv_harvest::models::{Cursor, Paper};
use arxiv_harvest::sources::{ArxivApiReader, FeedSource, RssFeedReader, SearchSource};
use arxiv_harvest::Harvester;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arxiv-harvest - Collect newly announced arXiv papers per subject area
#[derive(Parser, Debug)]
#[command(name = "arxiv-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect newly announced arXiv papers per subject area", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read one area's RSS feed and print the cursor and entries
    Feed {
        /// Area code, e.g. cond-mat.mtrl-sci
        area: String,

        /// Ignore the feed's modification time
        #[arg(long)]
        force: bool,

        /// Print papers as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query the search API for one area around a cursor
    Api {
        /// Area code, e.g. cond-mat.mtrl-sci
        area: String,

        /// Cursor time (RFC 3339); defaults to now
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,

        /// Newest feed id the cursor refers to
        #[arg(long, default_value = "")]
        reference_id: String,

        /// Print papers as JSON
        #[arg(long)]
        json: bool,
    },

    /// Collect and merge feed and API results for each area
    #[command(alias = "c")]
    Collect {
        /// Area codes; defaults to `harvest.areas` from the configuration
        areas: Vec<String>,

        /// Print the merged papers as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose, config.output.debug_messages) {
        (true, _, _) => "error",
        (false, 0, false) => "info",
        (false, 0, true) | (false, 1, _) => "debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_harvest={}", level)),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(find_config_file);
    match path {
        Some(path) => {
            let config = load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, Some(path)))
        }
        None => Ok((get_config(), None)),
    }
}

fn print_papers(label: &str, papers: &[Paper], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(papers)?);
        return Ok(());
    }

    let ids: Vec<&str> = papers.iter().map(Paper::id).collect();
    println!("{}: {} {:?}", label, papers.len(), ids);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = resolve_config(&cli)?;
    init_tracing(&cli, &config);
    if let Some(path) = config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match &cli.command {
        Commands::Feed { area, force, json } => {
            let reader = RssFeedReader::new(&config)?;
            let since = if *force {
                DateTime::<Utc>::UNIX_EPOCH
            } else {
                Utc::now() - Duration::hours(i64::from(config.harvest.not_modified_window_hours))
            };

            let outcome = reader.read_feed(area, since).await?;
            match &outcome.cursor {
                Some(cursor) => {
                    println!("timestamp: {} last id: {}", cursor.timestamp, cursor.reference_id)
                }
                None => println!("no cursor: feed not modified or empty"),
            }
            print_papers("rss find", &outcome.papers, *json)?;
        }

        Commands::Api {
            area,
            timestamp,
            reference_id,
            json,
        } => {
            let reader = ArxivApiReader::new(&config)?;
            let cursor = Cursor::new(timestamp.unwrap_or_else(Utc::now), reference_id.as_str());

            let papers = reader.read_api(area, &cursor, &config.filtering).await?;
            print_papers("api find", &papers, *json)?;
        }

        Commands::Collect { areas, json } => {
            let areas = if areas.is_empty() {
                config.harvest.areas.clone()
            } else {
                areas.clone()
            };
            if areas.is_empty() {
                bail!("No areas given and none configured in harvest.areas");
            }

            let harvester = Harvester::from_config(&config)?;
            let report = harvester.collect_all(areas.as_slice()).await;

            if !*json {
                for harvest in &report.areas {
                    match &harvest.result {
                        Ok(papers) => print_papers(&harvest.area, papers, false)?,
                        Err(e) => println!("{}: failed: {}", harvest.area, e),
                    }
                }
            }
            print_papers("all areas", &report.papers(), *json)?;

            if !report.is_complete() {
                bail!(
                    "{} of {} areas failed",
                    report.failures().count(),
                    report.areas.len()
                );
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
