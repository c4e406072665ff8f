mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, MAX_ROUNDS};
use crate::loader::summarize;
use crate::models::{match_columns, Season};
use crate::pipeline::Pipeline;
use crate::scraper::{LegaSerieAScraper, MatchReportParser, MatchSource, ReportParser};
use crate::storage::CsvSink;

#[derive(Parser)]
#[command(name = "seriea-scraper", about = "Serie A match report scraper", version)]
struct Cli {
    /// Defaults to `scrape` with the configured ranges
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every configured season and round into the output CSV
    Scrape {
        /// Output CSV, appended to (default: data.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start year of the first season, e.g. 2005 for 2005-06
        #[arg(long)]
        from: Option<u16>,

        /// Start year of the last season, inclusive
        #[arg(long)]
        to: Option<u16>,

        /// Only scrape this round of each season
        #[arg(long)]
        round: Option<u32>,
    },

    /// Print the match report URLs of one round
    Resolve {
        /// Season start year
        #[arg(long)]
        season: u16,

        #[arg(long)]
        round: u32,
    },

    /// Parse a saved match report page
    Parse {
        file: PathBuf,

        /// Print the parsed match as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize an existing output file
    Stats {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "seriea_scraper=info,warn",
        1 => "seriea_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    let command = cli.command.unwrap_or(Command::Scrape {
        output: None,
        from: None,
        to: None,
        round: None,
    });

    match command {
        Command::Scrape {
            output,
            from,
            to,
            round,
        } => {
            if let Some(path) = output {
                config.output.path = path;
            }
            if let Some(year) = from {
                config.pipeline.first_season = year;
            }
            if let Some(year) = to {
                config.pipeline.last_season = year;
            }
            config.validate()?;
            if let Some(r) = round {
                check_round(r)?;
            }

            let _t = utils::Timer::start("Scrape");
            let mut sink = CsvSink::open_append(&config.output.path)?;
            let source = LegaSerieAScraper::new(&config.scraper)?;
            let pipeline = Pipeline::new(source, MatchReportParser, config.pipeline.clone());

            match round {
                Some(r) => {
                    let seasons =
                        Season::range(config.pipeline.first_season, config.pipeline.last_season);
                    for season in &seasons {
                        pipeline.scrape_round(season, r, &mut sink).await?;
                    }
                }
                None => {
                    pipeline.run(&mut sink).await?;
                }
            }

            info!(
                "{} rows appended to {:?}",
                utils::fmt_number(sink.rows_written()),
                config.output.path
            );
        }

        Command::Resolve { season, round } => {
            check_round(round)?;
            let season = Season::new(season);
            let source = LegaSerieAScraper::new(&config.scraper)?;
            let urls = source
                .fetch_round_urls(&season, round)
                .await
                .with_context(|| format!("Resolving {} round {}", season, round))?;

            println!("{} round {}: {} matches", season, round, urls.len());
            for url in &urls {
                println!("  {}", url);
            }
        }

        Command::Parse { file, json } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let row = MatchReportParser
                .parse(&html)
                .with_context(|| format!("Failed to parse {:?}", file))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&row)?);
            } else {
                for (col, value) in match_columns().iter().skip(2).zip(row.record()) {
                    println!("  {:<18}: {}", col, value);
                }
            }
        }

        Command::Stats { output } => {
            let path = output.unwrap_or(config.output.path);
            let summary = summarize(&path)?;
            println!("─────────────────────────────────");
            println!("  Serie A scrape — {}", path.display());
            println!("─────────────────────────────────");
            println!("  Matches   : {}", utils::fmt_number(summary.matches));
            println!("  Forfeits  : {}", utils::fmt_number(summary.forfeits));
            println!("  Headers   : {}", summary.header_rows);
            println!("  Malformed : {}", summary.malformed);
            for (season, n) in &summary.per_season {
                println!("  {}   : {}", season, utils::fmt_number(*n));
            }
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}

fn check_round(round: u32) -> Result<()> {
    if round == 0 || round > MAX_ROUNDS {
        bail!("round must be in 1..={}, got {}", MAX_ROUNDS, round);
    }
    Ok(())
}
