use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;

use standings_edge::config::AppConfig;
use standings_edge::football_data::{DateWindow, FootballDataClient};
use standings_edge::http_client::ApiClient;
use standings_edge::leagues::select_leagues;
use standings_edge::logging;
use standings_edge::pipeline::{self, RunOptions};

/// Top-3 vs Bottom-3 alerts and match probabilities per league (football-data.org).
#[derive(Parser)]
#[command(name = "standings_edge", version, about, long_about = None)]
struct Cli {
    /// Days ahead to look for fixtures
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=30))]
    days: u32,

    /// First kickoff date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date_from: Option<NaiveDate>,

    /// Last kickoff date (YYYY-MM-DD); defaults to date-from plus --days
    #[arg(long)]
    date_to: Option<NaiveDate>,

    /// Output directory for CSV and workbook files
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Also write an .xlsx workbook per league with tables and a points chart
    #[arg(long)]
    figures: bool,

    /// Only process leagues whose code or name contains this text (e.g. PL, "La Liga")
    #[arg(long)]
    only: Option<String>,

    /// Include the Champions League
    #[arg(long)]
    include_cl: bool,

    /// API token; overrides FOOTBALL_DATA_API_KEY
    #[arg(long)]
    token: Option<String>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()
        .context("invalid configuration")?
        .with_token(cli.token.as_deref());

    let leagues = select_leagues(cli.include_cl, cli.only.as_deref());
    if leagues.is_empty() {
        println!("No league matches --only {:?}", cli.only.unwrap_or_default());
        return Ok(());
    }

    let api = ApiClient::new(cfg.client.clone(), cfg.build_cache())?;
    let source = FootballDataClient::new(api);
    let today = Utc::now().date_naive();
    let opts = RunOptions {
        window: DateWindow::resolve(today, cli.days, cli.date_from, cli.date_to)
            .context("invalid date window")?,
        out_dir: cli.out,
        figures: cli.figures,
    };

    let summary = pipeline::run(&source, &leagues, &opts)?;

    for done in &summary.leagues {
        println!(
            "{} ({}): {} Top-3 vs Bottom-3 fixture(s) between {} and {}",
            done.league, done.code, done.alerts, opts.window.from, opts.window.to
        );
    }
    for (league, reason) in &summary.skipped {
        println!("{} ({}): {reason}", league.name, league.code);
    }
    for (league, err) in &summary.failures {
        println!("{} ({}) failed: {err}", league.name, league.code);
    }

    match summary.summary_csv {
        Some(_) => println!("\nFiles written to {}", opts.out_dir.display()),
        None => println!("\nNo league processed successfully."),
    }
    Ok(())
}
