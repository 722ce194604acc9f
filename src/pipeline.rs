use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::export::{
    self, LeagueSummary, SUMMARY_FILE, fixtures_file_name, standings_file_name,
};
use crate::football_data::{DataSource, DateWindow};
use crate::leagues::League;
use crate::model::{PredictionRow, StandingsRow, TeamRating};
use crate::strength::rate_teams;
use crate::win_prob::predict_fixtures;
use crate::workbook::{workbook_file_name, write_league_workbook};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub window: DateWindow,
    pub out_dir: PathBuf,
    pub figures: bool,
}

#[derive(Debug, Clone)]
pub struct LeagueReport {
    pub league: League,
    pub standings: Vec<StandingsRow>,
    pub ratings: Vec<TeamRating>,
    pub predictions: Vec<PredictionRow>,
}

impl LeagueReport {
    pub fn alerts(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_top_vs_bottom).count()
    }
}

#[derive(Debug, Clone)]
pub enum LeagueOutcome {
    NoStandings,
    NoFixtures,
    Predicted(LeagueReport),
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub leagues: Vec<LeagueSummary>,
    pub skipped: Vec<(League, &'static str)>,
    pub failures: Vec<(League, String)>,
    pub summary_csv: Option<PathBuf>,
}

/// Fetches, rates and predicts one league without touching the filesystem.
pub fn evaluate_league(
    source: &dyn DataSource,
    league: &League,
    window: &DateWindow,
) -> Result<LeagueOutcome> {
    let standings = source.fetch_standings(league)?;
    if standings.is_empty() {
        return Ok(LeagueOutcome::NoStandings);
    }
    let ratings = rate_teams(&standings);

    let fixtures = source.fetch_fixtures(league, window)?;
    if fixtures.is_empty() {
        return Ok(LeagueOutcome::NoFixtures);
    }
    let predictions = predict_fixtures(&fixtures, &ratings);

    Ok(LeagueOutcome::Predicted(LeagueReport {
        league: *league,
        standings,
        ratings,
        predictions,
    }))
}

pub fn write_league_outputs(report: &LeagueReport, opts: &RunOptions) -> Result<LeagueSummary> {
    let code = report.league.code;
    let standings_csv = standings_file_name(code);
    let fixtures_csv = fixtures_file_name(code);
    export::write_standings_csv(&opts.out_dir.join(&standings_csv), &report.standings)?;
    export::write_predictions_csv(&opts.out_dir.join(&fixtures_csv), &report.predictions)?;

    let workbook = if opts.figures {
        let name = workbook_file_name(code);
        write_league_workbook(
            &opts.out_dir.join(&name),
            report.league.name,
            &report.standings,
            &report.predictions,
        )?;
        Some(name)
    } else {
        None
    };

    Ok(LeagueSummary {
        league: report.league.name.to_string(),
        code: code.to_string(),
        alerts: report.alerts(),
        standings_csv,
        fixtures_csv,
        workbook,
    })
}

/// Processes leagues in order; a failing league is recorded and skipped.
pub fn run(source: &dyn DataSource, leagues: &[League], opts: &RunOptions) -> Result<RunSummary> {
    export::ensure_out_dir(&opts.out_dir)?;
    let mut summary = RunSummary::default();

    for league in leagues {
        info!(league = league.name, code = league.code, "processing league");
        let report = match evaluate_league(source, league, &opts.window) {
            Ok(LeagueOutcome::Predicted(report)) => report,
            Ok(LeagueOutcome::NoStandings) => {
                skip(&mut summary, league, "no standings for this league");
                continue;
            }
            Ok(LeagueOutcome::NoFixtures) => {
                skip(&mut summary, league, "no fixtures in the date window");
                continue;
            }
            Err(err) => {
                fail(&mut summary, league, err);
                continue;
            }
        };

        match write_league_outputs(&report, opts) {
            Ok(done) => {
                info!(
                    code = league.code,
                    "{} Top-3 vs Bottom-3 fixture(s) between {} and {}",
                    done.alerts,
                    opts.window.from,
                    opts.window.to
                );
                summary.leagues.push(done);
            }
            Err(err) => fail(&mut summary, league, err),
        }
    }

    if !summary.leagues.is_empty() {
        let path = opts.out_dir.join(SUMMARY_FILE);
        export::write_summary_csv(&path, &summary.leagues)?;
        summary.summary_csv = Some(path);
    }
    Ok(summary)
}

fn skip(summary: &mut RunSummary, league: &League, reason: &'static str) {
    info!(code = league.code, "{reason}");
    summary.skipped.push((*league, reason));
}

fn fail(summary: &mut RunSummary, league: &League, err: anyhow::Error) {
    warn!(code = league.code, "league failed: {err:#}");
    summary.failures.push((*league, format!("{err:#}")));
}
