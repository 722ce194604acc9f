use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::{PredictionRow, StandingsRow};

#[derive(Debug, Serialize)]
struct StandingsRecord<'a> {
    position: u32,
    team_id: u32,
    team: &'a str,
    tla: &'a str,
    played: u32,
    won: u32,
    draw: u32,
    lost: u32,
    gf: u32,
    ga: u32,
    gd: i32,
    points: u32,
    form: &'a str,
}

#[derive(Debug, Serialize)]
struct PredictionRecord<'a> {
    utc_date: String,
    matchday: Option<u32>,
    home: &'a str,
    home_pos: u32,
    away: &'a str,
    away_pos: u32,
    p_home: f64,
    p_draw: f64,
    p_away: f64,
    alert: &'a str,
}

/// One line of the run summary, one per league that produced output.
#[derive(Debug, Clone, Serialize)]
pub struct LeagueSummary {
    pub league: String,
    pub code: String,
    pub alerts: usize,
    pub standings_csv: String,
    pub fixtures_csv: String,
    pub workbook: Option<String>,
}

pub fn standings_file_name(code: &str) -> String {
    format!("standings_{code}.csv")
}

pub fn fixtures_file_name(code: &str) -> String {
    format!("fixtures_probs_{code}.csv")
}

pub const SUMMARY_FILE: &str = "summary.csv";

pub fn write_standings_csv(path: &Path, rows: &[StandingsRow]) -> Result<()> {
    let mut writer = open_writer(path)?;
    for row in rows {
        writer
            .serialize(StandingsRecord {
                position: row.position,
                team_id: row.team_id,
                team: &row.team_name,
                tla: row.tla.as_deref().unwrap_or_default(),
                played: row.played,
                won: row.won,
                draw: row.draw,
                lost: row.lost,
                gf: row.goals_for,
                ga: row.goals_against,
                gd: row.goal_difference,
                points: row.points,
                form: row.form.as_deref().unwrap_or_default(),
            })
            .context("write standings row")?;
    }
    writer.flush().context("flush standings csv")?;
    Ok(())
}

pub fn write_predictions_csv(path: &Path, rows: &[PredictionRow]) -> Result<()> {
    let mut writer = open_writer(path)?;
    for row in rows {
        writer
            .serialize(PredictionRecord {
                utc_date: row.kickoff.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                matchday: row.matchday,
                home: &row.home_team,
                home_pos: row.home_position,
                away: &row.away_team,
                away_pos: row.away_position,
                p_home: round3(row.p_home),
                p_draw: round3(row.p_draw),
                p_away: round3(row.p_away),
                alert: row.alert_label(),
            })
            .context("write prediction row")?;
    }
    writer.flush().context("flush predictions csv")?;
    Ok(())
}

pub fn write_summary_csv(path: &Path, rows: &[LeagueSummary]) -> Result<()> {
    let mut writer = open_writer(path)?;
    for row in rows {
        writer.serialize(row).context("write summary row")?;
    }
    writer.flush().context("flush summary csv")?;
    Ok(())
}

pub fn ensure_out_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed creating output dir {}", dir.display()))
}

fn open_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("failed opening {}", path.display()))
}

pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
