use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Chart, ChartType, Workbook, Worksheet};

use crate::export::round3;
use crate::model::{PredictionRow, StandingsRow};

const FIXTURE_ROWS_MAX: usize = 30;
const POINTS_SHEET: &str = "Points";

pub fn workbook_file_name(code: &str) -> String {
    format!("league_{code}.xlsx")
}

/// Writes the standings table, the first fixtures with probabilities, and a
/// points-per-team bar chart into one workbook.
pub fn write_league_workbook(
    path: &Path,
    league_title: &str,
    standings: &[StandingsRow],
    predictions: &[PredictionRow],
) -> Result<()> {
    let mut standings_rows = vec![vec![
        "Pos".to_string(),
        "Team".to_string(),
        "Played".to_string(),
        "Points".to_string(),
        "GD".to_string(),
        "Form".to_string(),
    ]];
    for row in standings {
        standings_rows.push(vec![
            row.position.to_string(),
            row.team_name.clone(),
            row.played.to_string(),
            row.points.to_string(),
            row.goal_difference.to_string(),
            row.form.clone().unwrap_or_default(),
        ]);
    }

    let mut fixture_rows = vec![vec![
        "Kickoff (UTC)".to_string(),
        "Matchday".to_string(),
        "Home".to_string(),
        "Home Pos".to_string(),
        "Away".to_string(),
        "Away Pos".to_string(),
        "P(Home)".to_string(),
        "P(Draw)".to_string(),
        "P(Away)".to_string(),
        "Alert".to_string(),
    ]];
    for row in predictions.iter().take(FIXTURE_ROWS_MAX) {
        fixture_rows.push(vec![
            row.kickoff.format("%Y-%m-%d %H:%M").to_string(),
            opt_to_string(row.matchday),
            row.home_team.clone(),
            row.home_position.to_string(),
            row.away_team.clone(),
            row.away_position.to_string(),
            round3(row.p_home).to_string(),
            round3(row.p_draw).to_string(),
            round3(row.p_away).to_string(),
            row.alert_label().to_string(),
        ]);
    }

    let mut by_points: Vec<&StandingsRow> = standings.iter().collect();
    by_points.sort_by_key(|r| r.points);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Standings")?;
        write_rows(sheet, &standings_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Fixtures")?;
        write_rows(sheet, &fixture_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(POINTS_SHEET)?;
        sheet.write_string(0, 0, "Team")?;
        sheet.write_string(0, 1, "Points")?;
        for (idx, row) in by_points.iter().enumerate() {
            let r = idx as u32 + 1;
            sheet.write_string(r, 0, &row.team_name)?;
            sheet.write_number(r, 1, row.points as f64)?;
        }
        if !by_points.is_empty() {
            let last = by_points.len() as u32;
            let mut chart = Chart::new(ChartType::Bar);
            chart
                .add_series()
                .set_categories((POINTS_SHEET, 1, 0, last, 0))
                .set_values((POINTS_SHEET, 1, 1, last, 1));
            let title = format!("{league_title} - Points");
            chart.title().set_name(title.as_str());
            chart.legend().set_hidden();
            sheet.insert_chart(1, 3, &chart)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
