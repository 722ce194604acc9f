use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::http_client::ApiClient;
use crate::leagues::League;
use crate::model::{Fixture, StandingsRow, validate_fixture, validate_snapshot};

const UPCOMING_STATUSES: &str = "SCHEDULED,TIMED";
const TOTAL_TABLE: &str = "TOTAL";

/// Supplier of parsed standings and fixtures for one competition.
pub trait DataSource {
    fn fetch_standings(&self, league: &League) -> Result<Vec<StandingsRow>>;
    fn fetch_fixtures(&self, league: &League, window: &DateWindow) -> Result<Vec<Fixture>>;
}

/// Inclusive kickoff date range sent as `dateFrom`/`dateTo`; never inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn resolve(
        today: NaiveDate,
        days_ahead: u32,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Self> {
        let span = Duration::days(days_ahead as i64);
        let window = match (from, to) {
            (Some(from), Some(to)) => Self { from, to },
            (Some(from), None) => Self {
                from,
                to: from + span,
            },
            (None, Some(to)) => Self { from: today, to },
            (None, None) => Self {
                from: today,
                to: today + span,
            },
        };
        if window.to < window.from {
            bail!("date-to {} is before date-from {}", window.to, window.from);
        }
        Ok(window)
    }
}

pub struct FootballDataClient {
    api: ApiClient,
}

impl FootballDataClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl DataSource for FootballDataClient {
    fn fetch_standings(&self, league: &League) -> Result<Vec<StandingsRow>> {
        let path = format!("/competitions/{}/standings", league.code);
        let body = self
            .api
            .get_json(&path, &[])
            .context("standings request failed")?;
        let rows = parse_standings_json(&body, league.merges_groups())?;
        validate_snapshot(&rows).with_context(|| format!("bad standings for {}", league.code))?;
        Ok(rows)
    }

    fn fetch_fixtures(&self, league: &League, window: &DateWindow) -> Result<Vec<Fixture>> {
        let path = format!("/competitions/{}/matches", league.code);
        let date_from = window.from.to_string();
        let date_to = window.to.to_string();
        let body = self
            .api
            .get_json(
                &path,
                &[
                    ("status", UPCOMING_STATUSES),
                    ("dateFrom", date_from.as_str()),
                    ("dateTo", date_to.as_str()),
                ],
            )
            .context("matches request failed")?;
        parse_matches_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    standings: Vec<StandingsBlock>,
}

#[derive(Debug, Deserialize)]
struct StandingsBlock {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    table: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableRow {
    position: u32,
    team: TeamRef,
    #[serde(default)]
    played_games: u32,
    #[serde(default)]
    won: u32,
    #[serde(default)]
    draw: u32,
    #[serde(default)]
    lost: u32,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    goals_for: u32,
    #[serde(default)]
    goals_against: u32,
    #[serde(default)]
    goal_difference: i32,
    #[serde(default)]
    form: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: Option<u32>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tla: Option<String>,
}

/// Builds one league table from a `/standings` response.
///
/// Without `merge_groups` the first `TOTAL` table is used (or the first table
/// of any kind when no `TOTAL` exists). With it every `TOTAL` table is merged
/// and re-ranked by points, goal difference, goals for, then name.
pub fn parse_standings_json(raw: &str, merge_groups: bool) -> Result<Vec<StandingsRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: StandingsResponse =
        serde_json::from_str(trimmed).context("invalid standings json")?;

    let mut blocks: Vec<StandingsBlock> = data
        .standings
        .into_iter()
        .filter(|b| !b.table.is_empty())
        .collect();
    let has_total = blocks
        .iter()
        .any(|b| b.kind.as_deref() == Some(TOTAL_TABLE));
    if has_total {
        blocks.retain(|b| b.kind.as_deref() == Some(TOTAL_TABLE));
    }
    if !merge_groups {
        blocks.truncate(1);
    }

    let mut rows: Vec<StandingsRow> = blocks
        .into_iter()
        .flat_map(|b| b.table)
        .filter_map(table_row_to_standing)
        .collect();

    if merge_groups {
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.goal_difference.cmp(&a.goal_difference))
                .then(b.goals_for.cmp(&a.goals_for))
                .then(a.team_name.cmp(&b.team_name))
        });
        for (idx, row) in rows.iter_mut().enumerate() {
            row.position = idx as u32 + 1;
        }
    }
    Ok(rows)
}

fn table_row_to_standing(row: TableRow) -> Option<StandingsRow> {
    let team_id = row.team.id?;
    Some(StandingsRow {
        team_id,
        team_name: row.team.name.unwrap_or_default(),
        tla: row.team.tla,
        position: row.position,
        played: row.played_games,
        won: row.won,
        draw: row.draw,
        lost: row.lost,
        goals_for: row.goals_for,
        goals_against: row.goals_against,
        goal_difference: row.goal_difference,
        points: row.points,
        form: row.form.filter(|f| !f.trim().is_empty()),
    })
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    id: u64,
    #[serde(default)]
    utc_date: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    matchday: Option<u32>,
    home_team: TeamRef,
    away_team: TeamRef,
}

/// Parses a `/matches` response, dropping entries without both team ids, a
/// parseable kickoff, or with the same team on both sides.
pub fn parse_matches_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: MatchesResponse = serde_json::from_str(trimmed).context("invalid matches json")?;

    let mut out = Vec::with_capacity(data.matches.len());
    for m in data.matches {
        let id = m.id;
        let Some(fixture) = api_match_to_fixture(m) else {
            debug!(match_id = id, "skipping fixture with missing team or kickoff");
            continue;
        };
        if let Err(err) = validate_fixture(&fixture) {
            debug!(match_id = id, "skipping fixture: {err}");
            continue;
        }
        out.push(fixture);
    }
    Ok(out)
}

fn api_match_to_fixture(m: ApiMatch) -> Option<Fixture> {
    let kickoff = m.utc_date.as_deref().and_then(parse_utc)?;
    Some(Fixture {
        match_id: m.id,
        home_team_id: m.home_team.id?,
        away_team_id: m.away_team.id?,
        home_team: m.home_team.name.unwrap_or_default(),
        away_team: m.away_team.name.unwrap_or_default(),
        kickoff,
        matchday: m.matchday,
        status: m.status.unwrap_or_default(),
    })
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
