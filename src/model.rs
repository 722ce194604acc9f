use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of a league table as delivered by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team_id: u32,
    pub team_name: String,
    #[serde(default)]
    pub tla: Option<String>,
    pub position: u32,
    pub played: u32,
    #[serde(default)]
    pub won: u32,
    #[serde(default)]
    pub draw: u32,
    #[serde(default)]
    pub lost: u32,
    #[serde(default)]
    pub goals_for: u32,
    #[serde(default)]
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: u32,
    #[serde(default)]
    pub form: Option<String>,
}

impl StandingsRow {
    /// Row with only the fields the rater reads; the rest are zeroed.
    pub fn basic(
        team_id: u32,
        team_name: &str,
        position: u32,
        played: u32,
        points: u32,
        goal_difference: i32,
    ) -> Self {
        Self {
            team_id,
            team_name: team_name.to_string(),
            tla: None,
            position,
            played,
            won: 0,
            draw: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference,
            points,
            form: None,
        }
    }
}

/// Snapshot-relative strength of one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRating {
    pub team_id: u32,
    pub team_name: String,
    pub position: u32,
    pub rating: f64,
    pub points: u32,
    pub played: u32,
    pub goal_difference: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub match_id: u64,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub matchday: Option<u32>,
    pub status: String,
}

pub const TOP_VS_BOTTOM_LABEL: &str = "Top-3 vs Bottom-3";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub match_id: u64,
    pub kickoff: DateTime<Utc>,
    pub matchday: Option<u32>,
    pub home_team_id: u32,
    pub home_team: String,
    pub home_position: u32,
    pub away_team_id: u32,
    pub away_team: String,
    pub away_position: u32,
    pub p_home: f64,
    pub p_draw: f64,
    pub p_away: f64,
    pub is_top_vs_bottom: bool,
}

impl PredictionRow {
    pub fn alert_label(&self) -> &'static str {
        if self.is_top_vs_bottom {
            TOP_VS_BOTTOM_LABEL
        } else {
            ""
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("duplicate team id {0} in standings")]
    DuplicateTeam(u32),
    #[error("standings positions are not a permutation of 1..={expected_max}: found {found}")]
    BadPosition { expected_max: u32, found: u32 },
    #[error("fixture {0} lists the same team on both sides")]
    SelfFixture(u64),
}

/// Checks the invariants the rater and the classifier rely on.
pub fn validate_snapshot(rows: &[StandingsRow]) -> Result<(), DataError> {
    let n = rows.len() as u32;
    let mut ids = HashSet::with_capacity(rows.len());
    let mut positions = HashSet::with_capacity(rows.len());
    for row in rows {
        if !ids.insert(row.team_id) {
            return Err(DataError::DuplicateTeam(row.team_id));
        }
        if row.position == 0 || row.position > n || !positions.insert(row.position) {
            return Err(DataError::BadPosition {
                expected_max: n,
                found: row.position,
            });
        }
    }
    Ok(())
}

pub fn validate_fixture(fixture: &Fixture) -> Result<(), DataError> {
    if fixture.home_team_id == fixture.away_team_id {
        return Err(DataError::SelfFixture(fixture.match_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_snapshot_is_valid() {
        let rows = vec![
            StandingsRow::basic(10, "A", 2, 5, 7, 1),
            StandingsRow::basic(11, "B", 1, 5, 9, 3),
            StandingsRow::basic(12, "C", 3, 5, 2, -4),
        ];
        assert_eq!(validate_snapshot(&rows), Ok(()));
        assert_eq!(validate_snapshot(&[]), Ok(()));
    }

    #[test]
    fn duplicate_ids_and_gaps_are_rejected() {
        let dup = vec![
            StandingsRow::basic(10, "A", 1, 5, 7, 1),
            StandingsRow::basic(10, "A again", 2, 5, 3, 0),
        ];
        assert_eq!(validate_snapshot(&dup), Err(DataError::DuplicateTeam(10)));

        let gap = vec![
            StandingsRow::basic(1, "A", 1, 5, 7, 1),
            StandingsRow::basic(2, "B", 3, 5, 3, 0),
        ];
        assert_eq!(
            validate_snapshot(&gap),
            Err(DataError::BadPosition {
                expected_max: 2,
                found: 3
            })
        );

        let repeated = vec![
            StandingsRow::basic(1, "A", 1, 5, 7, 1),
            StandingsRow::basic(2, "B", 1, 5, 7, 1),
        ];
        assert!(validate_snapshot(&repeated).is_err());
    }
}
