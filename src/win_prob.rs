use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{Fixture, PredictionRow, TeamRating};

const BASE_DRAW: f64 = 0.24;
const LOGISTIC_SCALE: f64 = 1.20;
const HOME_ADVANTAGE: f64 = 0.15;

const TOP_N: u32 = 3;

/// Constants of the Bradley-Terry model with an adaptive draw term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub base_draw: f64,
    pub k: f64,
    pub home_advantage: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            base_draw: BASE_DRAW,
            k: LOGISTIC_SCALE,
            home_advantage: HOME_ADVANTAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbs {
    pub p_home: f64,
    pub p_draw: f64,
    pub p_away: f64,
}

/// Home/draw/away probabilities for two snapshot ratings.
///
/// The logistic of the advantage-adjusted gap splits home vs away; the draw
/// mass decays as `exp(-|delta|)` so mismatches draw less. The three raw
/// terms are renormalized, so the result always sums to one.
pub fn outcome_probabilities(home_rating: f64, away_rating: f64, params: &ModelParams) -> OutcomeProbs {
    let delta = (home_rating - away_rating) + params.home_advantage;
    let p_home_raw = logistic(params.k * delta);
    let p_away_raw = 1.0 - p_home_raw;
    let p_draw_raw = params.base_draw * (-delta.abs()).exp();

    let z = p_home_raw + p_away_raw + p_draw_raw;
    OutcomeProbs {
        p_home: p_home_raw / z,
        p_draw: p_draw_raw / z,
        p_away: p_away_raw / z,
    }
}

/// Top-3 vs bottom-3 by table position in a league of `n_teams`.
///
/// Leagues with fewer than five teams have overlapping top and bottom sets;
/// the rule is applied as-is there.
pub fn is_top_vs_bottom(home_position: u32, away_position: u32, n_teams: u32) -> bool {
    let bottom_cut = n_teams.saturating_sub(TOP_N - 1);
    (home_position <= TOP_N && away_position >= bottom_cut)
        || (away_position <= TOP_N && home_position >= bottom_cut)
}

pub fn predict_fixtures(fixtures: &[Fixture], ratings: &[TeamRating]) -> Vec<PredictionRow> {
    predict_fixtures_with(fixtures, ratings, &ModelParams::default())
}

/// Joins fixtures with ratings and returns display-ordered predictions.
///
/// Fixtures naming a team missing from `ratings` are dropped.
pub fn predict_fixtures_with(
    fixtures: &[Fixture],
    ratings: &[TeamRating],
    params: &ModelParams,
) -> Vec<PredictionRow> {
    let by_id: HashMap<u32, &TeamRating> = ratings.iter().map(|r| (r.team_id, r)).collect();
    let n_teams = ratings.iter().map(|r| r.position).max().unwrap_or(0);

    let mut rows: Vec<PredictionRow> = fixtures
        .iter()
        .filter_map(|f| {
            let home = by_id.get(&f.home_team_id)?;
            let away = by_id.get(&f.away_team_id)?;
            let probs = outcome_probabilities(home.rating, away.rating, params);
            Some(PredictionRow {
                match_id: f.match_id,
                kickoff: f.kickoff,
                matchday: f.matchday,
                home_team_id: home.team_id,
                home_team: home.team_name.clone(),
                home_position: home.position,
                away_team_id: away.team_id,
                away_team: away.team_name.clone(),
                away_position: away.position,
                p_home: probs.p_home,
                p_draw: probs.p_draw,
                p_away: probs.p_away,
                is_top_vs_bottom: is_top_vs_bottom(home.position, away.position, n_teams),
            })
        })
        .collect();

    rows.sort_by(display_order);
    rows
}

fn display_order(a: &PredictionRow, b: &PredictionRow) -> Ordering {
    b.is_top_vs_bottom
        .cmp(&a.is_top_vs_bottom)
        .then(a.kickoff.cmp(&b.kickoff))
        .then(matchday_order(a.matchday, b.matchday))
}

// Missing matchdays sort last.
fn matchday_order(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn rating(id: u32, position: u32, rating: f64) -> TeamRating {
        TeamRating {
            team_id: id,
            team_name: format!("T{id}"),
            position,
            rating,
            points: 0,
            played: 0,
            goal_difference: 0,
        }
    }

    fn fixture(id: u64, home: u32, away: u32, hour: u32, matchday: Option<u32>) -> Fixture {
        Fixture {
            match_id: id,
            home_team_id: home,
            away_team_id: away,
            home_team: String::new(),
            away_team: String::new(),
            kickoff: Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap(),
            matchday,
            status: "SCHEDULED".to_string(),
        }
    }

    #[test]
    fn equal_ratings_favor_home() {
        let p = outcome_probabilities(0.0, 0.0, &ModelParams::default());
        assert!(p.p_home > p.p_away);
        assert!((p.p_home + p.p_draw + p.p_away - 1.0).abs() < 1e-12);
    }

    #[test]
    fn known_values_for_equal_ratings() {
        // delta = 0.15: sigmoid(0.18) and 0.24 * exp(-0.15).
        let p = outcome_probabilities(0.0, 0.0, &ModelParams::default());
        let home_raw = 1.0 / (1.0 + (-0.18f64).exp());
        let draw_raw = 0.24 * (-0.15f64).exp();
        let z = 1.0 + draw_raw;
        assert!((p.p_home - home_raw / z).abs() < 1e-12);
        assert!((p.p_draw - draw_raw / z).abs() < 1e-12);
        assert!((p.p_away - (1.0 - home_raw) / z).abs() < 1e-12);
    }

    #[test]
    fn draw_shrinks_with_gap() {
        let params = ModelParams::default();
        let close = outcome_probabilities(0.1, 0.0, &params);
        let far = outcome_probabilities(2.0, -2.0, &params);
        assert!(far.p_draw < close.p_draw);
    }

    #[test]
    fn top_vs_bottom_rule() {
        assert!(is_top_vs_bottom(1, 20, 20));
        assert!(is_top_vs_bottom(18, 3, 20));
        assert!(!is_top_vs_bottom(4, 20, 20));
        assert!(!is_top_vs_bottom(1, 17, 20));
        assert!(!is_top_vs_bottom(1, 2, 20));
    }

    #[test]
    fn small_leagues_apply_rule_mechanically() {
        // N = 4: bottom cut is 2, so 1 vs 2 counts.
        assert!(is_top_vs_bottom(1, 2, 4));
        // N = 1 or 2: saturating cut of 0 flags every pairing with a top-3 team.
        assert!(is_top_vs_bottom(1, 2, 2));
    }

    #[test]
    fn orphan_fixtures_are_dropped() {
        let ratings = vec![rating(1, 1, 0.5), rating(2, 2, -0.5)];
        let fixtures = vec![fixture(1, 1, 2, 12, Some(1)), fixture(2, 1, 99, 12, Some(1))];
        let out = predict_fixtures(&fixtures, &ratings);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].match_id, 1);
    }

    #[test]
    fn flagged_first_then_kickoff_then_matchday() {
        let ratings: Vec<TeamRating> = (1..=20).map(|i| rating(i, i, 0.0)).collect();
        let fixtures = vec![
            fixture(1, 5, 6, 10, Some(3)),
            fixture(2, 1, 20, 18, Some(3)),
            fixture(3, 7, 8, 10, Some(2)),
            fixture(4, 19, 2, 12, Some(3)),
            fixture(5, 9, 10, 8, None),
            fixture(6, 11, 12, 8, Some(4)),
        ];
        let ids: Vec<u64> = predict_fixtures(&fixtures, &ratings)
            .iter()
            .map(|r| r.match_id)
            .collect();
        assert_eq!(ids, vec![4, 2, 6, 5, 3, 1]);
    }

    #[test]
    fn empty_ratings_predict_nothing() {
        let fixtures = vec![fixture(1, 1, 2, 12, Some(1))];
        assert!(predict_fixtures(&fixtures, &[]).is_empty());
    }
}
