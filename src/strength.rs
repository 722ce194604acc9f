use crate::model::{StandingsRow, TeamRating};

const PPG_WEIGHT: f64 = 0.7;
const GDG_WEIGHT: f64 = 0.3;

const CLIP_LOWER_Q: f64 = 0.05;
const CLIP_UPPER_Q: f64 = 0.95;

/// Rates every team of a standings snapshot.
///
/// Points per game and goal difference per game are z-scored across the
/// snapshot, blended 70/30 and winsorized to the 5th/95th percentile of the
/// blended values. Ratings only mean something relative to the same snapshot.
pub fn rate_teams(standings: &[StandingsRow]) -> Vec<TeamRating> {
    if standings.is_empty() {
        return Vec::new();
    }

    let ppg_raw: Vec<Option<f64>> = standings
        .iter()
        .map(|row| per_game(row.points as f64, row.played))
        .collect();
    let defined: Vec<f64> = ppg_raw.iter().filter_map(|v| *v).collect();
    let ppg_fill = median(&defined).unwrap_or(0.0);

    let ppg: Vec<f64> = ppg_raw.iter().map(|v| v.unwrap_or(ppg_fill)).collect();
    let gdg: Vec<f64> = standings
        .iter()
        .map(|row| per_game(row.goal_difference as f64, row.played).unwrap_or(0.0))
        .collect();

    let z_ppg = z_scores(&ppg);
    let z_gdg = z_scores(&gdg);

    let raw: Vec<f64> = z_ppg
        .iter()
        .zip(&z_gdg)
        .map(|(p, g)| PPG_WEIGHT * p + GDG_WEIGHT * g)
        .collect();

    let mut sorted = raw.clone();
    sorted.sort_by(f64::total_cmp);
    let lo = quantile(&sorted, CLIP_LOWER_Q);
    let hi = quantile(&sorted, CLIP_UPPER_Q);

    standings
        .iter()
        .zip(raw)
        .map(|(row, rating)| TeamRating {
            team_id: row.team_id,
            team_name: row.team_name.clone(),
            position: row.position,
            rating: rating.max(lo).min(hi),
            points: row.points,
            played: row.played,
            goal_difference: row.goal_difference,
        })
        .collect()
}

fn per_game(total: f64, played: u32) -> Option<f64> {
    if played == 0 {
        None
    } else {
        Some(total / played as f64)
    }
}

fn z_scores(values: &[f64]) -> Vec<f64> {
    let (mu, sd) = mean_and_std(values);
    values.iter().map(|v| (v - mu) / sd).collect()
}

/// Mean and population std-dev, with a zero spread reported as `1.0`.
///
/// A constant column returns its value as the mean so every deviation is
/// exactly zero, regardless of how the sum rounds.
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let Some(&first) = values.first() else {
        return (0.0, 1.0);
    };
    if values.iter().all(|v| *v == first) {
        return (first, 1.0);
    }
    let mu = mean(values);
    let sd = population_std(values, mu);
    (mu, if sd == 0.0 { 1.0 } else { sd })
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0) around a precomputed mean.
pub fn population_std(values: &[f64], mu: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(quantile(&sorted, 0.5))
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = h.floor() as usize;
            let hi = h.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
        }
    }
}
