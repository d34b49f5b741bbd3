use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recency weights for the last five form tokens, most recent first.
const FORM_WEIGHTS: [f64; 5] = [5.0, 4.0, 3.0, 2.0, 1.0];
/// Maximum weighted form sum: five wins, 3 * (5+4+3+2+1).
const FORM_NORMALIZER: f64 = 45.0;

const SAFETY_MIN: f64 = 0.0;
const SAFETY_MAX: f64 = 100.0;
/// Scale applied to the form advantage inside the safety score.
const FORM_TERM_SCALE: f64 = 2000.0;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("decimal odds must be finite and greater than 1.0, got {0}")]
    InvalidOdds(f64),
}

/// One match as handed over by a data-fetch collaborator.
///
/// Odds are decimal and must be finite and strictly greater than 1.0; records
/// violating that are skipped (with a warning) by [`analyze_matches`] rather
/// than poisoning the batch. Form strings are comma-separated `v`/`n`/`d`
/// tokens, most recent first, case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub home_odds: f64,
    pub away_odds: f64,
    #[serde(default)]
    pub kickoff: Option<String>,
    #[serde(default)]
    pub home_form: Option<String>,
    #[serde(default)]
    pub away_form: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// A match annotated with every derived field the display layer shows.
#[derive(Debug, Clone)]
pub struct AnalyzedMatch {
    pub record: MatchRecord,
    /// De-vigorized implied probabilities; sum to 1.0 by construction.
    pub implied_prob_home: f64,
    pub implied_prob_away: f64,
    pub form_home: f64,
    pub form_away: f64,
    pub safety_score: f64,
    pub predicted_winner: Side,
    /// Sigmoid win probability of the predicted side.
    pub win_probability: f64,
    /// Kelly stake in currency units against the full budget.
    pub recommended_stake: f64,
}

impl AnalyzedMatch {
    pub fn predicted_team(&self) -> &str {
        match self.predicted_winner {
            Side::Home => &self.record.home_team,
            Side::Away => &self.record.away_team,
        }
    }

    pub fn predicted_odds(&self) -> f64 {
        match self.predicted_winner {
            Side::Home => self.record.home_odds,
            Side::Away => self.record.away_odds,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub rows: Vec<AnalyzedMatch>,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// De-vigorized implied probabilities for a two-way market.
///
/// Raw probability per side is `1/odds`; both are normalized by their sum,
/// which removes the bookmaker margin and makes the pair sum to exactly 1.0.
pub fn implied_probabilities(home_odds: f64, away_odds: f64) -> Result<(f64, f64), AnalysisError> {
    for odds in [home_odds, away_odds] {
        if !odds.is_finite() || odds <= 1.0 {
            return Err(AnalysisError::InvalidOdds(odds));
        }
    }
    let raw_home = 1.0 / home_odds;
    let raw_away = 1.0 / away_odds;
    let sum = raw_home + raw_away;
    Ok((raw_home / sum, raw_away / sum))
}

/// Recency-weighted form score in [0,1].
///
/// Tokens map v→3, n→1, d→0; anything unrecognized counts as 0. Only the
/// first five tokens are weighted; shorter strings behave as if padded with
/// `d`. The normalizer is the true maximum weighted sum (45), so a run of
/// five wins scores exactly 1.0.
pub fn form_score(raw: &str) -> f64 {
    let weighted: f64 = raw
        .split(',')
        .take(FORM_WEIGHTS.len())
        .zip(FORM_WEIGHTS)
        .map(|(token, weight)| weight * token_value(token))
        .sum();
    weighted / FORM_NORMALIZER
}

fn token_value(token: &str) -> f64 {
    match token.trim().to_ascii_lowercase().as_str() {
        "v" => 3.0,
        "n" => 1.0,
        _ => 0.0,
    }
}

/// Composite safety score in [0,100].
///
/// Sum of an odds-spread term, `40 / |home_odds - away_odds + 0.01|`, and a
/// form-advantage term, `2000 * (form_home - form_away)`. The terms are not
/// proportion-normalized, so either can saturate the clamp on its own; this
/// is a coarse ranking heuristic, not a calibrated probability. The +0.01
/// keeps equal odds from dividing by zero, and an exact zero denominator
/// clamps to 100 rather than producing NaN.
pub fn safety_score(home_odds: f64, away_odds: f64, form_home: f64, form_away: f64) -> f64 {
    let gap_term = 40.0 / (home_odds - away_odds + 0.01).abs();
    let form_term = FORM_TERM_SCALE * (form_home - form_away);
    (gap_term + form_term).clamp(SAFETY_MIN, SAFETY_MAX)
}

/// Win probabilities from a safety score via a saturating sigmoid.
///
/// `p_home = 1 / (1 + exp(100 - 2*score))` with the score clamped to [0,100]
/// first, so the exponent stays in [-100,100] and never overflows. Midpoint
/// at score 50, saturation toward 0/1 at the extremes.
pub fn win_probability(score: f64) -> (f64, f64) {
    let score = if score.is_finite() {
        score.clamp(SAFETY_MIN, SAFETY_MAX)
    } else {
        SAFETY_MAX / 2.0
    };
    let p_home = 1.0 / (1.0 + (SAFETY_MAX - 2.0 * score).exp());
    (p_home, 1.0 - p_home)
}

/// Kelly-criterion stake against the full budget, rounded to 2 decimals.
///
/// `b = odds - 1`, `f = max((b*p - q)/b, 0)`, stake = `f * budget`. Callers
/// uphold `odds > 1.0` by validating through [`implied_probabilities`]
/// first; if that invariant is ever broken the function returns 0.0 instead
/// of dividing by zero. The budget cap is applied after rounding, so a
/// sub-cent budget is never exceeded by the rounded stake. Each match is
/// sized independently against the same total (no cross-match allocation).
pub fn kelly_stake(odds: f64, win_probability: f64, budget: f64) -> f64 {
    let b = odds - 1.0;
    if !b.is_finite() || b <= 0.0 || !win_probability.is_finite() || !budget.is_finite() {
        return 0.0;
    }
    let p = win_probability.clamp(0.0, 1.0);
    let fraction = ((b * p - (1.0 - p)) / b).max(0.0);
    let stake = fraction * budget.max(0.0);
    ((stake * 100.0).round() / 100.0).min(budget.max(0.0))
}

/// Analyze a batch of records against a total budget.
///
/// Invalid records are skipped and reported, never propagated as corrupted
/// numbers; one bad record does not abort the rest. The output is
/// stable-sorted descending by safety score, so ties keep their input order.
/// Empty input yields an empty report. Pure: re-running on identical input
/// yields identical output.
pub fn analyze_matches(records: &[MatchRecord], total_budget: f64) -> AnalysisReport {
    let mut report = AnalysisReport::default();

    for record in records {
        let (implied_home, implied_away) =
            match implied_probabilities(record.home_odds, record.away_odds) {
                Ok(pair) => pair,
                Err(err) => {
                    report.skipped += 1;
                    report.warnings.push(format!(
                        "skipped {} vs {}: {err}",
                        record.home_team, record.away_team
                    ));
                    continue;
                }
            };

        let form_home = record.home_form.as_deref().map(form_score).unwrap_or(0.0);
        let form_away = record.away_form.as_deref().map(form_score).unwrap_or(0.0);
        let safety = safety_score(record.home_odds, record.away_odds, form_home, form_away);
        let (p_home, p_away) = win_probability(safety);

        let (predicted_winner, win_prob, odds) = if p_home >= p_away {
            (Side::Home, p_home, record.home_odds)
        } else {
            (Side::Away, p_away, record.away_odds)
        };
        let stake = kelly_stake(odds, win_prob, total_budget);

        report.rows.push(AnalyzedMatch {
            record: record.clone(),
            implied_prob_home: implied_home,
            implied_prob_away: implied_away,
            form_home,
            form_away,
            safety_score: safety,
            predicted_winner,
            win_probability: win_prob,
            recommended_stake: stake,
        });
    }

    report.rows.sort_by(|a, b| {
        b.safety_score
            .partial_cmp(&a.safety_score)
            .unwrap_or(Ordering::Equal)
    });
    report
}
