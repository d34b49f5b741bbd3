use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::analysis::implied_probabilities;
use crate::http_client::http_client;
use crate::state::League;

const ARCHIVE_BASE_URL: &str = "https://www.football-data.co.uk/mmz4281";
const ARCHIVE_SEASON: &str = "2425";

/// De-vigorized probability gap above which a finished match counts as a
/// clear favorite for the archive table.
const CLEAR_FAVORITE_GAP: f64 = 0.25;
const CLEAR_FAVORITE_LIMIT: usize = 10;

/// One finished match from the season archive, odds already validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRow {
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    /// Full-time result: 'H', 'D' or 'A'.
    pub result: char,
    pub home_odds: f64,
    pub draw_odds: Option<f64>,
    pub away_odds: f64,
}

impl ArchiveRow {
    pub fn winner(&self) -> &str {
        match self.result {
            'H' => &self.home_team,
            'A' => &self.away_team,
            _ => "Draw",
        }
    }

    /// De-vigorized probability gap between the two sides.
    pub fn probability_gap(&self) -> f64 {
        match implied_probabilities(self.home_odds, self.away_odds) {
            Ok((p_home, p_away)) => (p_home - p_away).abs(),
            Err(_) => 0.0,
        }
    }
}

/// Season-level numbers shown above the favorites table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub samples: usize,
    /// Share of matches where the higher implied-probability side won, in
    /// percent, 2 decimals. Draws count against the bookmaker.
    pub bookmaker_precision_pct: f64,
    pub avg_home_odds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveData {
    pub summary: ArchiveSummary,
    /// Most recent clear favorites, newest first.
    pub favorites: Vec<ArchiveRow>,
    /// Rows dropped for missing or invalid odds.
    pub dropped_rows: usize,
}

pub fn archive_url(league: League) -> String {
    format!(
        "{ARCHIVE_BASE_URL}/{ARCHIVE_SEASON}/{}.csv",
        league.csv_code()
    )
}

pub fn fetch_archive(league: League) -> Result<ArchiveData> {
    let url = archive_url(league);
    let client = http_client()?;
    let body = client
        .get(&url)
        .send()
        .with_context(|| format!("archive request failed for {}", league.label()))?
        .error_for_status()
        .with_context(|| format!("archive http error for {}", league.label()))?
        .text()
        .context("failed reading archive body")?;
    parse_archive_csv(&body)
}

/// Parse a football-data.co.uk season CSV.
///
/// Rows missing full-time results or Bet365 match odds are dropped and
/// counted, never fatal; only an unusable header aborts the parse.
pub fn parse_archive_csv(raw: &str) -> Result<ArchiveData> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader.headers().context("archive csv has no header")?;
    let idx = ColumnIndex::from_headers(headers.iter())?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let Ok(record) = record else {
            dropped += 1;
            continue;
        };
        match idx.parse_row(&record) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    let summary = league_summary(&rows);
    let favorites = clear_favorites(&rows);
    Ok(ArchiveData {
        summary,
        favorites,
        dropped_rows: dropped,
    })
}

/// Bookmaker precision and average odds over a season of finished matches.
/// Rows with unusable odds are left out of both numbers entirely.
pub fn league_summary(rows: &[ArchiveRow]) -> ArchiveSummary {
    let mut correct = 0usize;
    let mut counted = 0usize;
    let mut odds_sum = 0.0;
    for row in rows {
        let Ok((p_home, p_away)) = implied_probabilities(row.home_odds, row.away_odds) else {
            continue;
        };
        counted += 1;
        let predicted_home = p_home > p_away;
        if (predicted_home && row.result == 'H') || (!predicted_home && row.result == 'A') {
            correct += 1;
        }
        odds_sum += row.home_odds;
    }

    if counted == 0 {
        return ArchiveSummary {
            samples: 0,
            bookmaker_precision_pct: 0.0,
            avg_home_odds: 0.0,
        };
    }

    let n = counted as f64;
    ArchiveSummary {
        samples: counted,
        bookmaker_precision_pct: round2(correct as f64 / n * 100.0),
        avg_home_odds: round2(odds_sum / n),
    }
}

/// The most recent matches with a clear pre-match favorite, newest first.
pub fn clear_favorites(rows: &[ArchiveRow]) -> Vec<ArchiveRow> {
    rows.iter()
        .rev()
        .filter(|row| row.probability_gap() > CLEAR_FAVORITE_GAP)
        .take(CLEAR_FAVORITE_LIMIT)
        .cloned()
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

struct ColumnIndex {
    date: usize,
    home_team: usize,
    away_team: usize,
    home_goals: usize,
    away_goals: usize,
    result: usize,
    home_odds: usize,
    draw_odds: Option<usize>,
    away_odds: usize,
}

impl ColumnIndex {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut date = None;
        let mut home_team = None;
        let mut away_team = None;
        let mut home_goals = None;
        let mut away_goals = None;
        let mut result = None;
        let mut home_odds = None;
        let mut draw_odds = None;
        let mut away_odds = None;

        for (i, name) in headers.enumerate() {
            match name.trim() {
                "Date" => date = Some(i),
                "HomeTeam" => home_team = Some(i),
                "AwayTeam" => away_team = Some(i),
                "FTHG" => home_goals = Some(i),
                "FTAG" => away_goals = Some(i),
                "FTR" => result = Some(i),
                "B365H" => home_odds = Some(i),
                "B365D" => draw_odds = Some(i),
                "B365A" => away_odds = Some(i),
                _ => {}
            }
        }

        Ok(Self {
            date: date.ok_or_else(|| missing("Date"))?,
            home_team: home_team.ok_or_else(|| missing("HomeTeam"))?,
            away_team: away_team.ok_or_else(|| missing("AwayTeam"))?,
            home_goals: home_goals.ok_or_else(|| missing("FTHG"))?,
            away_goals: away_goals.ok_or_else(|| missing("FTAG"))?,
            result: result.ok_or_else(|| missing("FTR"))?,
            home_odds: home_odds.ok_or_else(|| missing("B365H"))?,
            draw_odds,
            away_odds: away_odds.ok_or_else(|| missing("B365A"))?,
        })
    }

    fn parse_row(&self, record: &csv::StringRecord) -> Option<ArchiveRow> {
        let field = |i: usize| record.get(i).map(str::trim);
        let home_odds = field(self.home_odds)?.parse::<f64>().ok()?;
        let away_odds = field(self.away_odds)?.parse::<f64>().ok()?;
        if implied_probabilities(home_odds, away_odds).is_err() {
            return None;
        }
        let result = field(self.result)?.chars().next()?;
        if !matches!(result, 'H' | 'D' | 'A') {
            return None;
        }

        Some(ArchiveRow {
            date: field(self.date)?.to_string(),
            home_team: field(self.home_team)?.to_string(),
            away_team: field(self.away_team)?.to_string(),
            home_goals: field(self.home_goals)?.parse().ok()?,
            away_goals: field(self.away_goals)?.parse().ok()?,
            result,
            home_odds,
            draw_odds: self
                .draw_odds
                .and_then(|i| field(i))
                .and_then(|v| v.parse::<f64>().ok()),
            away_odds,
        })
    }
}

fn missing(column: &str) -> anyhow::Error {
    anyhow!("archive csv is missing the {column} column")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(result: char, home_odds: f64, away_odds: f64) -> ArchiveRow {
        ArchiveRow {
            date: "01/02/2025".to_string(),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            home_goals: 1,
            away_goals: 0,
            result,
            home_odds,
            draw_odds: Some(3.4),
            away_odds,
        }
    }

    #[test]
    fn summary_counts_correct_favorites() {
        // Two favorites that won, one that lost, one draw.
        let rows = vec![
            row('H', 1.5, 6.0),
            row('A', 5.0, 1.6),
            row('A', 1.4, 7.0),
            row('D', 1.8, 4.0),
        ];
        let summary = league_summary(&rows);
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.bookmaker_precision_pct, 50.0);
    }

    #[test]
    fn summary_leaves_out_rows_with_unusable_odds() {
        let rows = vec![
            row('H', 1.5, 6.0),
            // Odds at or below even never reach the summary numbers.
            row('H', 1.0, 5.0),
        ];
        let summary = league_summary(&rows);
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.bookmaker_precision_pct, 100.0);
        assert_eq!(summary.avg_home_odds, 1.5);
    }

    #[test]
    fn favorites_are_newest_first_and_capped() {
        let mut rows: Vec<ArchiveRow> = (0..15).map(|_| row('H', 1.2, 9.0)).collect();
        rows[14].home_team = "Newest".to_string();
        // A tight match never qualifies.
        rows.push(row('H', 2.0, 2.05));

        let favorites = clear_favorites(&rows);
        assert_eq!(favorites.len(), CLEAR_FAVORITE_LIMIT);
        assert_eq!(favorites[0].home_team, "Newest");
    }

    #[test]
    fn winner_follows_result() {
        assert_eq!(row('H', 1.5, 5.0).winner(), "Home");
        assert_eq!(row('A', 1.5, 5.0).winner(), "Away");
        assert_eq!(row('D', 1.5, 5.0).winner(), "Draw");
    }
}
