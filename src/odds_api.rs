use std::cmp::Ordering;
use std::env;

use anyhow::{Context, Result, anyhow};
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::analysis::MatchRecord;
use crate::http_client::http_client;
use crate::state::League;

const API_BASE_URL: &str = "https://api.the-odds-api.com/v4/sports";

#[derive(Debug, Clone)]
pub struct OddsApiConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub regions: String,
}

impl OddsApiConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("ODDS_ENABLED")
            .map(|v| {
                let t = v.trim().to_ascii_lowercase();
                !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
            })
            .unwrap_or(true);
        let api_key = env::var("ODDS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let regions = env::var("ODDS_REGIONS")
            .unwrap_or_else(|_| "eu".to_string())
            .trim()
            .to_ascii_lowercase();
        Self {
            enabled,
            api_key,
            regions,
        }
    }

    pub fn is_live(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct OddsEvent {
    pub commence_time: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
pub struct OddsBookmaker {
    #[serde(default)]
    pub markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
pub struct OddsMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct OddsOutcome {
    pub name: String,
    pub price: f64,
}

/// Fetch upcoming h2h odds for a league and turn them into match records.
pub fn fetch_upcoming_records(league: League, cfg: &OddsApiConfig) -> Result<Vec<MatchRecord>> {
    let Some(api_key) = cfg.api_key.as_ref() else {
        return Err(anyhow!("ODDS_API_KEY missing"));
    };

    let url = format!("{API_BASE_URL}/{}/odds", league.sport_key());
    let client = http_client()?;
    let resp = client
        .get(&url)
        .query(&[
            ("apiKey", api_key.as_str()),
            ("regions", cfg.regions.as_str()),
            ("markets", "h2h"),
            ("oddsFormat", "decimal"),
            ("dateFormat", "iso"),
        ])
        .header(USER_AGENT, "betmax-terminal/0.1")
        .send()
        .context("odds request failed")?;

    let status = resp.status();
    let body = resp.text().context("failed reading odds body")?;
    if !status.is_success() {
        let snippet = body
            .trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(220)
            .collect::<String>();
        return Err(anyhow!("odds http {status}: {snippet}"));
    }

    parse_upcoming_records(league, &body)
}

/// Parse an odds API payload into records, one per event with a usable
/// two-way price pair. Events without one are silently skipped.
pub fn parse_upcoming_records(league: League, body: &str) -> Result<Vec<MatchRecord>> {
    let events: Vec<OddsEvent> = serde_json::from_str(body).context("invalid odds json")?;
    Ok(events
        .iter()
        .filter_map(|event| event_to_record(league, event))
        .collect())
}

fn event_to_record(league: League, event: &OddsEvent) -> Option<MatchRecord> {
    let mut home_prices = Vec::new();
    let mut away_prices = Vec::new();

    for bookmaker in &event.bookmakers {
        let Some(market) = bookmaker
            .markets
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case("h2h"))
        else {
            continue;
        };
        let Some((home, away)) =
            extract_side_prices(&market.outcomes, &event.home_team, &event.away_team)
        else {
            continue;
        };
        home_prices.push(home);
        away_prices.push(away);
    }

    let home_odds = median_f64(&home_prices)?;
    let away_odds = median_f64(&away_prices)?;

    Some(MatchRecord {
        league: league.label().to_string(),
        home_team: event.home_team.clone(),
        away_team: event.away_team.clone(),
        home_odds,
        away_odds,
        kickoff: event.commence_time.clone(),
        home_form: None,
        away_form: None,
    })
}

fn extract_side_prices(
    outcomes: &[OddsOutcome],
    home_team: &str,
    away_team: &str,
) -> Option<(f64, f64)> {
    let mut home = None;
    let mut away = None;
    for outcome in outcomes {
        let name = outcome.name.trim();
        if name.eq_ignore_ascii_case(home_team.trim()) {
            home = Some(outcome.price);
        } else if name.eq_ignore_ascii_case(away_team.trim()) {
            away = Some(outcome.price);
        }
    }
    match (home, away) {
        (Some(home), Some(away)) if home > 1.0 && away > 1.0 => Some((home, away)),
        _ => None,
    }
}

fn median_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS_JSON: &str = r#"[
        {
            "commence_time": "2025-02-14T20:00:00Z",
            "home_team": "Lyon",
            "away_team": "Nice",
            "bookmakers": [
                {"markets": [{"key": "h2h", "outcomes": [
                    {"name": "Lyon", "price": 1.80},
                    {"name": "Draw", "price": 3.60},
                    {"name": "Nice", "price": 4.40}
                ]}]},
                {"markets": [{"key": "h2h", "outcomes": [
                    {"name": "Lyon", "price": 1.90},
                    {"name": "Nice", "price": 4.20}
                ]}]},
                {"markets": [{"key": "h2h", "outcomes": [
                    {"name": "Lyon", "price": 1.85},
                    {"name": "Nice", "price": 4.30}
                ]}]}
            ]
        },
        {
            "commence_time": null,
            "home_team": "Lens",
            "away_team": "Brest",
            "bookmakers": []
        }
    ]"#;

    #[test]
    fn parses_events_with_median_prices() {
        let records = parse_upcoming_records(League::Ligue1, EVENTS_JSON).expect("valid json");
        // The second event has no bookmakers and is skipped.
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.home_team, "Lyon");
        assert_eq!(rec.away_team, "Nice");
        assert_eq!(rec.home_odds, 1.85);
        assert_eq!(rec.away_odds, 4.30);
        assert_eq!(rec.league, "Ligue 1");
        assert_eq!(rec.kickoff.as_deref(), Some("2025-02-14T20:00:00Z"));
    }

    #[test]
    fn rejects_outcomes_at_or_below_even() {
        let outcomes = vec![
            OddsOutcome {
                name: "Lyon".to_string(),
                price: 1.0,
            },
            OddsOutcome {
                name: "Nice".to_string(),
                price: 4.0,
            },
        ];
        assert!(extract_side_prices(&outcomes, "Lyon", "Nice").is_none());
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        assert_eq!(median_f64(&[2.0, 1.0, 3.0]), Some(2.0));
        assert_eq!(median_f64(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median_f64(&[]), None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_upcoming_records(League::Ligue1, "not json").is_err());
    }
}
