use std::collections::{HashMap, VecDeque};
use std::env;

use crate::analysis::{self, AnalyzedMatch, MatchRecord, Side};
use crate::archive_fetch::ArchiveData;
use crate::form_store::{self, FormStore};

const LOG_CAP: usize = 200;
const DEFAULT_BUDGET: f64 = 100.0;
const BUDGET_STEP: f64 = 10.0;
const BUDGET_MAX: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum League {
    Ligue1,
    PremierLeague,
    LaLiga,
}

impl League {
    pub const ALL: [League; 3] = [League::Ligue1, League::PremierLeague, League::LaLiga];

    pub fn label(self) -> &'static str {
        match self {
            League::Ligue1 => "Ligue 1",
            League::PremierLeague => "Premier League",
            League::LaLiga => "La Liga",
        }
    }

    /// football-data.co.uk file code for the season archive.
    pub fn csv_code(self) -> &'static str {
        match self {
            League::Ligue1 => "F1",
            League::PremierLeague => "E0",
            League::LaLiga => "SP1",
        }
    }

    /// the-odds-api.com sport key.
    pub fn sport_key(self) -> &'static str {
        match self {
            League::Ligue1 => "soccer_france_ligue_one",
            League::PremierLeague => "soccer_epl",
            League::LaLiga => "soccer_spain_la_liga",
        }
    }

    pub fn next(self) -> League {
        match self {
            League::Ligue1 => League::PremierLeague,
            League::PremierLeague => League::LaLiga,
            League::LaLiga => League::Ligue1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Board,
    Archive,
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchUpcoming(League),
    FetchArchive(League),
}

#[derive(Debug, Clone)]
pub enum Delta {
    Upcoming {
        league: League,
        source: String,
        records: Vec<MatchRecord>,
    },
    Archive {
        league: League,
        data: ArchiveData,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub struct FormEdit {
    pub side: Side,
    pub team: String,
    pub buffer: String,
}

pub struct AppState {
    pub league: League,
    pub screen: Screen,
    pub budget: f64,

    /// Raw records per league, as delivered by the provider.
    pub records: HashMap<League, Vec<MatchRecord>>,
    pub board_source: HashMap<League, String>,
    /// Analyzed rows for the current league, sorted by safety score.
    pub rows: Vec<AnalyzedMatch>,
    pub skipped: usize,
    pub board_loading: bool,

    pub archive: HashMap<League, ArchiveData>,
    pub archive_loading: bool,

    pub selected: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,

    pub form_store: FormStore,
    pub form_edit: Option<FormEdit>,
    pub store_dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_store(FormStore::load_default())
    }

    pub fn with_store(form_store: FormStore) -> Self {
        let budget = env::var("BETMAX_BUDGET")
            .ok()
            .and_then(|val| val.parse::<f64>().ok())
            .filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or(DEFAULT_BUDGET);

        let mut state = Self {
            league: League::Ligue1,
            screen: Screen::Board,
            budget,
            records: HashMap::new(),
            board_source: HashMap::new(),
            rows: Vec::new(),
            skipped: 0,
            board_loading: false,
            archive: HashMap::new(),
            archive_loading: false,
            selected: 0,
            logs: VecDeque::new(),
            help_overlay: false,
            form_store,
            form_edit: None,
            store_dirty: false,
        };
        if !state.form_store.is_empty() {
            state.push_log(format!(
                "[INFO] Loaded {} saved form entries",
                state.form_store.len()
            ));
        }
        state
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line.into());
    }

    pub fn select_next(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + 1).min(self.rows.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn cycle_league(&mut self) {
        self.league = self.league.next();
        self.selected = 0;
        self.form_edit = None;
        self.reanalyze();
    }

    pub fn adjust_budget(&mut self, up: bool) {
        let next = if up {
            self.budget + BUDGET_STEP
        } else {
            self.budget - BUDGET_STEP
        };
        self.budget = next.clamp(BUDGET_STEP, BUDGET_MAX);
        self.reanalyze();
    }

    pub fn selected_row(&self) -> Option<&AnalyzedMatch> {
        self.rows.get(self.selected)
    }

    /// Re-run the pipeline for the current league: overlay stored form
    /// strings onto the raw records, analyze against the budget, surface
    /// per-record warnings in the log pane.
    pub fn reanalyze(&mut self) {
        let Some(records) = self.records.get(&self.league) else {
            self.rows.clear();
            self.skipped = 0;
            return;
        };

        let mut prepared = records.clone();
        for record in &mut prepared {
            if let Some(form) = self.form_store.get(&record.league, &record.home_team) {
                record.home_form = Some(form.to_string());
            }
            if let Some(form) = self.form_store.get(&record.league, &record.away_team) {
                record.away_form = Some(form.to_string());
            }
        }

        let report = analysis::analyze_matches(&prepared, self.budget);
        for warning in &report.warnings {
            self.push_log(format!("[WARN] {warning}"));
        }
        self.rows = report.rows;
        self.skipped = report.skipped;
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    pub fn begin_form_edit(&mut self, side: Side) {
        let Some(row) = self.selected_row() else {
            self.push_log("[INFO] No match selected for form edit");
            return;
        };
        let (team, current) = match side {
            Side::Home => (
                row.record.home_team.clone(),
                row.record.home_form.clone().unwrap_or_default(),
            ),
            Side::Away => (
                row.record.away_team.clone(),
                row.record.away_form.clone().unwrap_or_default(),
            ),
        };
        self.form_edit = Some(FormEdit {
            side,
            team,
            buffer: current,
        });
    }

    pub fn form_edit_input(&mut self, ch: char) {
        if let Some(edit) = &mut self.form_edit {
            edit.buffer.push(ch);
        }
    }

    pub fn form_edit_backspace(&mut self) {
        if let Some(edit) = &mut self.form_edit {
            edit.buffer.pop();
        }
    }

    pub fn cancel_form_edit(&mut self) {
        self.form_edit = None;
    }

    pub fn commit_form_edit(&mut self) {
        let Some(edit) = self.form_edit.take() else {
            return;
        };
        match form_store::normalize_form_input(&edit.buffer) {
            Some(normalized) => {
                self.form_store
                    .set(self.league.label(), &edit.team, &normalized);
                self.store_dirty = true;
                self.push_log(format!("[INFO] Form set for {}: {normalized}", edit.team));
                self.reanalyze();
            }
            None => {
                self.push_log(format!(
                    "[WARN] Rejected form for {}: tokens must be v, n or d",
                    edit.team
                ));
            }
        }
    }

    pub fn save_form_store(&mut self) {
        match self.form_store.save() {
            Ok(()) => {
                self.store_dirty = false;
                self.push_log(format!(
                    "[INFO] Saved {} form entries",
                    self.form_store.len()
                ));
            }
            Err(err) => self.push_log(format!("[WARN] Form store save failed: {err}")),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Upcoming {
            league,
            source,
            records,
        } => {
            let count = records.len();
            state.records.insert(league, records);
            state.board_source.insert(league, source.clone());
            if league == state.league {
                state.board_loading = false;
                state.reanalyze();
            }
            state.push_log(format!(
                "[INFO] {count} matches from {source} ({})",
                league.label()
            ));
        }
        Delta::Archive { league, data } => {
            state.push_log(format!(
                "[INFO] Archive loaded for {} ({} matches, {} rows dropped)",
                league.label(),
                data.summary.samples,
                data.dropped_rows
            ));
            state.archive.insert(league, data);
            if league == state.league {
                state.archive_loading = false;
            }
        }
        Delta::Log(line) => state.push_log(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_state() -> AppState {
        AppState::with_store(FormStore::in_memory())
    }

    #[test]
    fn league_cycle_covers_all() {
        let mut league = League::Ligue1;
        for expected in [League::PremierLeague, League::LaLiga, League::Ligue1] {
            league = league.next();
            assert_eq!(league, expected);
        }
        assert_eq!(League::ALL.len(), 3);
    }

    #[test]
    fn log_pane_is_capped() {
        let mut state = offline_state();
        for i in 0..(LOG_CAP + 50) {
            state.push_log(format!("line {i}"));
        }
        assert_eq!(state.logs.len(), LOG_CAP);
    }

    #[test]
    fn upcoming_delta_triggers_analysis() {
        let mut state = offline_state();
        let records = vec![MatchRecord {
            league: "Ligue 1".to_string(),
            home_team: "Lyon".to_string(),
            away_team: "Nice".to_string(),
            home_odds: 1.8,
            away_odds: 4.2,
            kickoff: None,
            home_form: None,
            away_form: None,
        }];
        apply_delta(
            &mut state,
            Delta::Upcoming {
                league: League::Ligue1,
                source: "demo".to_string(),
                records,
            },
        );
        assert_eq!(state.rows.len(), 1);
        assert_eq!(state.skipped, 0);
    }

    #[test]
    fn committed_form_edit_feeds_the_next_analysis() {
        let mut state = offline_state();
        let records = vec![MatchRecord {
            league: "Ligue 1".to_string(),
            home_team: "Lyon".to_string(),
            away_team: "Nice".to_string(),
            home_odds: 2.0,
            away_odds: 3.5,
            kickoff: None,
            home_form: None,
            away_form: None,
        }];
        apply_delta(
            &mut state,
            Delta::Upcoming {
                league: League::Ligue1,
                source: "demo".to_string(),
                records,
            },
        );
        let before = state.rows[0].safety_score;

        state.begin_form_edit(Side::Home);
        for ch in "v,v,v".chars() {
            state.form_edit_input(ch);
        }
        state.commit_form_edit();

        assert!(state.store_dirty);
        assert_eq!(state.form_store.get("Ligue 1", "Lyon"), Some("v,v,v"));
        assert!(state.rows[0].safety_score >= before);
        assert!(state.rows[0].form_home > 0.0);
    }
}
