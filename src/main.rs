use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use betmax_terminal::analysis::Side;
use betmax_terminal::feed;
use betmax_terminal::state::{AppState, Delta, ProviderCommand, Screen, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.form_edit.is_some() {
            self.on_form_edit_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.screen = Screen::Board,
            KeyCode::Char('2') => {
                self.state.screen = Screen::Archive;
                if !self.state.archive.contains_key(&self.state.league) {
                    self.request_archive(true);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.state.cycle_league();
                self.ensure_league_data();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => match self.state.screen {
                Screen::Board => self.request_upcoming(true),
                Screen::Archive => self.request_archive(true),
            },
            KeyCode::Char('+') | KeyCode::Char('=') => self.state.adjust_budget(true),
            KeyCode::Char('-') => self.state.adjust_budget(false),
            KeyCode::Char('e') => self.state.begin_form_edit(Side::Home),
            KeyCode::Char('E') => self.state.begin_form_edit(Side::Away),
            KeyCode::Char('w') | KeyCode::Char('W') => self.state.save_form_store(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn on_form_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.state.commit_form_edit(),
            KeyCode::Esc => self.state.cancel_form_edit(),
            KeyCode::Backspace => self.state.form_edit_backspace(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.cancel_form_edit();
            }
            KeyCode::Char(ch) => self.state.form_edit_input(ch),
            _ => {}
        }
    }

    fn ensure_league_data(&mut self) {
        if !self.state.records.contains_key(&self.state.league) {
            self.request_upcoming(false);
        }
        if self.state.screen == Screen::Archive && !self.state.archive.contains_key(&self.state.league) {
            self.request_archive(false);
        }
    }

    fn request_upcoming(&mut self, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            return;
        };
        if tx
            .send(ProviderCommand::FetchUpcoming(self.state.league))
            .is_err()
        {
            self.state.push_log("[WARN] Upcoming request failed");
        } else {
            self.state.board_loading = true;
            if announce {
                self.state.push_log(format!(
                    "[INFO] Fetching upcoming odds for {}",
                    self.state.league.label()
                ));
            }
        }
    }

    fn request_archive(&mut self, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            return;
        };
        if tx
            .send(ProviderCommand::FetchArchive(self.state.league))
            .is_err()
        {
            self.state.push_log("[WARN] Archive request failed");
        } else {
            self.state.archive_loading = true;
            if announce {
                self.state.push_log(format!(
                    "[INFO] Fetching season archive for {}",
                    self.state.league.label()
                ));
            }
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(tx, cmd_rx);

    let mut app = App::new(Some(cmd_tx));
    app.request_upcoming(false);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(4),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Board => render_board(frame, chunks[1], &app.state),
        Screen::Archive => render_archive(frame, chunks[1], &app.state),
    }

    render_log_pane(frame, chunks[2], &app.state);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let screen = match state.screen {
        Screen::Board => "BOARD",
        Screen::Archive => "ARCHIVE",
    };
    let source = state
        .board_source
        .get(&state.league)
        .map(String::as_str)
        .unwrap_or("-");
    let dirty = if state.store_dirty { " | forms unsaved" } else { "" };
    format!(
        "BETMAX {screen} | {} | Budget: {:.2} | Source: {source}{dirty}",
        state.league.label(),
        state.budget
    )
}

fn footer_text(state: &AppState) -> String {
    if let Some(edit) = &state.form_edit {
        let side = match edit.side {
            Side::Home => "home",
            Side::Away => "away",
        };
        return format!(
            "Form ({side}) {}: {}_   Enter Commit | Esc Cancel",
            edit.team, edit.buffer
        );
    }
    match state.screen {
        Screen::Board => {
            "1 Board | 2 Archive | j/k Move | l League | r Refresh | +/- Budget | e/E Form | w Save | ? Help | q Quit"
                .to_string()
        }
        Screen::Archive => {
            "1 Board | 2 Archive | l League | r Refresh | ? Help | q Quit".to_string()
        }
    }
}

fn board_columns() -> [Constraint; 9] {
    [
        Constraint::Min(26),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(16),
        Constraint::Length(6),
        Constraint::Length(9),
    ]
}

/// Shorten an ISO kickoff timestamp to a local "dd/mm HH:MM" label; odd or
/// missing values render as "-".
fn format_kickoff(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "-".to_string();
    };
    match chrono::DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => dt
            .with_timezone(&chrono::Local)
            .format("%d/%m %H:%M")
            .to_string(),
        Err(_) => "-".to_string(),
    }
}

fn render_board(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = board_columns();
    render_board_header(frame, sections[0], &widths);

    let list_area = sections[1];
    if state.rows.is_empty() {
        let text = if state.board_loading {
            "Fetching odds..."
        } else if state.skipped > 0 {
            "All records were skipped (invalid odds)"
        } else {
            "No matches loaded, press r to refresh"
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }

    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, state.rows.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };

        let selected = idx == state.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);

        let row = &state.rows[idx];
        let name = format!("{} vs {}", row.record.home_team, row.record.away_team);
        let kickoff = format_kickoff(row.record.kickoff.as_deref());
        let odds = format!("{:.2}/{:.2}", row.record.home_odds, row.record.away_odds);
        let implied = format!(
            "{:.0}%/{:.0}%",
            row.implied_prob_home * 100.0,
            row.implied_prob_away * 100.0
        );
        let form = format!("{:.2}/{:.2}", row.form_home, row.form_away);
        let safety = format!("{:.1}", row.safety_score);
        let pick = row.predicted_team().to_string();
        let win = format!("{:.0}%", row.win_probability * 100.0);
        let stake = format!("{:.2}", row.recommended_stake);

        let stake_style = if row.recommended_stake > 0.0 {
            row_style.fg(Color::Green)
        } else {
            row_style.fg(Color::DarkGray)
        };

        render_cell_text(frame, cols[0], &name, row_style);
        render_cell_text(frame, cols[1], &kickoff, row_style);
        render_cell_text(frame, cols[2], &odds, row_style);
        render_cell_text(frame, cols[3], &implied, row_style);
        render_cell_text(frame, cols[4], &form, row_style);
        render_cell_text(frame, cols[5], &safety, row_style);
        render_cell_text(frame, cols[6], &pick, row_style);
        render_cell_text(frame, cols[7], &win, row_style);
        render_cell_text(frame, cols[8], &stake, stake_style);
    }
}

fn render_board_header(frame: &mut Frame, area: Rect, widths: &[Constraint]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);

    render_cell_text(frame, cols[0], "Match", style);
    render_cell_text(frame, cols[1], "Kickoff", style);
    render_cell_text(frame, cols[2], "Odds H/A", style);
    render_cell_text(frame, cols[3], "Implied", style);
    render_cell_text(frame, cols[4], "Form H/A", style);
    render_cell_text(frame, cols[5], "Safety", style);
    render_cell_text(frame, cols[6], "Pick", style);
    render_cell_text(frame, cols[7], "Win%", style);
    render_cell_text(frame, cols[8], "Stake", style);
}

fn render_archive(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(data) = state.archive.get(&state.league) else {
        let text = if state.archive_loading {
            "Fetching season archive..."
        } else {
            "No archive loaded, press r to refresh"
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    let summary = format!(
        "Bookmaker precision (implied favorite vs result): {:.2}%\nAverage home odds: {:.2}\nMatches: {} ({} rows dropped)",
        data.summary.bookmaker_precision_pct,
        data.summary.avg_home_odds,
        data.summary.samples,
        data.dropped_rows
    );
    frame.render_widget(Paragraph::new(summary), sections[0]);

    let widths = archive_columns();
    render_archive_header(frame, sections[1], &widths);

    let list_area = sections[2];
    if data.favorites.is_empty() {
        let empty = Paragraph::new("No clear favorites in this archive")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }

    for (i, row) in data
        .favorites
        .iter()
        .take(list_area.height as usize)
        .enumerate()
    {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);

        let name = format!("{} vs {}", row.home_team, row.away_team);
        let score = format!("{}-{}", row.home_goals, row.away_goals);
        let odds = format!("{:.2}/{:.2}", row.home_odds, row.away_odds);
        let gap = format!("{:.2}", row.probability_gap());

        render_cell_text(frame, cols[0], &row.date, Style::default());
        render_cell_text(frame, cols[1], &name, Style::default());
        render_cell_text(frame, cols[2], &score, Style::default());
        render_cell_text(frame, cols[3], &odds, Style::default());
        render_cell_text(frame, cols[4], row.winner(), Style::default());
        render_cell_text(frame, cols[5], &gap, Style::default());
    }
}

fn archive_columns() -> [Constraint; 6] {
    [
        Constraint::Length(12),
        Constraint::Min(26),
        Constraint::Length(7),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(6),
    ]
}

fn render_archive_header(frame: &mut Frame, area: Rect, widths: &[Constraint]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);

    render_cell_text(frame, cols[0], "Date", style);
    render_cell_text(frame, cols[1], "Match", style);
    render_cell_text(frame, cols[2], "Score", style);
    render_cell_text(frame, cols[3], "Odds H/A", style);
    render_cell_text(frame, cols[4], "Winner", style);
    render_cell_text(frame, cols[5], "Gap", style);
}

fn render_log_pane(frame: &mut Frame, area: Rect, state: &AppState) {
    let inner_height = area.height.saturating_sub(2) as usize;
    let lines: Vec<&str> = state
        .logs
        .iter()
        .rev()
        .take(inner_height)
        .map(String::as_str)
        .collect();
    let text = lines
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n");
    let pane = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Log"))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(pane, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(64);
    let height = area.height.min(16);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let text = "\
1        Board (analyzed upcoming matches)
2        Archive (season summary + clear favorites)
j/k ↑/↓  Move selection
l        Cycle league
r        Refresh current screen
+/-      Adjust budget (re-analyzes)
e / E    Edit home / away form of selected match
w        Save form store to disk
?        Toggle this help
q        Quit

Form strings are comma-separated v/n/d, most recent first.
Stakes are Kelly fractions of the full budget per match.";

    frame.render_widget(Clear, popup);
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, popup);
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if visible == 0 || total == 0 {
        return (0, 0);
    }
    let half = visible / 2;
    let start = selected.saturating_sub(half).min(total.saturating_sub(visible));
    let end = (start + visible).min(total);
    (start, end)
}
