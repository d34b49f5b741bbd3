use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::archive_fetch;
use crate::fake_feed;
use crate::odds_api::{self, OddsApiConfig};
use crate::state::{Delta, League, ProviderCommand};

/// Spawn the provider thread that owns all blocking HTTP.
///
/// The UI sends commands over `cmd_rx` and consumes `Delta`s from `tx`; a
/// fetch error becomes one `[WARN]` log line, never a crash. The thread
/// exits when the command channel closes.
pub fn spawn_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        let cfg = OddsApiConfig::from_env();
        if !cfg.is_live() {
            let _ = tx.send(Delta::Log(
                "[INFO] No ODDS_API_KEY set, board runs on demo fixtures".to_string(),
            ));
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::FetchUpcoming(league) => fetch_upcoming(&tx, &cfg, league),
                ProviderCommand::FetchArchive(league) => fetch_archive(&tx, league),
            }
        }
    });
}

fn fetch_upcoming(tx: &Sender<Delta>, cfg: &OddsApiConfig, league: League) {
    if cfg.is_live() {
        match odds_api::fetch_upcoming_records(league, cfg) {
            Ok(records) if !records.is_empty() => {
                let _ = tx.send(Delta::Upcoming {
                    league,
                    source: "theoddsapi".to_string(),
                    records,
                });
                return;
            }
            Ok(_) => {
                let _ = tx.send(Delta::Log(format!(
                    "[WARN] No upcoming odds for {}, falling back to demo fixtures",
                    league.label()
                )));
            }
            Err(err) => {
                let _ = tx.send(Delta::Log(format!(
                    "[WARN] Odds fetch failed for {}: {err}",
                    league.label()
                )));
            }
        }
    }

    let _ = tx.send(Delta::Upcoming {
        league,
        source: "demo".to_string(),
        records: fake_feed::demo_records(league),
    });
}

fn fetch_archive(tx: &Sender<Delta>, league: League) {
    match archive_fetch::fetch_archive(league) {
        Ok(data) => {
            let _ = tx.send(Delta::Archive { league, data });
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!(
                "[WARN] Archive fetch failed for {}: {err}",
                league.label()
            )));
        }
    }
}
