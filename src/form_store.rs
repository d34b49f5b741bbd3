use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const STORE_DIR: &str = "betmax_terminal";
const STORE_FILE: &str = "team_form.json";
const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreFile {
    version: u32,
    /// league label -> team name -> form string ("v,n,d,...").
    leagues: HashMap<String, HashMap<String, String>>,
}

/// Durable mapping from (league, team) to a user-entered form string.
///
/// Loaded once at startup and rewritten wholesale on an explicit save; the
/// analysis core only ever sees the plain strings, never the file.
#[derive(Debug, Default)]
pub struct FormStore {
    path: Option<PathBuf>,
    data: StoreFile,
}

impl FormStore {
    /// Load from the default cache location. A missing, unreadable, corrupt
    /// or out-of-version file yields an empty store rather than an error.
    pub fn load_default() -> Self {
        match default_path() {
            Some(path) => Self::load(path),
            None => Self::in_memory(),
        }
    }

    pub fn load(path: PathBuf) -> Self {
        let data = read_store_file(&path).unwrap_or_else(|| StoreFile {
            version: STORE_VERSION,
            leagues: HashMap::new(),
        });
        Self {
            path: Some(path),
            data,
        }
    }

    /// Store without a backing file; `save` is a no-op. Used in tests and
    /// when no writable cache directory exists.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: StoreFile {
                version: STORE_VERSION,
                leagues: HashMap::new(),
            },
        }
    }

    /// Empty store bound to `path`; the next save replaces whatever is
    /// there, regardless of what the file held before.
    pub fn empty_at(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            data: StoreFile {
                version: STORE_VERSION,
                leagues: HashMap::new(),
            },
        }
    }

    pub fn get(&self, league: &str, team: &str) -> Option<&str> {
        self.data
            .leagues
            .get(league)
            .and_then(|teams| teams.get(team))
            .map(String::as_str)
    }

    pub fn set(&mut self, league: &str, team: &str, form: &str) {
        self.data
            .leagues
            .entry(league.to_string())
            .or_default()
            .insert(team.to_string(), form.to_string());
    }

    pub fn len(&self) -> usize {
        self.data.leagues.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the whole file. Writes to a sibling tmp file first and
    /// renames over the target so a crash mid-write never corrupts the
    /// store.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create store dir {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.data).context("serialize form store")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }
}

fn read_store_file(path: &Path) -> Option<StoreFile> {
    let raw = fs::read_to_string(path).ok()?;
    let store = serde_json::from_str::<StoreFile>(&raw).ok()?;
    if store.version != STORE_VERSION {
        return None;
    }
    Some(store)
}

fn default_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(STORE_DIR).join(STORE_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(STORE_DIR)
            .join(STORE_FILE),
    )
}

/// Normalize user form input before it is stored: tokens trimmed and
/// lowercased, empty tokens dropped, and every token must be one of v/n/d.
/// Returns `None` when any token is unrecognized or nothing remains.
pub fn normalize_form_input(raw: &str) -> Option<String> {
    let mut tokens = Vec::new();
    for token in raw.split(',') {
        let token = token.trim().to_ascii_lowercase();
        if token.is_empty() {
            continue;
        }
        if !matches!(token.as_str(), "v" | "n" | "d") {
            return None;
        }
        tokens.push(token);
    }
    if tokens.is_empty() {
        return None;
    }
    Some(tokens.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_known_tokens() {
        assert_eq!(normalize_form_input("V, n ,d"), Some("v,n,d".to_string()));
        assert_eq!(normalize_form_input("v,,n"), Some("v,n".to_string()));
    }

    #[test]
    fn normalize_rejects_unknown_tokens() {
        assert_eq!(normalize_form_input("v,w,d"), None);
        assert_eq!(normalize_form_input(""), None);
        assert_eq!(normalize_form_input(" , ,"), None);
    }

    #[test]
    fn in_memory_store_set_get() {
        let mut store = FormStore::in_memory();
        assert!(store.is_empty());
        store.set("Ligue 1", "Lyon", "v,n,d");
        assert_eq!(store.get("Ligue 1", "Lyon"), Some("v,n,d"));
        assert_eq!(store.get("Ligue 1", "Nice"), None);
        assert_eq!(store.get("La Liga", "Lyon"), None);
        assert_eq!(store.len(), 1);
        // No backing file, save is a no-op.
        store.save().expect("in-memory save");
    }
}
