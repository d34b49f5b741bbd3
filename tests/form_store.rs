use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use betmax_terminal::form_store::FormStore;

fn temp_store_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("betmax_form_store_{tag}_{nanos}.json"))
}

#[test]
fn save_and_reload_round_trip() {
    let path = temp_store_path("roundtrip");

    let mut store = FormStore::load(path.clone());
    assert!(store.is_empty());
    store.set("Ligue 1", "Lyon", "v,n,d");
    store.set("Ligue 1", "Nice", "d,d,v");
    store.set("La Liga", "Sevilla", "n,n");
    store.save().expect("save should succeed");

    let reloaded = FormStore::load(path.clone());
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded.get("Ligue 1", "Lyon"), Some("v,n,d"));
    assert_eq!(reloaded.get("La Liga", "Sevilla"), Some("n,n"));
    assert_eq!(reloaded.get("La Liga", "Lyon"), None);

    let _ = fs::remove_file(path);
}

#[test]
fn save_rewrites_the_file_wholesale() {
    let path = temp_store_path("wholesale");

    let mut store = FormStore::load(path.clone());
    store.set("Ligue 1", "Lyon", "v");
    store.set("Ligue 1", "Nice", "d");
    store.save().expect("first save");

    // A second session that never saw Nice overwrites the whole file.
    let mut second = FormStore::empty_at(path.clone());
    second.set("Ligue 1", "Lyon", "n");
    second.save().expect("second save");

    let reloaded = FormStore::load(path.clone());
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get("Ligue 1", "Lyon"), Some("n"));
    assert_eq!(reloaded.get("Ligue 1", "Nice"), None);

    let _ = fs::remove_file(path);
}

#[test]
fn corrupt_file_loads_as_empty() {
    let path = temp_store_path("corrupt");
    fs::write(&path, "{not json").expect("write corrupt file");

    let store = FormStore::load(path.clone());
    assert!(store.is_empty());

    let _ = fs::remove_file(path);
}

#[test]
fn wrong_version_loads_as_empty() {
    let path = temp_store_path("version");
    fs::write(&path, r#"{"version": 99, "leagues": {"L": {"T": "v"}}}"#)
        .expect("write versioned file");

    let store = FormStore::load(path.clone());
    assert!(store.is_empty());

    let _ = fs::remove_file(path);
}
