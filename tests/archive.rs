use betmax_terminal::archive_fetch::{archive_url, parse_archive_csv};
use betmax_terminal::state::League;

// Trimmed football-data.co.uk shape: extra columns present, some rows with
// missing odds, one clear favorite that lost.
const ARCHIVE_CSV: &str = "\
Div,Date,Time,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HTHG,HTAG,B365H,B365D,B365A
F1,16/08/2024,20:00,Le Havre,Paris SG,1,4,A,0,2,9.00,5.75,1.30
F1,17/08/2024,17:00,Brest,Marseille,1,5,A,1,2,3.10,3.50,2.25
F1,17/08/2024,19:00,Monaco,St Etienne,1,0,H,0,0,1.36,5.00,8.50
F1,18/08/2024,15:00,Nantes,Toulouse,0,0,D,0,0,,,
F1,18/08/2024,20:45,Rennes,Lyon,1,1,D,1,0,2.50,3.40,2.80
";

#[test]
fn parses_rows_and_drops_incomplete_ones() {
    let data = parse_archive_csv(ARCHIVE_CSV).expect("parseable archive");
    assert_eq!(data.summary.samples, 4);
    assert_eq!(data.dropped_rows, 1);
}

#[test]
fn summary_matches_hand_computed_values() {
    let data = parse_archive_csv(ARCHIVE_CSV).expect("parseable archive");
    // Implied favorites Paris SG, Marseille and Monaco all won; the
    // Rennes-Lyon draw counts against the bookmaker -> 3 of 4 correct.
    assert_eq!(data.summary.bookmaker_precision_pct, 75.0);
    // (9.00 + 3.10 + 1.36 + 2.50) / 4
    assert_eq!(data.summary.avg_home_odds, 3.99);
}

#[test]
fn favorites_filter_uses_probability_gap() {
    let data = parse_archive_csv(ARCHIVE_CSV).expect("parseable archive");
    // Brest-Marseille (2.25 vs 3.10) and Rennes-Lyon (2.50 vs 2.80) are too
    // tight; the other two qualify. Newest first.
    assert_eq!(data.favorites.len(), 2);
    assert_eq!(data.favorites[0].home_team, "Monaco");
    assert_eq!(data.favorites[1].home_team, "Le Havre");
    assert_eq!(data.favorites[1].winner(), "Paris SG");
}

#[test]
fn header_without_odds_columns_is_fatal() {
    let csv = "Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR\nF1,01/01/2025,A,B,1,0,H\n";
    assert!(parse_archive_csv(csv).is_err());
}

#[test]
fn archive_urls_use_league_codes() {
    assert!(archive_url(League::Ligue1).ends_with("/F1.csv"));
    assert!(archive_url(League::PremierLeague).ends_with("/E0.csv"));
    assert!(archive_url(League::LaLiga).ends_with("/SP1.csv"));
}
