use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use betmax_terminal::analysis::{MatchRecord, analyze_matches, form_score};
use betmax_terminal::archive_fetch::parse_archive_csv;

fn sample_records(n: usize) -> Vec<MatchRecord> {
    (0..n)
        .map(|i| {
            let spread = 1.0 + (i % 17) as f64 * 0.35;
            MatchRecord {
                league: "Ligue 1".to_string(),
                home_team: format!("Home{i}"),
                away_team: format!("Away{i}"),
                home_odds: 1.2 + spread,
                away_odds: 1.2 + (17 - (i % 17)) as f64 * 0.35,
                kickoff: None,
                home_form: Some("v,n,d,v,n".to_string()),
                away_form: Some("d,d,v".to_string()),
            }
        })
        .collect()
}

fn sample_archive_csv(rows: usize) -> String {
    let mut out =
        String::from("Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,B365H,B365D,B365A\n");
    for i in 0..rows {
        let result = match i % 3 {
            0 => 'H',
            1 => 'A',
            _ => 'D',
        };
        out.push_str(&format!(
            "F1,01/02/2025,Home{i},Away{i},1,0,{result},{:.2},3.40,{:.2}\n",
            1.4 + (i % 9) as f64 * 0.3,
            5.0 - (i % 9) as f64 * 0.3,
        ));
    }
    out
}

fn bench_analyze_matches(c: &mut Criterion) {
    let records = sample_records(500);
    c.bench_function("analyze_matches_500", |b| {
        b.iter(|| {
            let report = analyze_matches(black_box(&records), black_box(250.0));
            black_box(report.rows.len());
        })
    });
}

fn bench_form_score(c: &mut Criterion) {
    c.bench_function("form_score", |b| {
        b.iter(|| black_box(form_score(black_box("v, n ,d,v,n,d,v"))))
    });
}

fn bench_archive_parse(c: &mut Criterion) {
    let csv = sample_archive_csv(400);
    c.bench_function("archive_parse_400", |b| {
        b.iter(|| {
            let data = parse_archive_csv(black_box(&csv)).unwrap();
            black_box(data.summary.samples);
        })
    });
}

criterion_group!(
    benches,
    bench_analyze_matches,
    bench_form_score,
    bench_archive_parse
);
criterion_main!(benches);
