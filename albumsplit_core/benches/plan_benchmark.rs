use std::path::Path;

use albumsplit_core::{plan, ExtractionRequest, Track};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

struct Scenario {
    name: &'static str,
    tracks: usize,
    title_len: usize,
}

fn synthetic_tracks(scenario: &Scenario) -> Vec<Track> {
    let title = "Side A: Movement / Part ?".repeat(scenario.title_len / 25 + 1);
    (0..scenario.tracks)
        .map(|i| Track::new(title.clone(), i as f64 * 180.5))
        .collect()
}

fn plan_benchmarks(c: &mut Criterion) {
    let scenarios = [
        Scenario {
            name: "album_12_tracks",
            tracks: 12,
            title_len: 30,
        },
        Scenario {
            name: "compilation_120_tracks",
            tracks: 120,
            title_len: 60,
        },
        Scenario {
            name: "archive_5000_long_titles",
            tracks: 5_000,
            title_len: 1_000,
        },
    ];

    let mut group = c.benchmark_group("segment_plan");

    for scenario in scenarios {
        let tracks = synthetic_tracks(&scenario);
        let duration = tracks.len() as f64 * 180.5 + 60.0;

        group.bench_with_input(
            BenchmarkId::from_parameter(scenario.name),
            &tracks,
            |b, tracks| {
                b.iter(|| {
                    let segments = plan(black_box(tracks), duration, Path::new("/out"), "flac");
                    ExtractionRequest::new("/in/album.flac", &segments).args()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, plan_benchmarks);
criterion_main!(benches);
