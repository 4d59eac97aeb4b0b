use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use divide::ContinentMap;
use divide::config::Params;
use divide::divide::Mode;

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for detail in [5u32, 7, 9] {
        let map = ContinentMap::new(Params {
            seed: Some(42),
            detail,
            ..Params::default()
        })
        .expect("valid detail");

        for mode in [Mode::Uphill, Mode::Downhill] {
            let id = BenchmarkId::new(format!("{mode:?}").to_lowercase(), detail);
            group.bench_with_input(id, &mode, |b, &mode| {
                b.iter_batched(
                    || map.clone(),
                    |mut map| {
                        map.run(mode, false).expect("full run");
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }

    group.finish();
}

fn bench_terrain(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain");

    for detail in [5u32, 7, 9] {
        group.bench_with_input(BenchmarkId::new("generate", detail), &detail, |b, &detail| {
            b.iter(|| {
                ContinentMap::new(Params {
                    seed: Some(7),
                    detail,
                    ..Params::default()
                })
                .expect("valid detail")
            })
        });
    }

    group.finish();
}

criterion_group!(divide_benches, bench_classify, bench_terrain);
criterion_main!(divide_benches);
