//! Benchmarks for emberkv storage operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use emberkv::{Config, Engine};
use tempfile::TempDir;

const KEYS: usize = 10_000;

fn open_engine(dir: &TempDir) -> Engine {
    let config = Config::builder()
        .data_dir(dir.path())
        .disable_auto_flush()
        .sync_on_flush(false)
        .build();
    Engine::open(config).unwrap()
}

fn fill(engine: &Engine) {
    for i in 0..KEYS {
        engine
            .put(format!("key{:08}", i).as_bytes(), format!("value{}", i).as_bytes())
            .unwrap();
    }
}

fn storage_benchmarks(c: &mut Criterion) {
    c.bench_function("put_memtable", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            engine
                .put(format!("key{:012}", i).as_bytes(), b"value")
                .unwrap();
        });
    });

    c.bench_function("get_memtable", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);
        fill(&engine);
        let mut i = 0;
        b.iter(|| {
            i = (i + 7919) % KEYS;
            black_box(engine.get(format!("key{:08}", i).as_bytes()).unwrap());
        });
    });

    c.bench_function("get_segment", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);
        fill(&engine);
        engine.flush().unwrap();
        let mut i = 0;
        b.iter(|| {
            i = (i + 7919) % KEYS;
            black_box(engine.get(format!("key{:08}", i).as_bytes()).unwrap());
        });
    });

    c.bench_function("flush_10k", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let engine = open_engine(&dir);
                fill(&engine);
                (dir, engine)
            },
            |(_dir, engine)| engine.flush().unwrap(),
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, storage_benchmarks);
criterion_main!(benches);
