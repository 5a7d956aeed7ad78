// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — MoC Sweep Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::path::PathBuf;
use std::sync::Arc;
use transport_core::coarse_data::CoarseData;
use transport_core::context::RuntimeContext;
use transport_core::moc_sweeper::MocSweeper;
use transport_core::sweeper::TransportSweeper;
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::CaseConfig;

fn load(name: &str) -> CaseConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("validation")
        .join(name);
    CaseConfig::from_file(&path.to_string_lossy()).expect("validation case should load")
}

fn sweeper(cfg: &CaseConfig, threads: usize) -> MocSweeper {
    let core = Arc::new(CoreMesh::from_config(cfg).expect("core should build"));
    let ctx = Arc::new(RuntimeContext::new(threads).expect("context"));
    MocSweeper::new(cfg, core, ctx).expect("sweeper should build")
}

fn bench_moc_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("moc_sweep");
    group.sample_size(20);

    let mut cfg = load("lattice_3x3_2d.json");
    cfg.sweeper.n_inner = 1;

    for threads in [1, 4] {
        let mut s = sweeper(&cfg, threads);
        group.bench_with_input(BenchmarkId::new("lattice_3x3_group0", threads), &threads, |b, _| {
            b.iter(|| {
                s.set_group_source(0, None);
                s.sweep(0).expect("sweep should succeed");
                black_box(s.flux()[[0, 0]]);
            })
        });
    }

    let mut s = sweeper(&cfg, 1);
    let coarse = CoarseData::new(s.core().mesh(), s.n_group());
    s.attach_coarse_data(coarse);
    group.bench_function("lattice_3x3_group0_currents", |b| {
        b.iter(|| {
            s.set_group_source(0, None);
            s.sweep(0).expect("sweep should succeed");
            black_box(s.coarse_data().map(|cd| cd.current()[[0, 0]]));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_moc_sweep);
criterion_main!(benches);
