// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Ray Tracing Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::path::PathBuf;
use transport_core::context::RuntimeContext;
use transport_core::quadrature::AngularQuadrature;
use transport_core::ray_data::RayData;
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

fn bench_ray_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("ray_trace");
    group.sample_size(20);

    for case in ["pin_ihm_2g.json", "lattice_3x3_2d.json", "assembly_2d3d.json"] {
        let cfg = load(case);
        let core = CoreMesh::from_config(&cfg).expect("core should build");
        let ang_quad = AngularQuadrature::from_config(&cfg.sweeper.ang_quad).expect("quadrature");
        let ctx = RuntimeContext::serial().expect("context");
        group.bench_function(case.trim_end_matches(".json"), |b| {
            b.iter(|| {
                let rays = RayData::new(&cfg.sweeper.rays, &ang_quad, &core, &ctx)
                    .expect("ray trace should succeed");
                black_box(rays.n_rays_total());
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ray_trace);
criterion_main!(benches);
