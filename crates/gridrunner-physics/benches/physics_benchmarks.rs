//! Physics step benchmarks.
//!
//! Measures `PhysicsEngine::advance` on a walled arena with a scattering of
//! platforms, ladders and hazards, at a few body counts. Bodies are placed
//! with a seeded PRNG so every run steps the same scene.
//!
//! Run with: `cargo bench --bench physics_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use gridrunner_physics::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DT: f32 = 1.0 / 60.0;

/// 40x20 arena: border walls, a few floating platforms, ladders and hazards.
fn arena() -> TileGrid {
    let mut rows: Vec<String> = Vec::with_capacity(20);
    for y in 0..20 {
        let row: String = (0..40)
            .map(|x| {
                if x == 0 || x == 39 || y == 0 || y == 19 {
                    '#'
                } else if y % 5 == 0 && (x / 6) % 2 == 0 {
                    '#'
                } else if x % 13 == 4 && y > 2 {
                    'H'
                } else if y == 18 && x % 9 == 7 {
                    '^'
                } else {
                    '.'
                }
            })
            .collect();
        rows.push(row);
    }
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    TileGrid::from_ascii(&refs, 16.0).expect("arena layout is valid")
}

fn setup_engine(body_count: usize) -> PhysicsEngine {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default()).expect("default config");
    engine.set_tile_layer(arena());
    let mut rng = Pcg64::seed_from_u64(0x5eed);
    for i in 0..body_count {
        let feet = Vec2::new(rng.gen_range(24.0..616.0), rng.gen_range(40.0..300.0));
        let velocity = Vec2::new(rng.gen_range(-200.0..200.0), rng.gen_range(-300.0..0.0));
        let collider = if i % 4 == 0 {
            Collider::trigger(Shape::circle(6.0), Alignment::Center)
        } else {
            Collider::new(Shape::rect(12.0, 24.0), Alignment::BottomCenter)
        };
        engine
            .register_body(PhysicsBody::new(feet).with_collider(collider).with_velocity(velocity))
            .expect("valid body");
    }
    engine
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_advance_100_bodies(c: &mut Criterion) {
    let mut engine = setup_engine(100);
    c.bench_function("advance_100_bodies", |b| {
        b.iter(|| {
            engine.advance(black_box(DT));
            black_box(engine.collision_events().len());
        });
    });
}

fn bench_advance_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance_scaling");
    for count in [10usize, 50, 200] {
        let mut engine = setup_engine(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &_count| {
            b.iter(|| {
                engine.advance(black_box(DT));
                black_box(engine.tile_trigger_events().len());
            });
        });
    }
    group.finish();
}

fn bench_tile_queries(c: &mut Criterion) {
    let grid = arena();
    c.bench_function("tile_classify_and_ladder_lookup", |b| {
        b.iter(|| {
            let mut ladders = 0u32;
            for y in 0..20 {
                for x in 0..40 {
                    let p = Vec2::new(x as f32 * 16.0 + 8.0, y as f32 * 16.0 + 8.0);
                    if grid.classify(black_box(p)) == TileKind::Ladder {
                        ladders += grid.ladder_column_center_x(p).is_some() as u32;
                    }
                }
            }
            black_box(ladders)
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_advance_100_bodies,
    bench_advance_scaling,
    bench_tile_queries,
);
criterion_main!(benches);
