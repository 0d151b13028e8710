// Criterion benchmarks for path search and incremental graph maintenance.
//
// Fixtures are uniform grass maps of each tessellation. Three groups:
// - `find_path`:   corner-to-corner search with unlimited budget.
// - `build_graph`: full edge-table construction for one unit.
// - `set_terrain`: one terrain flip with N subscribed units (the incremental
//                  path that replaces a full rebuild).
//
// Run with: cargo bench -p tessera_sim --bench pathfinding

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tessera_sim::game::Game;
use tessera_sim::map::GameMap;
use tessera_sim::tessellation::Tessellation;
use tessera_sim::types::TerrainId;
use tessera_sim::unit::UnitSpec;

const GRASS: TerrainId = TerrainId(0);
const FOREST: TerrainId = TerrainId(1);
const SIZE: u32 = 64;

fn walker() -> UnitSpec {
    UnitSpec::new().with_cost(GRASS, 1.0).with_cost(FOREST, 2.0)
}

fn fixture(tessellation: Tessellation, units: u32) -> Game {
    let mut game = Game::new(GameMap::filled(SIZE, SIZE, tessellation, GRASS));
    for i in 0..units {
        let id = game.spawn_unit(walker());
        let x = (i % SIZE) as i32;
        let y = (i / SIZE) as i32;
        if let Some(tile) = game.map().tile_at(x, y) {
            game.set_position(id, Some(tile));
        }
    }
    game
}

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");
    for tess in [Tessellation::Square, Tessellation::Hex, Tessellation::Octagon] {
        let mut game = fixture(tess, 1);
        let unit = game.units().next().map(|u| u.id).expect("fixture unit");
        let far = SIZE as i32 - 1;
        let target = game.map().tile_at(far, far).expect("corner tile");
        group.bench_with_input(BenchmarkId::from_parameter(format!("{tess:?}")), &tess, |b, _| {
            b.iter(|| black_box(game.find_path(unit, target, f64::INFINITY)));
        });
    }
    group.finish();
}

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");
    for tess in [Tessellation::Square, Tessellation::Hex, Tessellation::Octagon] {
        let mut game = fixture(tess, 1);
        let unit = game.units().next().map(|u| u.id).expect("fixture unit");
        group.bench_with_input(BenchmarkId::from_parameter(format!("{tess:?}")), &tess, |b, _| {
            b.iter(|| {
                game.remove_graph(unit);
                black_box(game.build_graph(unit))
            });
        });
    }
    group.finish();
}

fn bench_set_terrain(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_terrain");
    for units in [1u32, 16, 64] {
        let mut game = fixture(Tessellation::Square, units);
        let center = game
            .map()
            .tile_at(SIZE as i32 / 2, SIZE as i32 / 2)
            .expect("center tile");
        let mut flip = false;
        group.bench_with_input(BenchmarkId::from_parameter(units), &units, |b, _| {
            b.iter(|| {
                flip = !flip;
                let terrain = if flip { FOREST } else { GRASS };
                black_box(game.set_terrain(center, terrain));
                game.drain_events();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_path, bench_build_graph, bench_set_terrain);
criterion_main!(benches);
