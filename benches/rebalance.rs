//! Rebalance pipeline benchmarks: grades → target → plan → orders.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use vaultbook::{
    AssetRegistry, Holdings, PriceTable, Symbol, TokenGrade, build_orders,
    compute_target_allocation, plan_rebalance,
};

struct Fixture {
    registry: AssetRegistry,
    grades: Vec<TokenGrade>,
    holdings: Holdings,
    prices: PriceTable,
}

/// Build a vault with `n_tokens` tracked tokens plus USDC.
///
/// Grades, quantities and prices come from a simple deterministic RNG.
fn fixture(n_tokens: usize) -> Fixture {
    let usdc = Symbol::new("USDC");
    let symbols: Vec<Symbol> = (0..n_tokens)
        .map(|i| Symbol::new(&format!("T{i:03}")))
        .collect();

    let mut registry = AssetRegistry::new(usdc);
    registry.set_decimals(usdc, 6).unwrap();
    for &sym in &symbols {
        registry.track(sym).unwrap();
        registry.set_decimals(sym, 18).unwrap();
    }

    // Simple deterministic PRNG (xorshift32)
    let mut rng_state: u32 = 42;
    let mut next = move || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 17;
        rng_state ^= rng_state << 5;
        rng_state
    };

    let grades = symbols
        .iter()
        .map(|&s| TokenGrade::new(s, (next() % 101) as f64))
        .collect();

    let mut held: Vec<(Symbol, f64)> = symbols
        .iter()
        .map(|&s| (s, (next() % 10_000) as f64 / 100.0))
        .collect();
    held.push((usdc, 50_000.0));
    let holdings = Holdings::new(&registry, held).unwrap();

    let quotes = symbols
        .iter()
        .map(|&s| (s, 1.0 + (next() % 100_000) as f64))
        .collect();
    let prices = PriceTable::new(&registry, quotes).unwrap();

    Fixture {
        registry,
        grades,
        holdings,
        prices,
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/pipeline");

    for n in [3, 20, 100] {
        let fx = fixture(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &fx, |b, fx| {
            b.iter(|| {
                let target = compute_target_allocation(&fx.registry, &fx.grades).unwrap();
                let adjs = plan_rebalance(&fx.holdings, &target, &fx.prices).unwrap();
                black_box(build_orders(&fx.registry, &adjs).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
