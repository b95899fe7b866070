use alloy::primitives::address;
use bigdecimal::BigDecimal;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glint::arb::evaluator::evaluate;
use glint::arb::simulator::{total_net_profit, ProfitSimulator, SimulationParams};
use glint::arb::types::{ExchangeId, PriceQuote, Token, TokenPair};

/// WETH/USDC on Base
fn weth_usdc() -> TokenPair {
    let weth = Token::new(address!("0x4200000000000000000000000000000000000006"), "WETH", 18);
    let usdc = Token::new(address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), "USDC", 6);
    TokenPair::new(weth, usdc).unwrap()
}

/// Generate fresh quotes from `exchange_count` exchanges, scattered around 3000
fn generate_quotes(pair: &TokenPair, exchange_count: usize) -> Vec<(ExchangeId, PriceQuote)> {
    let now = Utc::now();
    (0..exchange_count)
        .map(|i| {
            let id = ExchangeId::new(format!("exchange_{i:03}"));
            // 2950.000000 ..= 3049.999999
            let micros = 2_950_000_000 + fastrand::i64(0..100_000_000);
            let price = BigDecimal::new(micros.into(), 6);
            (id.clone(), PriceQuote::new(id, pair.clone(), price, now))
        })
        .collect()
}

/// Benchmark evaluation and simulation of one pair across a growing number of exchanges
fn bench_evaluate_and_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_and_simulate");

    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(5));

    let pair = weth_usdc();
    let simulator = ProfitSimulator::new(SimulationParams::default());

    for exchange_count in [2_usize, 5, 10, 25] {
        let fresh = generate_quotes(&pair, exchange_count);

        let candidates = evaluate(&pair, &fresh);
        let simulations: Vec<_> = candidates
            .iter()
            .filter_map(|c| simulator.simulate(c).ok())
            .collect();
        println!(
            "{exchange_count} exchanges: {} candidates, {} qualifying, total net {}",
            candidates.len(),
            simulations.iter().filter(|s| s.qualifies).count(),
            total_net_profit(&simulations)
        );

        group.throughput(criterion::Throughput::Elements(exchange_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(exchange_count),
            &fresh,
            |b, fresh| {
                b.iter(|| {
                    let candidates = evaluate(&pair, black_box(fresh));
                    let qualifying = candidates
                        .iter()
                        .filter_map(|c| simulator.simulate(c).ok())
                        .filter(|s| s.qualifies)
                        .count();
                    black_box(qualifying)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate_and_simulate);
criterion_main!(benches);
