//! Demo binary: runs the orchestrator over a small synthetic candidate set and prints the
//! resulting aggregates. Not a deliverable CLI — there is no argument parsing beyond picking
//! which synthetic scenario to run; real callers drive the library directly.
//!
//! Leaf errors are the crate's closed `EngineError` enum; this binary is the outer boundary
//! where they're composed under `anyhow::Result` the way the rest of the corpus does it.

use anyhow::Context;

use dex_backtest_engine::domain::{
    Candidate, CandidateSource, LiquidityEventType, RawLiquidityEvent, RawSwap, Side,
};
use dex_backtest_engine::storage::{
    CandidateStore, InMemoryStore, LiquiditySeriesStore, PriceSeriesStore, RawLiquidityStore,
    RawSwapStore, StrategyAggregateStore, VolumeSeriesStore,
};
use dex_backtest_engine::{
    normalize_candidate, run_orchestrator, CancellationToken, OrchestratorDeps, ScenarioConfig,
    StrategyConfig,
};

fn swap(candidate_id: &str, ts: i64, idx: u32, side: Side, amount_in: f64, amount_out: f64, price: f64) -> RawSwap {
    RawSwap {
        candidate_id: candidate_id.into(),
        tx_signature: format!("{candidate_id}-tx{idx}"),
        event_index: idx,
        slot: idx as u64,
        timestamp: ts,
        side,
        amount_in,
        amount_out,
        price,
    }
}

fn seed_candidate(store: &InMemoryStore, id: &str, discovered_at: i64, swaps: Vec<RawSwap>) -> anyhow::Result<()> {
    CandidateStore::insert(
        store,
        Candidate {
            candidate_id: id.into(),
            mint: format!("mint-{id}"),
            source: CandidateSource::NewToken,
            discovered_at,
            pool: Some("demo-pool".into()),
            tx_signature: None,
            slot: None,
        },
    )
    .with_context(|| format!("seeding candidate {id}"))?;

    RawSwapStore::insert_bulk(store, swaps.clone()).with_context(|| format!("seeding raw swaps for {id}"))?;
    let normalized =
        normalize_candidate(&id.into(), &swaps, &[]).with_context(|| format!("normalizing swaps for {id}"))?;
    PriceSeriesStore::insert_bulk(store, normalized.price_points)
        .with_context(|| format!("seeding price points for {id}"))?;
    VolumeSeriesStore::insert_bulk(store, normalized.volume_points)
        .with_context(|| format!("seeding volume points for {id}"))?;

    let liquidity_event = RawLiquidityEvent {
        candidate_id: id.into(),
        tx_signature: format!("{id}-lp0"),
        event_index: 0,
        slot: 1,
        timestamp: discovered_at - 500,
        event_type: LiquidityEventType::Add,
        amount_token: 5_000.0,
        amount_quote: 5_000.0,
        liquidity_after: 10_000.0,
    };
    RawLiquidityStore::insert_bulk(store, vec![liquidity_event.clone()])
        .with_context(|| format!("seeding liquidity events for {id}"))?;
    let normalized_liq = normalize_candidate(&id.into(), &[], &[liquidity_event])
        .with_context(|| format!("normalizing liquidity events for {id}"))?;
    LiquiditySeriesStore::insert_bulk(store, normalized_liq.liquidity_points)
        .with_context(|| format!("seeding liquidity points for {id}"))?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let store = InMemoryStore::default();

    seed_candidate(
        &store,
        "demo-rocket",
        1_000,
        vec![
            swap("demo-rocket", 1_000, 0, Side::Buy, 10.0, 9.9, 1.00),
            swap("demo-rocket", 2_000, 1, Side::Buy, 8.0, 7.9, 1.20),
            swap("demo-rocket", 10_000, 2, Side::Sell, 6.0, 7.1, 1.45),
            swap("demo-rocket", 40_000, 3, Side::Sell, 5.0, 5.6, 1.10),
        ],
    )?;
    seed_candidate(
        &store,
        "demo-rug",
        1_000,
        vec![
            swap("demo-rug", 1_000, 0, Side::Buy, 10.0, 9.9, 1.00),
            swap("demo-rug", 5_000, 1, Side::Sell, 8.0, 6.0, 0.70),
            swap("demo-rug", 20_000, 2, Side::Sell, 4.0, 2.2, 0.50),
        ],
    )?;

    let deps = OrchestratorDeps {
        candidates: &store,
        prices: &store,
        liquidity: &store,
        volume: &store,
        trades: &store,
        aggregates: &store,
    };

    let strategies = vec![
        StrategyConfig::TimeExit { hold_duration_ms: 30_000 },
        StrategyConfig::TrailingStop {
            trail_pct: 0.15,
            initial_stop_pct: 0.10,
            max_hold_duration_ms: Some(60_000),
        },
    ];
    let scenarios = ScenarioConfig::all_presets().to_vec();
    let token = CancellationToken::new();

    let summary = run_orchestrator(&deps, &strategies, &scenarios, &token).context("orchestrator run failed")?;

    println!(
        "orchestrator run: {} candidates, {} trades persisted, {} missing, cancelled={}",
        summary.candidates_considered, summary.trades_persisted, summary.missing_candidates, summary.cancelled
    );

    let aggregates = StrategyAggregateStore::get_all(&store).context("reading aggregates back")?;
    for agg in &aggregates {
        println!(
            "{:>14} / {:<11} / {:?}: trades={} win_rate={:.2} mean_outcome={:.5} max_drawdown={:.5}",
            agg.strategy_id,
            agg.scenario_id,
            agg.entry_event_type,
            agg.total_trades,
            agg.win_rate,
            agg.outcome_stats.mean,
            agg.max_drawdown,
        );
    }

    if let Some(first) = aggregates.first() {
        let json = serde_json::to_string_pretty(first).context("serializing sample aggregate")?;
        println!("\nsample aggregate as JSON:\n{json}");
    }

    Ok(())
}
