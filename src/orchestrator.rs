//! Fans the full (candidate x strategy x scenario) grid out across a bounded worker pool,
//! persists results in deterministic order, and retries storage failures with backoff.
//!
//! Concurrency is confined to this module. Everything it calls into — normalization, the
//! strategy engine, the aggregator — is pure and single-threaded; this is the only place the
//! crate spawns work across cores.

use std::time::Duration;

use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use crate::domain::{Candidate, CandidateSource, EntryEventType, MissingCandidate, MissingReason, TradeRecord};
use crate::error::{EngineError, Result};
use crate::replay::CancellationToken;
use crate::storage::{
    CandidateStore, LiquiditySeriesStore, PriceSeriesStore, StrategyAggregateStore, TradeRecordStore,
    VolumeSeriesStore,
};
use crate::strategy::{EngineInput, ScenarioConfig, StrategyConfig};

const RETRY_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const VOLUME_INTERVAL_SECS: i64 = 60;

/// The storage surface the orchestrator writes to and reads candidate series from. Borrowed
/// for the duration of one run; the underlying stores are `Send + Sync` so the pool can read
/// from them concurrently.
pub struct OrchestratorDeps<'a> {
    pub candidates: &'a dyn CandidateStore,
    pub prices: &'a dyn PriceSeriesStore,
    pub liquidity: &'a dyn LiquiditySeriesStore,
    pub volume: &'a dyn VolumeSeriesStore,
    pub trades: &'a dyn TradeRecordStore,
    pub aggregates: &'a dyn StrategyAggregateStore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub candidates_considered: usize,
    pub trades_persisted: usize,
    pub missing_candidates: usize,
    pub cancelled: bool,
}

fn entry_event_type_for(source: CandidateSource) -> EntryEventType {
    match source {
        CandidateSource::NewToken => EntryEventType::NewToken,
        CandidateSource::ActiveToken => EntryEventType::ActiveToken,
    }
}

/// Retries `f` on `StorageError` with exponential backoff (100ms, 400ms, 1.6s), matching the
/// teacher's `execute_with_retry` idiom but bounded to three attempts rather than five — a
/// single candidate's storage writes are cheap enough not to warrant the longer tail.
fn execute_with_retry<T>(token: &CancellationToken, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    loop {
        token.check()?;
        match f() {
            Ok(v) => return Ok(v),
            Err(EngineError::StorageError(msg)) => {
                attempt += 1;
                if attempt >= RETRY_ATTEMPTS {
                    return Err(EngineError::StorageError(msg));
                }
                warn!(attempt, backoff_ms, error = %msg, "storage call failed, retrying");
                std::thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms *= 4;
            }
            Err(other) => return Err(other),
        }
    }
}

/// Run every strategy against every scenario for one candidate, sequentially, so the
/// per-candidate ordering of produced trades is itself deterministic before the final sort.
fn simulate_candidate(
    deps: &OrchestratorDeps,
    candidate: &Candidate,
    strategies: &[StrategyConfig],
    scenarios: &[ScenarioConfig],
    token: &CancellationToken,
) -> (Vec<TradeRecord>, Vec<MissingCandidate>) {
    let mut trades = Vec::new();
    let mut missing = Vec::new();
    let mut seen_missing: std::collections::BTreeSet<(String, MissingReason)> = std::collections::BTreeSet::new();

    if token.is_cancelled() {
        return (trades, missing);
    }

    let entry_event_type = entry_event_type_for(candidate.source);

    let prices = match execute_with_retry(token, || deps.prices.get_by_candidate_id(&candidate.candidate_id)) {
        Ok(p) => p,
        Err(e) => {
            error!(candidate_id = %candidate.candidate_id, error = %e, "failed to load price series");
            return (trades, missing);
        }
    };
    let liquidity = match execute_with_retry(token, || deps.liquidity.get_by_candidate_id(&candidate.candidate_id)) {
        Ok(l) => l,
        Err(e) => {
            error!(candidate_id = %candidate.candidate_id, error = %e, "failed to load liquidity series");
            return (trades, missing);
        }
    };
    let volume_60s = match execute_with_retry(token, || {
        deps.volume.get_by_candidate_id(&candidate.candidate_id, VOLUME_INTERVAL_SECS)
    }) {
        Ok(v) => v,
        Err(e) => {
            error!(candidate_id = %candidate.candidate_id, error = %e, "failed to load volume series");
            return (trades, missing);
        }
    };

    if prices.is_empty() {
        for strategy in strategies {
            missing.push(MissingCandidate {
                candidate_id: candidate.candidate_id.clone(),
                strategy_id: strategy.strategy_id(),
                entry_event_type,
                reason: MissingReason::NoPriceData,
            });
        }
        return (trades, missing);
    }

    let input = EngineInput {
        candidate,
        price_series: &prices,
        liquidity_series: &liquidity,
        volume_series_60s: &volume_60s,
    };

    'strategies: for strategy in strategies {
        if token.is_cancelled() {
            break 'strategies;
        }
        for scenario in scenarios {
            if token.is_cancelled() {
                break 'strategies;
            }
            match crate::strategy::simulate(&input, strategy, scenario, entry_event_type) {
                Ok(record) => trades.push(record),
                Err(e) => {
                    let reason = match e {
                        EngineError::NoEntrySignal { .. } => MissingReason::NoEntrySignal,
                        EngineError::NoPriceData { .. } => MissingReason::NoPriceData,
                        other => {
                            error!(
                                candidate_id = %candidate.candidate_id,
                                strategy_id = strategy.strategy_id(),
                                scenario_id = %scenario.scenario_id,
                                error = %other,
                                "unrecoverable engine error"
                            );
                            MissingReason::EngineError
                        }
                    };
                    let key = (strategy.strategy_id(), reason);
                    if seen_missing.insert(key) {
                        missing.push(MissingCandidate {
                            candidate_id: candidate.candidate_id.clone(),
                            strategy_id: strategy.strategy_id(),
                            entry_event_type,
                            reason,
                        });
                    }
                }
            }
        }
    }

    debug!(candidate_id = %candidate.candidate_id, trades = trades.len(), "candidate simulated");
    (trades, missing)
}

/// Run the full grid and persist every trade record, missing-candidate entry, and strategy
/// aggregate. Candidates are fanned out across a pool sized to `min(cores, candidate count)`;
/// persistence itself is single-threaded and ordered by `(candidate_id, strategy_id,
/// scenario_id, entry_event_type)` regardless of completion order, so two runs over the same
/// inputs produce byte-identical storage contents.
pub fn run(
    deps: &OrchestratorDeps,
    strategies: &[StrategyConfig],
    scenarios: &[ScenarioConfig],
    token: &CancellationToken,
) -> Result<RunSummary> {
    for strategy in strategies {
        strategy.validate()?;
    }

    let candidates = deps.candidates.get_all()?;
    let pool_width = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(candidates.len().max(1));

    let pool = ThreadPoolBuilder::new()
        .num_threads(pool_width)
        .build()
        .map_err(|e| EngineError::StorageError(format!("failed to build worker pool: {e}")))?;

    info!(candidates = candidates.len(), pool_width, "starting orchestrator run");

    let per_candidate: Vec<(Vec<TradeRecord>, Vec<MissingCandidate>)> = pool.install(|| {
        candidates
            .par_iter()
            .map(|candidate| {
                if token.is_cancelled() {
                    (Vec::new(), Vec::new())
                } else {
                    simulate_candidate(deps, candidate, strategies, scenarios, token)
                }
            })
            .collect()
    });

    if token.is_cancelled() {
        warn!("run cancelled; persisting partial results only");
    }

    let mut all_trades: Vec<TradeRecord> = Vec::new();
    let mut all_missing: Vec<MissingCandidate> = Vec::new();
    for (trades, missing) in per_candidate {
        all_trades.extend(trades);
        all_missing.extend(missing);
    }

    all_trades.sort_by(|a, b| {
        (&a.candidate_id, &a.strategy_id, &a.scenario_id, a.entry_event_type)
            .cmp(&(&b.candidate_id, &b.strategy_id, &b.scenario_id, b.entry_event_type))
    });
    all_missing.sort_by(|a, b| {
        (&a.candidate_id, &a.strategy_id).cmp(&(&b.candidate_id, &b.strategy_id))
    });

    let mut persisted = 0;
    for trade in &all_trades {
        token.check()?;
        execute_with_retry(token, || deps.trades.insert(trade.clone()))?;
        persisted += 1;
    }
    for missing in &all_missing {
        execute_with_retry(token, || deps.aggregates.insert_missing(missing.clone()))?;
    }

    let aggregates = crate::aggregator::aggregate(&all_trades);
    for agg in &aggregates {
        execute_with_retry(token, || deps.aggregates.insert(agg.clone()))?;
    }

    info!(
        trades_persisted = persisted,
        missing = all_missing.len(),
        aggregates = aggregates.len(),
        "orchestrator run complete"
    );

    Ok(RunSummary {
        candidates_considered: candidates.len(),
        trades_persisted: persisted,
        missing_candidates: all_missing.len(),
        cancelled: token.is_cancelled(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateSource, PricePoint};
    use crate::storage::InMemoryStore;
    use crate::time::Millis;

    fn seed_candidate(store: &InMemoryStore, id: &str, discovered_at: Millis) {
        CandidateStore::insert(
            store,
            Candidate {
                candidate_id: id.into(),
                mint: format!("mint-{id}"),
                source: CandidateSource::NewToken,
                discovered_at,
                pool: None,
                tx_signature: None,
                slot: None,
            },
        )
        .unwrap();
    }

    fn seed_prices(store: &InMemoryStore, id: &str, points: &[(Millis, f64)]) {
        let pts = points
            .iter()
            .map(|(t, p)| PricePoint {
                candidate_id: id.into(),
                timestamp_ms: *t,
                slot: 1,
                price: *p,
                volume: 0.0,
                swap_count: 1,
            })
            .collect();
        PriceSeriesStore::insert_bulk(store, pts).unwrap();
    }

    #[test]
    fn full_grid_persists_deterministic_trade_order() {
        let store = InMemoryStore::default();
        seed_candidate(&store, "c1", 1000);
        seed_candidate(&store, "c2", 1000);
        seed_prices(&store, "c1", &[(1000, 1.0), (2000, 1.05), (5000, 1.1)]);
        seed_prices(&store, "c2", &[(1000, 1.0), (2000, 0.95), (5000, 0.9)]);

        let deps = OrchestratorDeps {
            candidates: &store,
            prices: &store,
            liquidity: &store,
            volume: &store,
            trades: &store,
            aggregates: &store,
        };

        let strategies = vec![StrategyConfig::TimeExit { hold_duration_ms: 4000 }];
        let scenarios = vec![ScenarioConfig::realistic()];
        let token = CancellationToken::new();

        let summary = run(&deps, &strategies, &scenarios, &token).unwrap();
        assert_eq!(summary.candidates_considered, 2);
        assert_eq!(summary.trades_persisted, 2);
        assert!(!summary.cancelled);

        let stored = TradeRecordStore::get_all(&store).unwrap();
        let ids: Vec<String> = stored.iter().map(|t| t.candidate_id.to_string()).collect();
        assert_eq!(ids, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn candidate_with_no_price_data_is_recorded_as_missing() {
        let store = InMemoryStore::default();
        seed_candidate(&store, "c1", 1000);

        let deps = OrchestratorDeps {
            candidates: &store,
            prices: &store,
            liquidity: &store,
            volume: &store,
            trades: &store,
            aggregates: &store,
        };

        let strategies = vec![StrategyConfig::TimeExit { hold_duration_ms: 4000 }];
        let scenarios = vec![ScenarioConfig::realistic()];
        let token = CancellationToken::new();

        let summary = run(&deps, &strategies, &scenarios, &token).unwrap();
        assert_eq!(summary.trades_persisted, 0);
        assert_eq!(summary.missing_candidates, 1);

        let missing = StrategyAggregateStore::get_missing(&store).unwrap();
        assert_eq!(missing[0].reason, MissingReason::NoPriceData);
    }

    #[test]
    fn pre_cancelled_token_short_circuits_with_zero_trades() {
        let store = InMemoryStore::default();
        seed_candidate(&store, "c1", 1000);
        seed_prices(&store, "c1", &[(1000, 1.0), (5000, 1.1)]);

        let deps = OrchestratorDeps {
            candidates: &store,
            prices: &store,
            liquidity: &store,
            volume: &store,
            trades: &store,
            aggregates: &store,
        };

        let strategies = vec![StrategyConfig::TimeExit { hold_duration_ms: 4000 }];
        let scenarios = vec![ScenarioConfig::realistic()];
        let token = CancellationToken::new();
        token.cancel();

        let summary = run(&deps, &strategies, &scenarios, &token);
        assert!(matches!(summary, Err(EngineError::CancellationRequested)) || summary.unwrap().cancelled);
    }

    #[test]
    fn invalid_strategy_config_fails_fast() {
        let store = InMemoryStore::default();
        let deps = OrchestratorDeps {
            candidates: &store,
            prices: &store,
            liquidity: &store,
            volume: &store,
            trades: &store,
            aggregates: &store,
        };
        let strategies = vec![StrategyConfig::TimeExit { hold_duration_ms: 0 }];
        let scenarios = vec![ScenarioConfig::realistic()];
        let token = CancellationToken::new();
        assert!(run(&deps, &strategies, &scenarios, &token).is_err());
    }
}
