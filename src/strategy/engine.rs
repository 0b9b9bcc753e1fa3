//! Deterministic event-driven strategy simulation engine.
//!
//! States: `AwaitingEntry -> Holding -> Exited`. Single-threaded and purely functional over its
//! inputs: the same (candidate, strategy, scenario, entry-event-type) always produces a
//! byte-identical trade record.

use tracing::debug;

use crate::domain::{
    trade_id, Candidate, CostBreakdown, EntryEventType, ExitReason, LiquidityPoint, OutcomeClass,
    PricePoint, TradeRecord, VolumePoint,
};
use crate::error::{EngineError, Result};
use crate::replay::{merge_series, ReplayEvent};
use crate::strategy::config::{ScenarioConfig, StrategyConfig};
use crate::time::Millis;

/// Everything the engine needs about one candidate to run a single simulation.
pub struct EngineInput<'a> {
    pub candidate: &'a Candidate,
    pub price_series: &'a [PricePoint],
    pub liquidity_series: &'a [LiquidityPoint],
    pub volume_series_60s: &'a [VolumePoint],
}

/// Find the most recent point at or before `t` in a series sorted ascending by timestamp.
/// No linear interpolation — this is a resolved open question in the spec.
fn last_at_or_before<T>(series: &[T], t: Millis, ts: impl Fn(&T) -> Millis) -> Option<usize> {
    let idx = series.partition_point(|p| ts(p) <= t);
    if idx == 0 {
        None
    } else {
        Some(idx - 1)
    }
}

fn first_at_or_after<T>(series: &[T], t: Millis, ts: impl Fn(&T) -> Millis) -> Option<usize> {
    let idx = series.partition_point(|p| ts(p) < t);
    if idx < series.len() {
        Some(idx)
    } else {
        None
    }
}

fn find_entry_index(input: &EngineInput, entry_event_type: EntryEventType, spike_k: f64, spike_n: usize) -> Result<usize> {
    if input.price_series.is_empty() {
        return Err(EngineError::NoPriceData {
            candidate_id: input.candidate.candidate_id.to_string(),
        });
    }

    match entry_event_type {
        EntryEventType::NewToken => {
            first_at_or_after(input.price_series, input.candidate.discovered_at, |p| p.timestamp_ms).ok_or(
                EngineError::NoEntrySignal {
                    candidate_id: input.candidate.candidate_id.to_string(),
                },
            )
        }
        EntryEventType::ActiveToken => find_spike_index(input.volume_series_60s, input.price_series, spike_k, spike_n)
            .ok_or(EngineError::NoEntrySignal {
                candidate_id: input.candidate.candidate_id.to_string(),
            }),
    }
}

/// First price-point index at which the most recent 60s volume bucket is `>= k * trailing
/// mean` over the prior `n` buckets.
fn find_spike_index(volume_60s: &[VolumePoint], prices: &[PricePoint], k: f64, n: usize) -> Option<usize> {
    for (i, bucket) in volume_60s.iter().enumerate() {
        if i < n {
            continue;
        }
        let window = &volume_60s[i - n..i];
        let trailing_mean: f64 = window.iter().map(|v| v.volume).sum::<f64>() / n as f64;
        if trailing_mean <= 0.0 {
            continue;
        }
        if bucket.volume >= k * trailing_mean {
            // Map the bucket's timestamp to the first price point at or after it.
            if let Some(idx) = first_at_or_after(prices, bucket.timestamp_ms, |p| p.timestamp_ms) {
                return Some(idx);
            }
        }
    }
    None
}

fn liquidity_at_or_before(series: &[LiquidityPoint], t: Millis) -> Option<f64> {
    last_at_or_before(series, t, |p| p.timestamp_ms).map(|idx| series[idx].liquidity)
}

/// Per-strategy mutable tracking state while `Holding`.
enum HoldState {
    TimeExit {
        exit_time: Millis,
    },
    TrailingStop {
        peak: f64,
        trail_pct: f64,
        initial_stop_pct: f64,
        entry_price: f64,
        max_hold_duration_ms: Option<Millis>,
    },
    LiquidityGuard {
        entry_liquidity: f64,
        liquidity_drop_pct: f64,
        max_hold_duration_ms: Option<Millis>,
    },
}

struct ExitDecision {
    reason: ExitReason,
    signal_time: Millis,
    signal_price: f64,
}

fn evaluate_exit(
    state: &mut HoldState,
    entry_actual_time: Millis,
    now: Millis,
    price_series: &[PricePoint],
    current_price: Option<(Millis, f64)>,
    current_liquidity: Option<(Millis, f64)>,
) -> Option<ExitDecision> {
    let max_hold = match state {
        HoldState::TimeExit { .. } => None,
        HoldState::TrailingStop { max_hold_duration_ms, .. } => *max_hold_duration_ms,
        HoldState::LiquidityGuard { max_hold_duration_ms, .. } => *max_hold_duration_ms,
    };

    // Strategy-specific condition first (wins every tie-break against MaxHold).
    let strategy_hit: Option<ExitDecision> = match state {
        HoldState::TimeExit { exit_time } => {
            if now >= *exit_time {
                let signal_price = last_at_or_before(price_series, *exit_time, |p| p.timestamp_ms)
                    .map(|idx| price_series[idx].price)
                    .expect("price series non-empty, checked at entry");
                Some(ExitDecision {
                    reason: ExitReason::TimeExit,
                    signal_time: *exit_time,
                    signal_price,
                })
            } else {
                None
            }
        }
        HoldState::TrailingStop {
            peak,
            trail_pct,
            initial_stop_pct,
            entry_price,
            ..
        } => {
            if let Some((t, p)) = current_price {
                *peak = peak.max(p);
                let stop_level = if *peak > *entry_price {
                    *peak * (1.0 - *trail_pct)
                } else {
                    *entry_price * (1.0 - *initial_stop_pct)
                };
                if p <= stop_level {
                    Some(ExitDecision {
                        reason: ExitReason::TrailingStop,
                        signal_time: t,
                        signal_price: p,
                    })
                } else {
                    None
                }
            } else {
                None
            }
        }
        HoldState::LiquidityGuard {
            entry_liquidity,
            liquidity_drop_pct,
            ..
        } => {
            if let Some((t, l)) = current_liquidity {
                let threshold = *entry_liquidity * (1.0 - *liquidity_drop_pct);
                if l <= threshold {
                    if let Some((_, p)) = current_price {
                        Some(ExitDecision {
                            reason: ExitReason::LiquidityGuard,
                            signal_time: t,
                            signal_price: p,
                        })
                    } else {
                        None
                    }
                } else {
                    None
                }
            } else {
                None
            }
        }
    };

    if strategy_hit.is_some() {
        return strategy_hit;
    }

    if let Some(max_hold_ms) = max_hold {
        let max_hold_time = entry_actual_time + max_hold_ms;
        if now >= max_hold_time {
            let signal_price = last_at_or_before(price_series, max_hold_time, |p| p.timestamp_ms)
                .map(|idx| price_series[idx].price)
                .expect("price series non-empty, checked at entry");
            return Some(ExitDecision {
                reason: ExitReason::MaxHold,
                signal_time: max_hold_time,
                signal_price,
            });
        }
    }

    None
}

/// Run one simulation for a candidate under a strategy and scenario configuration.
pub fn simulate(
    input: &EngineInput,
    strategy: &StrategyConfig,
    scenario: &ScenarioConfig,
    entry_event_type: EntryEventType,
) -> Result<TradeRecord> {
    strategy.validate()?;

    let entry_idx = find_entry_index(
        input,
        entry_event_type,
        scenario.spike_threshold.k,
        scenario.spike_threshold.n,
    )?;
    let entry_signal = &input.price_series[entry_idx];
    let entry_signal_time = entry_signal.timestamp_ms;
    let entry_signal_price = entry_signal.price;

    let entry_actual_time = entry_signal_time + scenario.signal_to_fill_ms;
    let entry_actual_price = entry_signal_price * (1.0 + scenario.entry_slippage_pct);
    let entry_liquidity = liquidity_at_or_before(input.liquidity_series, entry_signal_time);

    let mut state = match strategy {
        StrategyConfig::TimeExit { hold_duration_ms } => HoldState::TimeExit {
            exit_time: entry_signal_time + hold_duration_ms,
        },
        StrategyConfig::TrailingStop {
            trail_pct,
            initial_stop_pct,
            max_hold_duration_ms,
        } => HoldState::TrailingStop {
            peak: entry_actual_price,
            trail_pct: *trail_pct,
            initial_stop_pct: *initial_stop_pct,
            entry_price: entry_actual_price,
            max_hold_duration_ms: *max_hold_duration_ms,
        },
        StrategyConfig::LiquidityGuard {
            liquidity_drop_pct,
            max_hold_duration_ms,
        } => HoldState::LiquidityGuard {
            entry_liquidity: entry_liquidity.unwrap_or(0.0),
            liquidity_drop_pct: *liquidity_drop_pct,
            max_hold_duration_ms: *max_hold_duration_ms,
        },
    };

    let merged = merge_series(input.price_series, input.liquidity_series);
    let mut peak_price = entry_actual_price;
    let mut min_liquidity: Option<f64> = entry_liquidity;

    // Seed the running trackers from the last known value at-or-before entry so a strategy
    // whose condition depends on them (LiquidityGuard's baseline, MaxHold/TimeExit's clock) can
    // evaluate correctly even before the walk observes its first post-entry event of that kind.
    let mut last_price_at_or_after: Option<(Millis, f64)> = last_at_or_before(input.price_series, entry_actual_time, |p| p.timestamp_ms)
        .map(|idx| (input.price_series[idx].timestamp_ms, input.price_series[idx].price));
    let mut last_liquidity_at_or_after: Option<(Millis, f64)> = last_at_or_before(input.liquidity_series, entry_actual_time, |p| p.timestamp_ms)
        .map(|idx| (input.liquidity_series[idx].timestamp_ms, input.liquidity_series[idx].liquidity));
    let mut decision: Option<ExitDecision> = None;

    for event in &merged {
        if event.timestamp_ms() < entry_actual_time {
            continue;
        }
        let now = event.timestamp_ms();
        match event {
            ReplayEvent::Price(p) => {
                peak_price = peak_price.max(p.price);
                last_price_at_or_after = Some((p.timestamp_ms, p.price));
            }
            ReplayEvent::Liquidity(l) => {
                min_liquidity = Some(min_liquidity.map_or(l.liquidity, |m| m.min(l.liquidity)));
                last_liquidity_at_or_after = Some((l.timestamp_ms, l.liquidity));
            }
        }

        if let Some(d) = evaluate_exit(
            &mut state,
            entry_actual_time,
            now,
            input.price_series,
            last_price_at_or_after,
            last_liquidity_at_or_after,
        ) {
            decision = Some(d);
            break;
        }
    }

    let decision = decision.unwrap_or_else(|| {
        // End of data while still holding: exit at the last known price.
        let last_idx = last_at_or_before(input.price_series, Millis::MAX, |p| p.timestamp_ms)
            .expect("price series non-empty, checked at entry");
        let last = &input.price_series[last_idx];
        ExitDecision {
            reason: ExitReason::EndOfData,
            signal_time: last.timestamp_ms,
            signal_price: last.price,
        }
    });

    let exit_signal_time = decision.signal_time;
    let exit_signal_price = decision.signal_price;
    let exit_actual_time = exit_signal_time + scenario.signal_to_fill_ms;
    let exit_actual_price = exit_signal_price * (1.0 - scenario.exit_slippage_pct);

    let position_size = 1.0;
    let position_value = entry_actual_price * position_size;

    let entry_cost_sol = scenario.fixed_entry_cost_sol;
    let exit_cost_sol = scenario.fixed_exit_cost_sol;
    let mev_cost_sol = scenario.mev_cost_sol;
    let total_cost_sol = entry_cost_sol + exit_cost_sol + mev_cost_sol;
    let total_cost_pct = total_cost_sol / position_value;

    let gross_return = (exit_actual_price - entry_actual_price) / entry_actual_price;
    let outcome = gross_return - total_cost_pct;
    let outcome_class = OutcomeClass::classify(outcome);
    let hold_duration_ms = exit_actual_time - entry_actual_time;

    let record = TradeRecord {
        trade_id: trade_id(
            &input.candidate.candidate_id,
            &strategy.strategy_id(),
            &scenario.scenario_id,
            entry_event_type,
        ),
        candidate_id: input.candidate.candidate_id.clone(),
        strategy_id: strategy.strategy_id(),
        scenario_id: scenario.scenario_id.clone(),
        entry_event_type,
        entry_signal_time,
        entry_signal_price,
        entry_actual_time,
        entry_actual_price,
        entry_liquidity,
        position_size,
        position_value,
        exit_signal_time,
        exit_signal_price,
        exit_actual_time,
        exit_actual_price,
        exit_reason: decision.reason,
        cost: CostBreakdown {
            entry_cost_sol,
            exit_cost_sol,
            mev_cost_sol,
            total_cost_sol,
            total_cost_pct,
        },
        gross_return,
        outcome,
        outcome_class,
        hold_duration_ms,
        peak_price: Some(peak_price),
        min_liquidity,
    };

    debug!(
        trade_id = %record.trade_id,
        outcome = record.outcome,
        class = ?record.outcome_class,
        "simulated trade"
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CandidateSource;

    fn candidate(discovered_at: Millis) -> Candidate {
        Candidate {
            candidate_id: "c1".into(),
            mint: "mint".into(),
            source: CandidateSource::NewToken,
            discovered_at,
            pool: None,
            tx_signature: None,
            slot: None,
        }
    }

    fn price(t: Millis, p: f64) -> PricePoint {
        PricePoint {
            candidate_id: "c1".into(),
            timestamp_ms: t,
            slot: 1,
            price: p,
            volume: 0.0,
            swap_count: 1,
        }
    }

    fn liquidity(t: Millis, l: f64) -> LiquidityPoint {
        LiquidityPoint {
            candidate_id: "c1".into(),
            timestamp_ms: t,
            slot: 1,
            liquidity: l,
            liquidity_token: l,
            liquidity_quote: l,
        }
    }

    #[test]
    fn time_exit_new_token_realistic_scenario() {
        let candidate = candidate(1000);
        let prices = vec![price(1000, 1.00), price(1300, 1.05), price(1600, 1.10)];
        let liquidity_series = vec![];
        let volume_series = vec![];
        let input = EngineInput {
            candidate: &candidate,
            price_series: &prices,
            liquidity_series: &liquidity_series,
            volume_series_60s: &volume_series,
        };
        let strategy = StrategyConfig::TimeExit { hold_duration_ms: 500 };
        let scenario = ScenarioConfig::realistic();

        let record = simulate(&input, &strategy, &scenario, EntryEventType::NewToken).unwrap();

        assert_eq!(record.entry_signal_time, 1000);
        assert_eq!(record.entry_actual_time, 1500);
        assert!((record.entry_actual_price - 1.005).abs() < 1e-9);
        assert_eq!(record.exit_signal_time, 1500);
        assert!((record.exit_signal_price - 1.05).abs() < 1e-9);
        assert!((record.exit_actual_price - 1.04475).abs() < 1e-9);
        assert!((record.gross_return - 0.0395522388059701).abs() < 1e-9);
        assert!((record.cost.total_cost_sol - 0.0013).abs() < 1e-12);
        assert_eq!(record.outcome_class, OutcomeClass::Win);
    }

    #[test]
    fn trailing_stop_exits_on_drawdown_from_peak() {
        let candidate = candidate(0);
        let prices = vec![price(0, 1.0), price(100, 1.2), price(200, 1.5), price(300, 1.3)];
        let liquidity_series = vec![];
        let volume_series = vec![];
        let input = EngineInput {
            candidate: &candidate,
            price_series: &prices,
            liquidity_series: &liquidity_series,
            volume_series_60s: &volume_series,
        };
        let strategy = StrategyConfig::TrailingStop {
            trail_pct: 0.10,
            initial_stop_pct: 0.10,
            max_hold_duration_ms: None,
        };
        let scenario = ScenarioConfig {
            entry_slippage_pct: 0.0,
            exit_slippage_pct: 0.0,
            signal_to_fill_ms: 0,
            fixed_entry_cost_sol: 0.0,
            fixed_exit_cost_sol: 0.0,
            mev_cost_sol: 0.0,
            ..ScenarioConfig::realistic()
        };

        let record = simulate(&input, &strategy, &scenario, EntryEventType::NewToken).unwrap();
        assert_eq!(record.exit_reason, ExitReason::TrailingStop);
        assert!((record.exit_signal_price - 1.3).abs() < 1e-9);
    }

    #[test]
    fn liquidity_guard_exits_on_drop_from_entry_liquidity() {
        let candidate = candidate(0);
        let prices = vec![price(0, 1.0), price(100, 1.0), price(200, 1.0)];
        let liquidity_series = vec![liquidity(0, 10_000.0), liquidity(100, 8_000.0), liquidity(200, 6_000.0)];
        let volume_series = vec![];
        let input = EngineInput {
            candidate: &candidate,
            price_series: &prices,
            liquidity_series: &liquidity_series,
            volume_series_60s: &volume_series,
        };
        let strategy = StrategyConfig::LiquidityGuard {
            liquidity_drop_pct: 0.30,
            max_hold_duration_ms: None,
        };
        let scenario = ScenarioConfig {
            entry_slippage_pct: 0.0,
            exit_slippage_pct: 0.0,
            signal_to_fill_ms: 0,
            ..ScenarioConfig::realistic()
        };

        let record = simulate(&input, &strategy, &scenario, EntryEventType::NewToken).unwrap();
        assert_eq!(record.exit_reason, ExitReason::LiquidityGuard);
        assert!((record.min_liquidity.unwrap() - 6_000.0).abs() < 1e-9);
    }

    #[test]
    fn empty_price_series_fails_with_no_price_data() {
        let candidate = candidate(0);
        let input = EngineInput {
            candidate: &candidate,
            price_series: &[],
            liquidity_series: &[],
            volume_series_60s: &[],
        };
        let strategy = StrategyConfig::TimeExit { hold_duration_ms: 100 };
        let scenario = ScenarioConfig::realistic();
        let err = simulate(&input, &strategy, &scenario, EntryEventType::NewToken).unwrap_err();
        assert!(matches!(err, EngineError::NoPriceData { .. }));
    }

    #[test]
    fn simulation_is_pure_and_repeatable() {
        let candidate = candidate(1000);
        let prices = vec![price(1000, 1.00), price(1300, 1.05), price(1600, 1.10)];
        let input = EngineInput {
            candidate: &candidate,
            price_series: &prices,
            liquidity_series: &[],
            volume_series_60s: &[],
        };
        let strategy = StrategyConfig::TimeExit { hold_duration_ms: 500 };
        let scenario = ScenarioConfig::realistic();

        let a = simulate(&input, &strategy, &scenario, EntryEventType::NewToken).unwrap();
        let b = simulate(&input, &strategy, &scenario, EntryEventType::NewToken).unwrap();
        assert_eq!(a, b);
    }
}
