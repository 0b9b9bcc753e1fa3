//! Rolls trade records up into per (strategy, scenario, entry-event-type) aggregates with
//! distributional statistics, max drawdown, and max consecutive losses.

use std::collections::BTreeMap;

use statrs::statistics::Statistics;
use tracing::info;

use crate::domain::{
    EntryEventType, MissingCandidate, OutcomeClass, OutcomeStats, SensitivityOutcomes,
    StrategyAggregate, TradeRecord,
};

fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = pct * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

fn outcome_stats(outcomes: &[f64]) -> OutcomeStats {
    if outcomes.is_empty() {
        return OutcomeStats {
            mean: 0.0,
            stddev: 0.0,
            min: 0.0,
            max: 0.0,
            median: 0.0,
            p10: 0.0,
            p25: 0.0,
            p75: 0.0,
            p90: 0.0,
        };
    }
    let mut sorted = outcomes.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mean = Statistics::mean(outcomes);
    let stddev = Statistics::population_std_dev(outcomes);

    OutcomeStats {
        mean,
        stddev,
        min: *sorted.first().unwrap(),
        max: *sorted.last().unwrap(),
        median: percentile_sorted(&sorted, 0.5),
        p10: percentile_sorted(&sorted, 0.10),
        p25: percentile_sorted(&sorted, 0.25),
        p75: percentile_sorted(&sorted, 0.75),
        p90: percentile_sorted(&sorted, 0.90),
    }
}

fn max_drawdown(trades_by_time: &[&TradeRecord]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = 0.0;
    let mut worst = 0.0;
    for t in trades_by_time {
        cumulative += t.outcome;
        peak = peak.max(cumulative);
        let drawdown = cumulative - peak;
        worst = worst.min(drawdown);
    }
    worst
}

fn max_consecutive_losses(trades_by_time: &[&TradeRecord]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for t in trades_by_time {
        if t.outcome_class == OutcomeClass::Loss {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Group trade records by `(strategy_id, scenario_id, entry_event_type)` and compute one
/// `StrategyAggregate` per group.
pub fn aggregate(trades: &[TradeRecord]) -> Vec<StrategyAggregate> {
    type GroupKey = (String, String, EntryEventType);
    let mut groups: BTreeMap<GroupKey, Vec<&TradeRecord>> = BTreeMap::new();
    for t in trades {
        groups
            .entry((t.strategy_id.clone(), t.scenario_id.clone(), t.entry_event_type))
            .or_default()
            .push(t);
    }

    // First pass: per-group stats, keyed for sensitivity lookups by (strategy_id, entry_event_type).
    let mut by_strategy_entry: BTreeMap<(String, EntryEventType), BTreeMap<String, f64>> = BTreeMap::new();
    let mut results = Vec::with_capacity(groups.len());

    for ((strategy_id, scenario_id, entry_event_type), mut group) in groups {
        group.sort_by_key(|t| t.entry_signal_time);

        let total_trades = group.len();
        let wins = group.iter().filter(|t| t.outcome_class == OutcomeClass::Win).count();
        let losses = group.iter().filter(|t| t.outcome_class == OutcomeClass::Loss).count();

        let mut candidates: std::collections::BTreeSet<&crate::domain::CandidateId> = std::collections::BTreeSet::new();
        let mut winning_candidates: std::collections::BTreeSet<&crate::domain::CandidateId> = std::collections::BTreeSet::new();
        for t in &group {
            candidates.insert(&t.candidate_id);
            if t.outcome_class == OutcomeClass::Win {
                winning_candidates.insert(&t.candidate_id);
            }
        }
        let total_tokens = candidates.len();

        let win_rate = if total_trades > 0 { wins as f64 / total_trades as f64 } else { 0.0 };
        let token_win_rate = if total_tokens > 0 {
            winning_candidates.len() as f64 / total_tokens as f64
        } else {
            0.0
        };

        let outcomes: Vec<f64> = group.iter().map(|t| t.outcome).collect();
        let stats = outcome_stats(&outcomes);
        let drawdown = max_drawdown(&group);
        let streak = max_consecutive_losses(&group);

        by_strategy_entry
            .entry((strategy_id.clone(), entry_event_type))
            .or_default()
            .insert(scenario_id.clone(), stats.mean);

        results.push(StrategyAggregate {
            strategy_id,
            scenario_id,
            entry_event_type,
            total_trades,
            wins,
            losses,
            total_tokens,
            win_rate,
            token_win_rate,
            outcome_stats: stats,
            max_drawdown: drawdown,
            max_consecutive_losses: streak,
            sensitivity: SensitivityOutcomes::default(),
        });
    }

    for agg in &mut results {
        if let Some(means) = by_strategy_entry.get(&(agg.strategy_id.clone(), agg.entry_event_type)) {
            agg.sensitivity = SensitivityOutcomes {
                realistic: means.get("realistic").copied(),
                pessimistic: means.get("pessimistic").copied(),
                degraded: means.get("degraded").copied(),
            };
        }
    }

    info!(groups = results.len(), trades = trades.len(), "aggregated trade records");
    results
}

/// Determine, per (strategy, entry_event_type), which candidates never produced a trade
/// record in any scenario, with the reason they were last known to fail.
pub fn missing_candidates(
    trades: &[TradeRecord],
    per_candidate_failures: &[MissingCandidate],
) -> Vec<MissingCandidate> {
    use std::collections::BTreeSet;

    let mut covered: BTreeSet<(crate::domain::CandidateId, String, EntryEventType)> = BTreeSet::new();
    for t in trades {
        covered.insert((t.candidate_id.clone(), t.strategy_id.clone(), t.entry_event_type));
    }

    let mut out: Vec<MissingCandidate> = per_candidate_failures
        .iter()
        .filter(|m| !covered.contains(&(m.candidate_id.clone(), m.strategy_id.clone(), m.entry_event_type)))
        .cloned()
        .collect();

    out.sort_by(|a, b| (&a.candidate_id, &a.strategy_id).cmp(&(&b.candidate_id, &b.strategy_id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CostBreakdown, ExitReason};

    fn trade(strategy: &str, scenario: &str, candidate: &str, entry_time: i64, outcome: f64) -> TradeRecord {
        TradeRecord {
            trade_id: format!("{candidate}:{strategy}:{scenario}"),
            candidate_id: candidate.into(),
            strategy_id: strategy.into(),
            scenario_id: scenario.into(),
            entry_event_type: EntryEventType::NewToken,
            entry_signal_time: entry_time,
            entry_signal_price: 1.0,
            entry_actual_time: entry_time,
            entry_actual_price: 1.0,
            entry_liquidity: None,
            position_size: 1.0,
            position_value: 1.0,
            exit_signal_time: entry_time + 100,
            exit_signal_price: 1.0,
            exit_actual_time: entry_time + 100,
            exit_actual_price: 1.0,
            exit_reason: ExitReason::TimeExit,
            cost: CostBreakdown {
                entry_cost_sol: 0.0,
                exit_cost_sol: 0.0,
                mev_cost_sol: 0.0,
                total_cost_sol: 0.0,
                total_cost_pct: 0.0,
            },
            gross_return: outcome,
            outcome,
            outcome_class: OutcomeClass::classify(outcome),
            hold_duration_ms: 100,
            peak_price: None,
            min_liquidity: None,
        }
    }

    #[test]
    fn median_mean_and_streak_match_spec_example() {
        let trades = vec![
            trade("time_exit", "realistic", "c1", 1000, -0.1),
            trade("time_exit", "realistic", "c2", 2000, 0.0),
            trade("time_exit", "realistic", "c3", 3000, 0.1),
        ];
        let aggs = aggregate(&trades);
        assert_eq!(aggs.len(), 1);
        let agg = &aggs[0];
        assert!((agg.outcome_stats.median - 0.0).abs() < 1e-9);
        assert!((agg.outcome_stats.mean - 0.0).abs() < 1e-9);
        assert_eq!(agg.max_consecutive_losses, 1);
    }

    #[test]
    fn percentiles_are_monotone() {
        let trades: Vec<TradeRecord> = (0..20)
            .map(|i| trade("time_exit", "realistic", &format!("c{i}"), i * 1000, (i as f64 - 10.0) / 100.0))
            .collect();
        let aggs = aggregate(&trades);
        let s = &aggs[0].outcome_stats;
        assert!(s.p10 <= s.p25);
        assert!(s.p25 <= s.median);
        assert!(s.median <= s.p75);
        assert!(s.p75 <= s.p90);
    }

    #[test]
    fn wins_plus_losses_never_exceeds_total() {
        let trades = vec![
            trade("time_exit", "realistic", "c1", 1000, -0.1),
            trade("time_exit", "realistic", "c2", 2000, 0.0),
            trade("time_exit", "realistic", "c3", 3000, 0.1),
        ];
        let aggs = aggregate(&trades);
        let agg = &aggs[0];
        assert!(agg.wins + agg.losses <= agg.total_trades);
    }

    #[test]
    fn sensitivity_fields_copy_mean_from_sibling_scenarios() {
        let trades = vec![
            trade("time_exit", "realistic", "c1", 1000, 0.05),
            trade("time_exit", "pessimistic", "c1", 1000, -0.02),
            trade("time_exit", "degraded", "c1", 1000, -0.10),
        ];
        let aggs = aggregate(&trades);
        for agg in &aggs {
            assert!(agg.sensitivity.realistic.is_some());
            assert!(agg.sensitivity.pessimistic.is_some());
            assert!(agg.sensitivity.degraded.is_some());
        }
    }

    #[test]
    fn max_drawdown_is_nonpositive() {
        let trades = vec![
            trade("time_exit", "realistic", "c1", 1000, 0.1),
            trade("time_exit", "realistic", "c2", 2000, -0.3),
            trade("time_exit", "realistic", "c3", 3000, 0.05),
        ];
        let aggs = aggregate(&trades);
        assert!(aggs[0].max_drawdown <= 0.0);
    }
}
