use serde::{Deserialize, Serialize};

use super::candidate::CandidateId;
use crate::time::Millis;

/// Tolerance used for outcome classification and replayability comparisons.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryEventType {
    NewToken,
    ActiveToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TimeExit,
    TrailingStop,
    LiquidityGuard,
    MaxHold,
    EndOfData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeClass {
    Win,
    Loss,
    Breakeven,
}

impl OutcomeClass {
    /// Classify an outcome per the epsilon rule: `Win` iff `outcome > eps`, `Loss` iff
    /// `outcome < -eps`, `Breakeven` otherwise.
    pub fn classify(outcome: f64) -> Self {
        if outcome > EPSILON {
            OutcomeClass::Win
        } else if outcome < -EPSILON {
            OutcomeClass::Loss
        } else {
            OutcomeClass::Breakeven
        }
    }
}

/// Per-trade cost breakdown, absolute and as a fraction of position value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub entry_cost_sol: f64,
    pub exit_cost_sol: f64,
    pub mev_cost_sol: f64,
    pub total_cost_sol: f64,
    pub total_cost_pct: f64,
}

/// A single fully specified trade outcome: one (candidate, strategy, scenario,
/// entry-event-type) combination produces at most one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub candidate_id: CandidateId,
    pub strategy_id: String,
    pub scenario_id: String,
    pub entry_event_type: EntryEventType,

    pub entry_signal_time: Millis,
    pub entry_signal_price: f64,
    pub entry_actual_time: Millis,
    pub entry_actual_price: f64,
    pub entry_liquidity: Option<f64>,

    pub position_size: f64,
    pub position_value: f64,

    pub exit_signal_time: Millis,
    pub exit_signal_price: f64,
    pub exit_actual_time: Millis,
    pub exit_actual_price: f64,
    pub exit_reason: ExitReason,

    pub cost: CostBreakdown,
    pub gross_return: f64,
    pub outcome: f64,
    pub outcome_class: OutcomeClass,
    pub hold_duration_ms: Millis,

    pub peak_price: Option<f64>,
    pub min_liquidity: Option<f64>,
}

/// Builds the deterministic `trade_id` for a (candidate, strategy, scenario,
/// entry-event-type) combination. Plain concatenation, not a UUID, so replay reproduces it.
pub fn trade_id(
    candidate_id: &CandidateId,
    strategy_id: &str,
    scenario_id: &str,
    entry_event_type: EntryEventType,
) -> String {
    format!(
        "{}:{}:{}:{:?}",
        candidate_id.0, strategy_id, scenario_id, entry_event_type
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_at_epsilon_boundary() {
        assert_eq!(OutcomeClass::classify(2e-9), OutcomeClass::Win);
        assert_eq!(OutcomeClass::classify(-2e-9), OutcomeClass::Loss);
        assert_eq!(OutcomeClass::classify(0.0), OutcomeClass::Breakeven);
        assert_eq!(OutcomeClass::classify(5e-10), OutcomeClass::Breakeven);
    }

    #[test]
    fn trade_id_is_stable_across_calls() {
        let cid = CandidateId::from("c1");
        let a = trade_id(&cid, "time_exit", "realistic", EntryEventType::NewToken);
        let b = trade_id(&cid, "time_exit", "realistic", EntryEventType::NewToken);
        assert_eq!(a, b);
    }
}
