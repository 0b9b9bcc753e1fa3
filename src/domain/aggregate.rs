use serde::{Deserialize, Serialize};

use super::candidate::CandidateId;
use super::trade::EntryEventType;

/// Distributional statistics over a group's outcome values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeStats {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Cross-scenario comparison values, copied from the matching scenario's aggregate mean
/// outcome for the same (strategy, entry-event-type), when that aggregate exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensitivityOutcomes {
    pub realistic: Option<f64>,
    pub pessimistic: Option<f64>,
    pub degraded: Option<f64>,
}

/// Rolled-up statistics for one (strategy, scenario, entry-event-type) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAggregate {
    pub strategy_id: String,
    pub scenario_id: String,
    pub entry_event_type: EntryEventType,

    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_tokens: usize,

    pub win_rate: f64,
    pub token_win_rate: f64,

    pub outcome_stats: OutcomeStats,
    /// Most negative value of (cumulative outcome peak - cumulative outcome trough),
    /// in chronological order by entry_signal_time. Zero or negative.
    pub max_drawdown: f64,
    pub max_consecutive_losses: usize,

    pub sensitivity: SensitivityOutcomes,
}

/// Reasons a candidate can be absent from a strategy's trade set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingReason {
    NoEntrySignal,
    NoPriceData,
    EngineError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCandidate {
    pub candidate_id: CandidateId,
    pub strategy_id: String,
    pub entry_event_type: EntryEventType,
    pub reason: MissingReason,
}
