//! Strategy and scenario configuration.
//!
//! Strategies are modeled as a tagged sum type rather than a struct with optional fields, so
//! the engine dispatches on the variant to select its state tracking.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time::Millis;

/// One of the three exit strategies this engine can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    TimeExit {
        hold_duration_ms: Millis,
    },
    TrailingStop {
        trail_pct: f64,
        initial_stop_pct: f64,
        max_hold_duration_ms: Option<Millis>,
    },
    LiquidityGuard {
        liquidity_drop_pct: f64,
        max_hold_duration_ms: Option<Millis>,
    },
}

impl StrategyConfig {
    /// A stable identifier used as the `strategy_id` component of a trade key.
    pub fn strategy_id(&self) -> String {
        match self {
            StrategyConfig::TimeExit { .. } => "time_exit".to_string(),
            StrategyConfig::TrailingStop { .. } => "trailing_stop".to_string(),
            StrategyConfig::LiquidityGuard { .. } => "liquidity_guard".to_string(),
        }
    }

    /// Validate parameters that the sum-type encoding cannot enforce at compile time — this
    /// matters for configs built from deserialized input rather than constructed directly.
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyConfig::TimeExit { hold_duration_ms } => {
                if *hold_duration_ms <= 0 {
                    return Err(EngineError::InvalidStrategyConfig(
                        "hold_duration_ms must be positive".into(),
                    ));
                }
            }
            StrategyConfig::TrailingStop {
                trail_pct,
                initial_stop_pct,
                ..
            } => {
                if *trail_pct <= 0.0 || *trail_pct >= 1.0 {
                    return Err(EngineError::InvalidStrategyConfig(
                        "trail_pct must be in (0, 1)".into(),
                    ));
                }
                if *initial_stop_pct <= 0.0 || *initial_stop_pct >= 1.0 {
                    return Err(EngineError::InvalidStrategyConfig(
                        "initial_stop_pct must be in (0, 1)".into(),
                    ));
                }
            }
            StrategyConfig::LiquidityGuard {
                liquidity_drop_pct, ..
            } => {
                if *liquidity_drop_pct <= 0.0 || *liquidity_drop_pct >= 1.0 {
                    return Err(EngineError::InvalidStrategyConfig(
                        "liquidity_drop_pct must be in (0, 1)".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn max_hold_duration_ms(&self) -> Option<Millis> {
        match self {
            StrategyConfig::TimeExit { .. } => None,
            StrategyConfig::TrailingStop {
                max_hold_duration_ms,
                ..
            } => *max_hold_duration_ms,
            StrategyConfig::LiquidityGuard {
                max_hold_duration_ms,
                ..
            } => *max_hold_duration_ms,
        }
    }
}

/// Spike-detection parameters for ACTIVE_TOKEN entry signals: volume in the most recent 60s
/// bucket must be `>= k * trailing_mean` over the prior `n` buckets. Exposed as configuration
/// rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeThresholdConfig {
    pub k: f64,
    pub n: usize,
}

impl Default for SpikeThresholdConfig {
    fn default() -> Self {
        SpikeThresholdConfig { k: 3.0, n: 10 }
    }
}

/// Market-friction parameters applied uniformly to one simulation. Pure configuration — the
/// engine consumes it, it has no behavior of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub scenario_id: String,
    pub entry_slippage_pct: f64,
    pub exit_slippage_pct: f64,
    pub signal_to_fill_ms: Millis,
    pub fixed_entry_cost_sol: f64,
    pub fixed_exit_cost_sol: f64,
    pub mev_cost_sol: f64,
    pub spike_threshold: SpikeThresholdConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig::realistic()
    }
}

impl ScenarioConfig {
    pub fn optimistic() -> Self {
        ScenarioConfig {
            scenario_id: "optimistic".to_string(),
            entry_slippage_pct: 0.001,
            exit_slippage_pct: 0.001,
            signal_to_fill_ms: 250,
            fixed_entry_cost_sol: 0.0002,
            fixed_exit_cost_sol: 0.0002,
            mev_cost_sol: 0.0,
            spike_threshold: SpikeThresholdConfig::default(),
        }
    }

    pub fn realistic() -> Self {
        ScenarioConfig {
            scenario_id: "realistic".to_string(),
            entry_slippage_pct: 0.005,
            exit_slippage_pct: 0.005,
            signal_to_fill_ms: 500,
            fixed_entry_cost_sol: 0.0005,
            fixed_exit_cost_sol: 0.0005,
            mev_cost_sol: 0.0003,
            spike_threshold: SpikeThresholdConfig::default(),
        }
    }

    pub fn pessimistic() -> Self {
        ScenarioConfig {
            scenario_id: "pessimistic".to_string(),
            entry_slippage_pct: 0.02,
            exit_slippage_pct: 0.02,
            signal_to_fill_ms: 1500,
            fixed_entry_cost_sol: 0.001,
            fixed_exit_cost_sol: 0.001,
            mev_cost_sol: 0.001,
            spike_threshold: SpikeThresholdConfig::default(),
        }
    }

    pub fn degraded() -> Self {
        ScenarioConfig {
            scenario_id: "degraded".to_string(),
            entry_slippage_pct: 0.05,
            exit_slippage_pct: 0.05,
            signal_to_fill_ms: 3000,
            fixed_entry_cost_sol: 0.002,
            fixed_exit_cost_sol: 0.002,
            mev_cost_sol: 0.003,
            spike_threshold: SpikeThresholdConfig::default(),
        }
    }

    pub fn all_presets() -> [ScenarioConfig; 4] {
        [
            ScenarioConfig::optimistic(),
            ScenarioConfig::realistic(),
            ScenarioConfig::pessimistic(),
            ScenarioConfig::degraded(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonpositive_hold_duration() {
        let cfg = StrategyConfig::TimeExit { hold_duration_ms: 0 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn presets_carry_distinct_scenario_ids() {
        let ids: Vec<String> = ScenarioConfig::all_presets().iter().map(|s| s.scenario_id.clone()).collect();
        assert_eq!(ids, vec!["optimistic", "realistic", "pessimistic", "degraded"].iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn default_spike_threshold_matches_resolved_open_question() {
        let cfg = SpikeThresholdConfig::default();
        assert_eq!(cfg.k, 3.0);
        assert_eq!(cfg.n, 10);
    }
}
