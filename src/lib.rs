//! Offline DEX-token backtesting engine.
//!
//! Pipeline: raw on-chain events are normalized into ordered price/liquidity/volume series
//! ([`normalize`]), replayed deterministically against a strategy and a market-friction
//! scenario ([`replay`], [`strategy`]), rolled up into aggregates ([`aggregator`]), and gated
//! for trustworthiness before being called implementable ([`sufficiency`]). [`orchestrator`]
//! is the sole place this crate introduces concurrency, fanning the candidate set out across
//! a bounded worker pool and persisting results through the [`storage`] contract.

pub mod aggregator;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod replay;
pub mod storage;
pub mod strategy;
pub mod sufficiency;
pub mod time;

pub use domain::*;
pub use error::{EngineError, Result};
pub use normalize::{normalize_candidate, NormalizedSeries, NormalizationStats};
pub use orchestrator::{run as run_orchestrator, OrchestratorDeps, RunSummary};
pub use replay::{merge_series, replay as replay_events, CancellationToken, ReplayEvent, ReplayRange};
pub use strategy::{simulate, EngineInput, ScenarioConfig, SpikeThresholdConfig, StrategyConfig};
pub use sufficiency::{DisqualifyingReason, SufficiencyVerdict};
