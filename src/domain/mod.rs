//! Core data model: candidates, raw events, derived series, trade records, and aggregates.

pub mod aggregate;
pub mod candidate;
pub mod raw_events;
pub mod series;
pub mod trade;

pub use aggregate::{MissingCandidate, MissingReason, OutcomeStats, SensitivityOutcomes, StrategyAggregate};
pub use candidate::{Candidate, CandidateId, CandidateSource};
pub use raw_events::{LiquidityEventType, RawLiquidityEvent, RawSwap, Side};
pub use series::{LiquidityPoint, PricePoint, VolumePoint, VOLUME_INTERVALS_SECS};
pub use trade::{trade_id, CostBreakdown, EntryEventType, ExitReason, OutcomeClass, TradeRecord, EPSILON};
