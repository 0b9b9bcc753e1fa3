//! Storage contract: append-only, deduplicated, ordered access to every entity kind.
//!
//! Each trait depends only on the capability set {insert, insert_bulk, query-by-key,
//! query-by-time-range}; this crate ships a single in-memory implementation backing all of
//! them, but a row-oriented or column-oriented backend can implement the same traits without
//! touching a caller.

mod memory;

pub use memory::InMemoryStore;

use crate::domain::{
    Candidate, CandidateId, EntryEventType, LiquidityPoint, MissingCandidate, PricePoint,
    RawLiquidityEvent, RawSwap, StrategyAggregate, TradeRecord, VolumePoint,
};
use crate::error::{EngineError, Result};
use crate::time::Millis;

pub trait CandidateStore: Send + Sync {
    fn insert(&self, candidate: Candidate) -> Result<()>;
    fn get_by_id(&self, id: &CandidateId) -> Result<Option<Candidate>>;
    /// All candidates, ordered by ascending `candidate_id`.
    fn get_all(&self) -> Result<Vec<Candidate>>;
}

pub trait RawSwapStore: Send + Sync {
    fn insert_bulk(&self, swaps: Vec<RawSwap>) -> Result<()>;
    /// Half-open `[start, end)` range, ordered by `(timestamp, slot, event_index)`.
    fn get_by_candidate_range(
        &self,
        id: &CandidateId,
        start: Millis,
        end: Millis,
    ) -> Result<Vec<RawSwap>>;
    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<RawSwap>>;
}

pub trait RawLiquidityStore: Send + Sync {
    fn insert_bulk(&self, events: Vec<RawLiquidityEvent>) -> Result<()>;
    fn get_by_candidate_range(
        &self,
        id: &CandidateId,
        start: Millis,
        end: Millis,
    ) -> Result<Vec<RawLiquidityEvent>>;
    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<RawLiquidityEvent>>;
}

pub trait PriceSeriesStore: Send + Sync {
    fn insert_bulk(&self, points: Vec<PricePoint>) -> Result<()>;
    /// Inclusive `[start, end]` range, ordered by ascending `timestamp_ms`.
    fn get_by_time_range(&self, id: &CandidateId, start: Millis, end: Millis) -> Result<Vec<PricePoint>>;
    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<PricePoint>>;
}

pub trait LiquiditySeriesStore: Send + Sync {
    fn insert_bulk(&self, points: Vec<LiquidityPoint>) -> Result<()>;
    fn get_by_time_range(&self, id: &CandidateId, start: Millis, end: Millis) -> Result<Vec<LiquidityPoint>>;
    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<LiquidityPoint>>;
}

pub trait VolumeSeriesStore: Send + Sync {
    fn insert_bulk(&self, points: Vec<VolumePoint>) -> Result<()>;
    fn get_by_candidate_id(&self, id: &CandidateId, interval_seconds: i64) -> Result<Vec<VolumePoint>>;
}

pub trait TradeRecordStore: Send + Sync {
    fn insert(&self, record: TradeRecord) -> Result<()>;
    fn get_by_id(&self, trade_id: &str) -> Result<Option<TradeRecord>>;
    /// Every stored trade record, ordered by `(candidate_id, strategy_id, scenario_id,
    /// entry_event_type)`.
    fn get_all(&self) -> Result<Vec<TradeRecord>>;
}

pub trait StrategyAggregateStore: Send + Sync {
    fn insert(&self, aggregate: StrategyAggregate) -> Result<()>;
    fn get_by_key(
        &self,
        strategy_id: &str,
        scenario_id: &str,
        entry_event_type: EntryEventType,
    ) -> Result<Option<StrategyAggregate>>;
    fn get_all(&self) -> Result<Vec<StrategyAggregate>>;
    fn insert_missing(&self, missing: MissingCandidate) -> Result<()>;
    fn get_missing(&self) -> Result<Vec<MissingCandidate>>;
}

pub(crate) fn duplicate(key: impl std::fmt::Display) -> EngineError {
    EngineError::DuplicateKey(key.to_string())
}
