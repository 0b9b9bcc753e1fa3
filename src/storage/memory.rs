//! Reference in-memory storage backend.
//!
//! One `parking_lot::RwLock<BTreeMap<...>>` per entity kind, following the lock-per-store
//! discipline used throughout the wider corpus. `BTreeMap` keys are chosen so that iteration
//! order already matches the tabular primary-key order described in the storage contract,
//! structurally avoiding the `HashMap`-iteration nondeterminism the contract forbids.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use super::{duplicate, CandidateStore, LiquiditySeriesStore, PriceSeriesStore, RawLiquidityStore,
    RawSwapStore, StrategyAggregateStore, TradeRecordStore, VolumeSeriesStore};
use crate::domain::{
    Candidate, CandidateId, EntryEventType, LiquidityPoint, MissingCandidate, PricePoint,
    RawLiquidityEvent, RawSwap, StrategyAggregate, TradeRecord, VolumePoint,
};
use crate::error::{EngineError, Result};
use crate::time::Millis;

/// A single in-memory backend implementing every storage trait in this module.
#[derive(Default)]
pub struct InMemoryStore {
    candidates: RwLock<BTreeMap<CandidateId, Candidate>>,
    swaps: RwLock<BTreeMap<(CandidateId, String, u32), RawSwap>>,
    liquidity_events: RwLock<BTreeMap<(CandidateId, String, u32), RawLiquidityEvent>>,
    price_points: RwLock<BTreeMap<(CandidateId, Millis), PricePoint>>,
    liquidity_points: RwLock<BTreeMap<(CandidateId, Millis), LiquidityPoint>>,
    volume_points: RwLock<BTreeMap<(CandidateId, i64, Millis), VolumePoint>>,
    trades: RwLock<BTreeMap<String, TradeRecord>>,
    aggregates: RwLock<BTreeMap<(String, String, EntryEventType), StrategyAggregate>>,
    missing: RwLock<Vec<MissingCandidate>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CandidateStore for InMemoryStore {
    fn insert(&self, candidate: Candidate) -> Result<()> {
        let mut map = self.candidates.write();
        if map.contains_key(&candidate.candidate_id) {
            return Err(duplicate(&candidate.candidate_id));
        }
        map.insert(candidate.candidate_id.clone(), candidate);
        Ok(())
    }

    fn get_by_id(&self, id: &CandidateId) -> Result<Option<Candidate>> {
        Ok(self.candidates.read().get(id).cloned())
    }

    fn get_all(&self) -> Result<Vec<Candidate>> {
        Ok(self.candidates.read().values().cloned().collect())
    }
}

impl RawSwapStore for InMemoryStore {
    fn insert_bulk(&self, swaps: Vec<RawSwap>) -> Result<()> {
        let mut map = self.swaps.write();
        let mut seen = std::collections::HashSet::new();
        for s in &swaps {
            let key = (s.candidate_id.clone(), s.tx_signature.clone(), s.event_index);
            if map.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(duplicate(format!(
                    "{}/{}/{}",
                    key.0, key.1, key.2
                )));
            }
        }
        for s in swaps {
            let key = (s.candidate_id.clone(), s.tx_signature.clone(), s.event_index);
            map.insert(key, s);
        }
        debug!(count = map.len(), "raw swap store updated");
        Ok(())
    }

    fn get_by_candidate_range(
        &self,
        id: &CandidateId,
        start: Millis,
        end: Millis,
    ) -> Result<Vec<RawSwap>> {
        let mut out: Vec<RawSwap> = self
            .swaps
            .read()
            .values()
            .filter(|s| &s.candidate_id == id && s.timestamp >= start && s.timestamp < end)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.timestamp, s.slot, s.event_index));
        Ok(out)
    }

    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<RawSwap>> {
        let mut out: Vec<RawSwap> = self
            .swaps
            .read()
            .values()
            .filter(|s| &s.candidate_id == id)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.timestamp, s.slot, s.event_index));
        Ok(out)
    }
}

impl RawLiquidityStore for InMemoryStore {
    fn insert_bulk(&self, events: Vec<RawLiquidityEvent>) -> Result<()> {
        let mut map = self.liquidity_events.write();
        let mut seen = std::collections::HashSet::new();
        for e in &events {
            let key = (e.candidate_id.clone(), e.tx_signature.clone(), e.event_index);
            if map.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(duplicate(format!("{}/{}/{}", key.0, key.1, key.2)));
            }
        }
        for e in events {
            let key = (e.candidate_id.clone(), e.tx_signature.clone(), e.event_index);
            map.insert(key, e);
        }
        Ok(())
    }

    fn get_by_candidate_range(
        &self,
        id: &CandidateId,
        start: Millis,
        end: Millis,
    ) -> Result<Vec<RawLiquidityEvent>> {
        let mut out: Vec<RawLiquidityEvent> = self
            .liquidity_events
            .read()
            .values()
            .filter(|e| &e.candidate_id == id && e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect();
        out.sort_by_key(|e| (e.timestamp, e.slot, e.event_index));
        Ok(out)
    }

    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<RawLiquidityEvent>> {
        let mut out: Vec<RawLiquidityEvent> = self
            .liquidity_events
            .read()
            .values()
            .filter(|e| &e.candidate_id == id)
            .cloned()
            .collect();
        out.sort_by_key(|e| (e.timestamp, e.slot, e.event_index));
        Ok(out)
    }
}

impl PriceSeriesStore for InMemoryStore {
    fn insert_bulk(&self, points: Vec<PricePoint>) -> Result<()> {
        let mut map = self.price_points.write();
        let mut seen = std::collections::HashSet::new();
        for p in &points {
            let key = (p.candidate_id.clone(), p.timestamp_ms);
            if map.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(duplicate(format!("{}/{}", key.0, key.1)));
            }
        }
        for p in points {
            let key = (p.candidate_id.clone(), p.timestamp_ms);
            map.insert(key, p);
        }
        Ok(())
    }

    fn get_by_time_range(&self, id: &CandidateId, start: Millis, end: Millis) -> Result<Vec<PricePoint>> {
        Ok(self
            .price_points
            .read()
            .range((id.clone(), start)..=(id.clone(), end))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<PricePoint>> {
        Ok(self
            .price_points
            .read()
            .range((id.clone(), Millis::MIN)..=(id.clone(), Millis::MAX))
            .map(|(_, v)| v.clone())
            .collect())
    }
}

impl LiquiditySeriesStore for InMemoryStore {
    fn insert_bulk(&self, points: Vec<LiquidityPoint>) -> Result<()> {
        let mut map = self.liquidity_points.write();
        let mut seen = std::collections::HashSet::new();
        for p in &points {
            let key = (p.candidate_id.clone(), p.timestamp_ms);
            if map.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(duplicate(format!("{}/{}", key.0, key.1)));
            }
        }
        for p in points {
            let key = (p.candidate_id.clone(), p.timestamp_ms);
            map.insert(key, p);
        }
        Ok(())
    }

    fn get_by_time_range(&self, id: &CandidateId, start: Millis, end: Millis) -> Result<Vec<LiquidityPoint>> {
        Ok(self
            .liquidity_points
            .read()
            .range((id.clone(), start)..=(id.clone(), end))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn get_by_candidate_id(&self, id: &CandidateId) -> Result<Vec<LiquidityPoint>> {
        Ok(self
            .liquidity_points
            .read()
            .range((id.clone(), Millis::MIN)..=(id.clone(), Millis::MAX))
            .map(|(_, v)| v.clone())
            .collect())
    }
}

impl VolumeSeriesStore for InMemoryStore {
    fn insert_bulk(&self, points: Vec<VolumePoint>) -> Result<()> {
        let mut map = self.volume_points.write();
        let mut seen = std::collections::HashSet::new();
        for p in &points {
            let key = (p.candidate_id.clone(), p.interval_seconds, p.timestamp_ms);
            if map.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(duplicate(format!("{}/{}/{}", key.0, key.1, key.2)));
            }
        }
        for p in points {
            let key = (p.candidate_id.clone(), p.interval_seconds, p.timestamp_ms);
            map.insert(key, p);
        }
        Ok(())
    }

    fn get_by_candidate_id(&self, id: &CandidateId, interval_seconds: i64) -> Result<Vec<VolumePoint>> {
        Ok(self
            .volume_points
            .read()
            .range((id.clone(), interval_seconds, Millis::MIN)..=(id.clone(), interval_seconds, Millis::MAX))
            .map(|(_, v)| v.clone())
            .collect())
    }
}

impl TradeRecordStore for InMemoryStore {
    fn insert(&self, record: TradeRecord) -> Result<()> {
        let mut map = self.trades.write();
        if map.contains_key(&record.trade_id) {
            return Err(duplicate(&record.trade_id));
        }
        map.insert(record.trade_id.clone(), record);
        Ok(())
    }

    fn get_by_id(&self, trade_id: &str) -> Result<Option<TradeRecord>> {
        Ok(self.trades.read().get(trade_id).cloned())
    }

    fn get_all(&self) -> Result<Vec<TradeRecord>> {
        let mut out: Vec<TradeRecord> = self.trades.read().values().cloned().collect();
        out.sort_by(|a, b| {
            (&a.candidate_id, &a.strategy_id, &a.scenario_id, a.entry_event_type as u8).cmp(&(
                &b.candidate_id,
                &b.strategy_id,
                &b.scenario_id,
                b.entry_event_type as u8,
            ))
        });
        Ok(out)
    }
}

impl StrategyAggregateStore for InMemoryStore {
    fn insert(&self, aggregate: StrategyAggregate) -> Result<()> {
        let mut map = self.aggregates.write();
        let key = (
            aggregate.strategy_id.clone(),
            aggregate.scenario_id.clone(),
            aggregate.entry_event_type,
        );
        if map.contains_key(&key) {
            return Err(EngineError::DuplicateKey(format!(
                "{}/{}/{:?}",
                key.0, key.1, key.2
            )));
        }
        map.insert(key, aggregate);
        Ok(())
    }

    fn get_by_key(
        &self,
        strategy_id: &str,
        scenario_id: &str,
        entry_event_type: EntryEventType,
    ) -> Result<Option<StrategyAggregate>> {
        Ok(self
            .aggregates
            .read()
            .get(&(strategy_id.to_string(), scenario_id.to_string(), entry_event_type))
            .cloned())
    }

    fn get_all(&self) -> Result<Vec<StrategyAggregate>> {
        Ok(self.aggregates.read().values().cloned().collect())
    }

    fn insert_missing(&self, missing: MissingCandidate) -> Result<()> {
        self.missing.write().push(missing);
        Ok(())
    }

    fn get_missing(&self) -> Result<Vec<MissingCandidate>> {
        let mut out = self.missing.read().clone();
        out.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id).then(a.strategy_id.cmp(&b.strategy_id)));
        Ok(out)
    }
}
