//! Deterministic replay of a candidate's price and liquidity series.
//!
//! Drives an engine callback over the merged series in strict time order; checks a
//! cancellation token between events so the orchestrator can stop a long replay without
//! tearing down the whole run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{LiquidityPoint, PricePoint};
use crate::error::{EngineError, Result};
use crate::time::Millis;

/// Shared cancellation flag, checked at every suspension point: before storage calls, between
/// events in the replay runner, and between candidates in the orchestrator.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::CancellationRequested)
        } else {
            Ok(())
        }
    }
}

/// One merged replay event: either a price or a liquidity observation, tagged so ties at the
/// same timestamp resolve with swap/price ordering before liquidity.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    Price(PricePoint),
    Liquidity(LiquidityPoint),
}

impl ReplayEvent {
    pub fn timestamp_ms(&self) -> Millis {
        match self {
            ReplayEvent::Price(p) => p.timestamp_ms,
            ReplayEvent::Liquidity(l) => l.timestamp_ms,
        }
    }

    /// Price sorts before liquidity at an identical timestamp — the stable event-source tag
    /// from the spec's replay ordering (swap < liquidity).
    fn source_rank(&self) -> u8 {
        match self {
            ReplayEvent::Price(_) => 0,
            ReplayEvent::Liquidity(_) => 1,
        }
    }
}

/// Merge a candidate's price and liquidity points into one strictly ordered replay sequence:
/// primary timestamp, secondary source tag (price before liquidity).
pub fn merge_series(prices: &[PricePoint], liquidity: &[LiquidityPoint]) -> Vec<ReplayEvent> {
    let mut events: Vec<ReplayEvent> = prices
        .iter()
        .cloned()
        .map(ReplayEvent::Price)
        .chain(liquidity.iter().cloned().map(ReplayEvent::Liquidity))
        .collect();
    events.sort_by_key(|e| (e.timestamp_ms(), e.source_rank()));
    events
}

/// Optional `[from, to]` bound for a ranged replay. Both bounds are required together; a
/// half-specified range is rejected as `InvalidInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRange {
    pub from: Millis,
    pub to: Millis,
}

/// Drive `on_event` over the merged replay sequence, optionally bounded to `range`, checking
/// `token` between events.
pub fn replay<F>(
    prices: &[PricePoint],
    liquidity: &[LiquidityPoint],
    range: Option<ReplayRange>,
    token: &CancellationToken,
    mut on_event: F,
) -> Result<()>
where
    F: FnMut(&ReplayEvent),
{
    let merged = merge_series(prices, liquidity);
    for event in &merged {
        if let Some(r) = range {
            if event.timestamp_ms() < r.from || event.timestamp_ms() > r.to {
                continue;
            }
        }
        token.check()?;
        on_event(event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(t: Millis) -> PricePoint {
        PricePoint {
            candidate_id: "c1".into(),
            timestamp_ms: t,
            slot: 1,
            price: 1.0,
            volume: 0.0,
            swap_count: 1,
        }
    }

    fn liquidity(t: Millis) -> LiquidityPoint {
        LiquidityPoint {
            candidate_id: "c1".into(),
            timestamp_ms: t,
            slot: 1,
            liquidity: 1.0,
            liquidity_token: 1.0,
            liquidity_quote: 1.0,
        }
    }

    #[test]
    fn merges_in_time_order_with_price_before_liquidity_on_ties() {
        let prices = vec![price(1000), price(3000)];
        let liquidity_pts = vec![liquidity(1000), liquidity(2000)];
        let merged = merge_series(&prices, &liquidity_pts);
        let timestamps: Vec<Millis> = merged.iter().map(|e| e.timestamp_ms()).collect();
        assert_eq!(timestamps, vec![1000, 1000, 2000, 3000]);
        assert!(matches!(merged[0], ReplayEvent::Price(_)));
        assert!(matches!(merged[1], ReplayEvent::Liquidity(_)));
    }

    #[test]
    fn cancellation_stops_iteration_between_events() {
        let prices = vec![price(1000), price(2000), price(3000)];
        let token = CancellationToken::new();
        let mut seen = 0;
        let result = replay(&prices, &[], None, &token, |_| {
            seen += 1;
            if seen == 1 {
                token.cancel();
            }
        });
        assert!(matches!(result, Err(EngineError::CancellationRequested)));
        assert_eq!(seen, 1);
    }

    #[test]
    fn ranged_replay_filters_to_bounds() {
        let prices = vec![price(1000), price(2000), price(3000)];
        let token = CancellationToken::new();
        let mut seen = Vec::new();
        replay(
            &prices,
            &[],
            Some(ReplayRange { from: 1500, to: 2500 }),
            &token,
            |e| seen.push(e.timestamp_ms()),
        )
        .unwrap();
        assert_eq!(seen, vec![2000]);
    }
}
