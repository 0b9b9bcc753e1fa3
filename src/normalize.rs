//! Raw swap/liquidity event normalization into aligned per-candidate time series.
//!
//! Pure function of its input: reprocessing the same events produces identical output. Bucket
//! accumulation uses `BTreeMap` keyed by bucket start rather than `HashMap`, so emission order
//! is already deterministic without a trailing sort.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    CandidateId, LiquidityEventType, LiquidityPoint, PricePoint, RawLiquidityEvent, RawSwap,
    Side, VolumePoint, VOLUME_INTERVALS_SECS,
};
use crate::error::Result;
use crate::time::Millis;

/// Per-batch defect counters, returned alongside the written series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub swaps_in: usize,
    pub liquidity_events_in: usize,
    pub price_points_out: usize,
    pub liquidity_points_out: usize,
    pub volume_points_out: usize,
}

/// The three series produced by normalizing one candidate's raw events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSeries {
    pub price_points: Vec<PricePoint>,
    pub liquidity_points: Vec<LiquidityPoint>,
    pub volume_points: Vec<VolumePoint>,
    pub stats: NormalizationStats,
}

/// Build the price, liquidity, and volume series for one candidate from its raw event
/// sequences. `swaps` and `liquidity_events` need not be pre-sorted; they are sorted here by
/// `(timestamp, slot, event_index)` before bucketing.
pub fn normalize_candidate(
    candidate_id: &CandidateId,
    swaps: &[RawSwap],
    liquidity_events: &[RawLiquidityEvent],
) -> Result<NormalizedSeries> {
    let mut stats = NormalizationStats {
        swaps_in: swaps.len(),
        liquidity_events_in: liquidity_events.len(),
        ..Default::default()
    };

    let mut swaps_sorted: Vec<&RawSwap> = swaps.iter().collect();
    swaps_sorted.sort_by_key(|s| (s.timestamp, s.slot, s.event_index));

    let mut liquidity_sorted: Vec<&RawLiquidityEvent> = liquidity_events.iter().collect();
    liquidity_sorted.sort_by_key(|e| (e.timestamp, e.slot, e.event_index));

    let price_points = build_price_series(candidate_id, &swaps_sorted);
    let liquidity_points = build_liquidity_series(candidate_id, &liquidity_sorted);
    let volume_points = build_volume_series(candidate_id, &swaps_sorted);

    stats.price_points_out = price_points.len();
    stats.liquidity_points_out = liquidity_points.len();
    stats.volume_points_out = volume_points.len();

    debug!(
        candidate_id = %candidate_id,
        price_points = stats.price_points_out,
        liquidity_points = stats.liquidity_points_out,
        volume_points = stats.volume_points_out,
        "normalized candidate event streams"
    );

    Ok(NormalizedSeries {
        price_points,
        liquidity_points,
        volume_points,
        stats,
    })
}

fn build_price_series(candidate_id: &CandidateId, swaps: &[&RawSwap]) -> Vec<PricePoint> {
    // Group consecutive-by-timestamp swaps (input is already time-sorted).
    let mut grouped: BTreeMap<Millis, Vec<&RawSwap>> = BTreeMap::new();
    for s in swaps {
        grouped.entry(s.timestamp).or_default().push(s);
    }

    grouped
        .into_iter()
        .map(|(timestamp_ms, mut group)| {
            // Last swap by (slot, tx_signature, event_index) decides price and slot.
            group.sort_by_key(|s| (s.slot, s.tx_signature.clone(), s.event_index));
            let last = group.last().expect("group is non-empty by construction");
            let volume: f64 = group
                .iter()
                .map(|s| match s.side {
                    Side::Buy => s.amount_in,
                    Side::Sell => s.amount_out,
                })
                .sum();
            PricePoint {
                candidate_id: candidate_id.clone(),
                timestamp_ms,
                slot: last.slot,
                price: last.price,
                volume,
                swap_count: group.len() as u32,
            }
        })
        .collect()
}

fn build_liquidity_series(
    candidate_id: &CandidateId,
    events: &[&RawLiquidityEvent],
) -> Vec<LiquidityPoint> {
    let mut liquidity_token = 0.0f64;
    let mut liquidity_quote = 0.0f64;
    let mut out = Vec::with_capacity(events.len());

    for e in events {
        match e.event_type {
            LiquidityEventType::Add => {
                liquidity_token += e.amount_token;
                liquidity_quote += e.amount_quote;
            }
            LiquidityEventType::Remove => {
                liquidity_token -= e.amount_token;
                liquidity_quote -= e.amount_quote;
            }
        }
        out.push(LiquidityPoint {
            candidate_id: candidate_id.clone(),
            timestamp_ms: e.timestamp,
            slot: e.slot,
            liquidity: e.liquidity_after,
            liquidity_token,
            liquidity_quote,
        });
    }
    out
}

#[derive(Default, Clone, Copy)]
struct VolumeBucketAccum {
    volume: f64,
    swap_count: u32,
    buy_volume: f64,
    sell_volume: f64,
}

fn build_volume_series(candidate_id: &CandidateId, swaps: &[&RawSwap]) -> Vec<VolumePoint> {
    let mut out = Vec::new();
    for &interval_seconds in &VOLUME_INTERVALS_SECS {
        let width_ms = interval_seconds * 1000;
        let mut buckets: BTreeMap<Millis, VolumeBucketAccum> = BTreeMap::new();
        for s in swaps {
            let bucket_start = (s.timestamp / width_ms) * width_ms;
            let quote_volume = match s.side {
                Side::Buy => s.amount_in,
                Side::Sell => s.amount_out,
            };
            let entry = buckets.entry(bucket_start).or_default();
            entry.volume += quote_volume;
            entry.swap_count += 1;
            match s.side {
                Side::Buy => entry.buy_volume += quote_volume,
                Side::Sell => entry.sell_volume += quote_volume,
            }
        }
        for (timestamp_ms, accum) in buckets {
            out.push(VolumePoint {
                candidate_id: candidate_id.clone(),
                timestamp_ms,
                interval_seconds,
                volume: accum.volume,
                swap_count: accum.swap_count,
                buy_volume: accum.buy_volume,
                sell_volume: accum.sell_volume,
            });
        }
    }
    out
}
