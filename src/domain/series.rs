use serde::{Deserialize, Serialize};

use super::candidate::CandidateId;
use crate::time::Millis;

/// Supported volume-bucket widths, in seconds.
pub const VOLUME_INTERVALS_SECS: [i64; 3] = [60, 300, 3600];

/// One price observation for a candidate, keyed `(candidate_id, timestamp_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub candidate_id: CandidateId,
    pub timestamp_ms: Millis,
    pub slot: u64,
    pub price: f64,
    /// Sum of quote-denominated swap volume in the window ending at this timestamp.
    pub volume: f64,
    pub swap_count: u32,
}

/// One liquidity observation for a candidate, keyed `(candidate_id, timestamp_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPoint {
    pub candidate_id: CandidateId,
    pub timestamp_ms: Millis,
    pub slot: u64,
    pub liquidity: f64,
    pub liquidity_token: f64,
    pub liquidity_quote: f64,
}

/// One bucketed volume observation, keyed `(candidate_id, timestamp_ms, interval_seconds)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub candidate_id: CandidateId,
    pub timestamp_ms: Millis,
    pub interval_seconds: i64,
    pub volume: f64,
    pub swap_count: u32,
    pub buy_volume: f64,
    pub sell_volume: f64,
}
