use serde::{Deserialize, Serialize};

use super::candidate::CandidateId;
use crate::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LiquidityEventType {
    Add,
    Remove,
}

/// Raw swap event as it arrives from the venue, keyed `(candidate_id, tx_signature, event_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSwap {
    pub candidate_id: CandidateId,
    pub tx_signature: String,
    pub event_index: u32,
    pub slot: u64,
    pub timestamp: Millis,
    pub side: Side,
    pub amount_in: f64,
    pub amount_out: f64,
    /// Quote per base.
    pub price: f64,
}

/// Raw liquidity-add/remove event, keyed `(candidate_id, tx_signature, event_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLiquidityEvent {
    pub candidate_id: CandidateId,
    pub tx_signature: String,
    pub event_index: u32,
    pub slot: u64,
    pub timestamp: Millis,
    pub event_type: LiquidityEventType,
    pub amount_token: f64,
    pub amount_quote: f64,
    pub liquidity_after: f64,
}
