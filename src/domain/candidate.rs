use serde::{Deserialize, Serialize};

use crate::time::Millis;

/// Opaque candidate identifier. Newtype-wrapped so store keys can't be confused with a
/// `mint` or `tx_signature` string at the call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        CandidateId(s.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(s: String) -> Self {
        CandidateId(s)
    }
}

/// Partitions which entry-signal rule applies to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateSource {
    NewToken,
    ActiveToken,
}

/// A token instance observed in the market with its own event stream. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: CandidateId,
    pub mint: String,
    pub source: CandidateSource,
    pub discovered_at: Millis,
    pub pool: Option<String>,
    pub tx_signature: Option<String>,
    pub slot: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_id_orders_lexicographically() {
        let mut ids = vec![CandidateId::from("c3"), CandidateId::from("c1"), CandidateId::from("c2")];
        ids.sort();
        assert_eq!(ids, vec!["c1".into(), "c2".into(), "c3".into()]);
    }
}
