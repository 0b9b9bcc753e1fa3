//! Crate-wide error taxonomy.
//!
//! Each subsystem raises one of these closed variants; the orchestrator and storage layer
//! compose them under `anyhow::Result` at their outer call sites the way the rest of the
//! corpus layers `anyhow::Context` over precise leaf errors.

use thiserror::Error;

/// Errors surfaced across normalization, storage, the strategy engine, and orchestration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Caller contract violation: empty identifier, missing strategy parameter, half-specified
    /// replay range, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Append-only violation. The whole batch is rolled back; the store is untouched.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Addressable entity absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Simulation could not establish an entry point (ACTIVE_TOKEN spike never fired, or
    /// NEW_TOKEN had nothing at or after `discovered_at`).
    #[error("no entry signal for candidate {candidate_id}")]
    NoEntrySignal { candidate_id: String },

    /// The candidate's price series was empty.
    #[error("no price data for candidate {candidate_id}")]
    NoPriceData { candidate_id: String },

    /// A strategy config was missing a required parameter for its variant at runtime
    /// (deserialized input rather than a statically constructed enum).
    #[error("invalid strategy config: {0}")]
    InvalidStrategyConfig(String),

    /// Cancellation was requested; nothing from the in-flight operation is persisted.
    #[error("cancellation requested")]
    CancellationRequested,

    /// An upstream storage failure, wrapped. The orchestrator retries these with backoff
    /// before recording a per-candidate failure.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl EngineError {
    pub fn is_storage(&self) -> bool {
        matches!(self, EngineError::StorageError(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_is_recognized_for_retry() {
        let err = EngineError::StorageError("disk full".into());
        assert!(err.is_storage());
        assert!(!EngineError::NotFound("x".into()).is_storage());
    }

    #[test]
    fn display_formats_are_human_readable() {
        let err = EngineError::NoEntrySignal {
            candidate_id: "c1".into(),
        };
        assert_eq!(err.to_string(), "no entry signal for candidate c1");
    }
}
