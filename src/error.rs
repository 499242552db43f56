//! Crate error type. Every variant is recoverable; the engine never panics
//! over bad input or a misbehaving store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactError {
    /// Empty or missing fact identifier.
    #[error("empty fact identifier")]
    EmptyId,

    /// A batch operation received no items.
    #[error("empty fact batch")]
    EmptyBatch,

    /// `record_answer` referenced a fact that was never created.
    #[error("unknown fact '{0}'")]
    UnknownFact(String),

    /// A fact identifier outside the active curriculum-level namespace.
    #[error("fact '{id}' does not belong to curriculum level '{level_code}'")]
    NamespaceMismatch { id: String, level_code: String },

    #[error("sqlite store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Both tiers of a tiered store rejected the operation.
    #[error("all store tiers failed: {0}")]
    AllTiersFailed(String),
}

pub type Result<T> = std::result::Result<T, FactError>;
