use karmafeed_types::TransactionId;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("integrity violation at {id}: {reason}")]
    IntegrityViolation { id: TransactionId, reason: String },

    #[error("invalid leaderboard window: {secs} seconds")]
    InvalidWindow { secs: u64 },

    #[error("transaction ids exhausted after {last}")]
    IdsExhausted { last: TransactionId },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
