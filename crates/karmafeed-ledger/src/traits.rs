use chrono::{DateTime, Utc};
use karmafeed_types::{KarmaTransaction, UserId};

use crate::error::LedgerError;

/// Read boundary for karma ledger queries.
///
/// Entries come back in append order. Backends may override the filtered
/// reads with indexed lookups.
pub trait LedgerReader: Send + Sync {
    fn read_all(&self) -> Result<Vec<KarmaTransaction>, LedgerError>;

    /// Entries with `created_at >= cutoff`.
    fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<KarmaTransaction>, LedgerError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|t| t.created_at >= cutoff)
            .collect())
    }

    /// Entries crediting `user`.
    fn read_for_user(&self, user: UserId) -> Result<Vec<KarmaTransaction>, LedgerError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|t| t.user_id == user)
            .collect())
    }

    fn entry_count(&self) -> Result<u64, LedgerError>;
}
