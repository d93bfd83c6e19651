use chrono::{DateTime, Utc};
use karmafeed_types::{KarmaTransaction, NewKarmaTransaction, TransactionId};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Insert-only journal of karma transactions, in append order.
///
/// There is no update or delete. The only way entries leave the journal is
/// [`KarmaLedger::rollback_to`], which a store uses to abort a unit of work
/// that has not been committed yet.
#[derive(Clone, Debug, Default)]
pub struct KarmaLedger {
    entries: Vec<KarmaTransaction>,
}

/// Position in the journal taken at the start of a unit of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerMark(usize);

impl KarmaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry stamped at `at` and return it with its id.
    pub fn append(
        &mut self,
        entry: NewKarmaTransaction,
        at: DateTime<Utc>,
    ) -> Result<KarmaTransaction, LedgerError> {
        let id = self.next_id()?;
        let transaction = KarmaTransaction {
            id,
            user_id: entry.user_id,
            karma: entry.karma,
            source_type: entry.source_type,
            source_id: entry.source_id,
            created_at: at,
        };
        tracing::debug!(
            id = %transaction.id,
            user = %transaction.user_id,
            karma = transaction.karma,
            source = %transaction.source_type,
            "karma transaction appended"
        );
        self.entries.push(transaction.clone());
        Ok(transaction)
    }

    /// Re-insert an entry that already has an id and timestamp (snapshot
    /// restore). The id must be greater than every id already present.
    pub fn restore(&mut self, transaction: KarmaTransaction) -> Result<(), LedgerError> {
        if let Some(last) = self.entries.last() {
            if transaction.id <= last.id {
                return Err(LedgerError::IntegrityViolation {
                    id: transaction.id,
                    reason: format!("restored out of order; last id is {}", last.id),
                });
            }
        }
        self.entries.push(transaction);
        Ok(())
    }

    pub fn mark(&self) -> LedgerMark {
        LedgerMark(self.entries.len())
    }

    /// Drop entries appended after `mark`. Only valid while the unit of work
    /// that took the mark still holds exclusive access.
    pub fn rollback_to(&mut self, mark: LedgerMark) {
        if mark.0 < self.entries.len() {
            tracing::debug!(
                discarded = self.entries.len() - mark.0,
                "rolling back uncommitted karma transactions"
            );
            self.entries.truncate(mark.0);
        }
    }

    pub fn entries(&self) -> &[KarmaTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_id(&self) -> Option<TransactionId> {
        self.entries.last().map(|t| t.id)
    }

    fn next_id(&self) -> Result<TransactionId, LedgerError> {
        match self.last_id() {
            None => Ok(TransactionId::new(1)),
            Some(last) => last.next().ok_or(LedgerError::IdsExhausted { last }),
        }
    }
}

impl LedgerReader for KarmaLedger {
    fn read_all(&self) -> Result<Vec<KarmaTransaction>, LedgerError> {
        Ok(self.entries.clone())
    }

    fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<KarmaTransaction>, LedgerError> {
        Ok(self
            .entries
            .iter()
            .filter(|t| t.created_at >= cutoff)
            .cloned()
            .collect())
    }

    fn entry_count(&self) -> Result<u64, LedgerError> {
        Ok(self.entries.len() as u64)
    }
}
