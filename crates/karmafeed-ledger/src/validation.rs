use karmafeed_types::TransactionId;
use serde::Serialize;

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Result of a ledger audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub entry_count: u64,
    pub ids_monotonic: bool,
    pub amounts_consistent: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation found during the audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub id: TransactionId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    IdOutOfOrder,
    AmountMismatch,
}

/// Ledger integrity auditor.
pub struct LedgerValidator;

impl LedgerValidator {
    /// Check that ids strictly increase in append order and that each
    /// entry's karma equals the fixed amount for its source.
    pub fn validate<R: LedgerReader + ?Sized>(reader: &R) -> Result<ValidationReport, LedgerError> {
        let entries = reader.read_all()?;
        let mut violations = Vec::new();
        let mut ids_monotonic = true;
        let mut amounts_consistent = true;
        let mut previous: Option<TransactionId> = None;

        for entry in &entries {
            if let Some(prev) = previous {
                if entry.id <= prev {
                    ids_monotonic = false;
                    violations.push(Violation {
                        id: entry.id,
                        kind: ViolationKind::IdOutOfOrder,
                        description: format!("follows {prev}"),
                    });
                }
            }
            previous = Some(entry.id);

            let expected = entry.source_type.karma();
            if entry.karma != expected {
                amounts_consistent = false;
                violations.push(Violation {
                    id: entry.id,
                    kind: ViolationKind::AmountMismatch,
                    description: format!(
                        "{} credits {expected}, found {}",
                        entry.source_type, entry.karma
                    ),
                });
            }
        }

        if !violations.is_empty() {
            tracing::warn!(violations = violations.len(), "karma ledger audit failed");
        }

        Ok(ValidationReport {
            entry_count: entries.len() as u64,
            ids_monotonic,
            amounts_consistent,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use karmafeed_types::{KarmaSource, KarmaTransaction, NewKarmaTransaction, UserId};

    use crate::journal::KarmaLedger;

    use super::*;

    #[test]
    fn appended_ledger_is_valid() {
        let mut ledger = KarmaLedger::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ledger
            .append(NewKarmaTransaction::credit(UserId::new(1), KarmaSource::PostLike, 1), at)
            .unwrap();
        ledger
            .append(NewKarmaTransaction::credit(UserId::new(2), KarmaSource::CommentLike, 4), at)
            .unwrap();

        let report = LedgerValidator::validate(&ledger).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.entry_count, 2);
    }

    #[test]
    fn empty_ledger_is_valid() {
        let report = LedgerValidator::validate(&KarmaLedger::new()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.entry_count, 0);
    }

    #[test]
    fn detects_amount_mismatch() {
        let mut ledger = KarmaLedger::new();
        ledger
            .restore(KarmaTransaction {
                id: TransactionId::new(1),
                user_id: UserId::new(1),
                karma: 50,
                source_type: KarmaSource::PostLike,
                source_id: 1,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            })
            .unwrap();

        let report = LedgerValidator::validate(&ledger).unwrap();
        assert!(!report.amounts_consistent);
        assert!(report.ids_monotonic);
        assert_eq!(report.violations[0].kind, ViolationKind::AmountMismatch);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entry_count"], 1);
        assert_eq!(json["amounts_consistent"], false);
        assert_eq!(json["violations"][0]["kind"], "amount_mismatch");
        assert_eq!(json["violations"][0]["id"], 1);
    }
}
