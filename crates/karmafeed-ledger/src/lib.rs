//! Append-only karma ledger for karmafeed.
//!
//! The ledger is the sole source of truth for karma. This crate provides:
//! - [`KarmaLedger`], the insert-only journal of karma transactions
//! - the [`LedgerReader`] trait boundary that stores implement
//! - the rolling-window [`Leaderboard`] calculator
//! - [`KarmaProjection`] for per-user totals, recomputed on every call
//! - [`LedgerValidator`] for auditing a ledger's integrity

pub mod error;
pub mod journal;
pub mod leaderboard;
pub mod projection;
pub mod traits;
pub mod validation;

pub use error::LedgerError;
pub use journal::{KarmaLedger, LedgerMark};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardQuery};
pub use projection::{KarmaProjection, KarmaSummary};
pub use traits::LedgerReader;
pub use validation::{LedgerValidator, ValidationReport, Violation, ViolationKind};
