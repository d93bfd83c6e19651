use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use karmafeed_types::UserId;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::leaderboard::LeaderboardQuery;
use crate::traits::LedgerReader;

/// A user's karma as derived from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaSummary {
    pub user_id: UserId,
    /// Sum of every entry ever credited to the user.
    pub total_karma: i64,
    /// Sum of entries inside the leaderboard window.
    pub daily_karma: i64,
}

/// Deterministic projections over the ledger. Nothing here is cached.
pub struct KarmaProjection;

impl KarmaProjection {
    pub fn summary<R: LedgerReader + ?Sized>(
        reader: &R,
        user: UserId,
        query: &LeaderboardQuery,
        now: DateTime<Utc>,
    ) -> Result<KarmaSummary, LedgerError> {
        let cutoff = query.cutoff(now)?;
        let entries = reader.read_for_user(user)?;

        let total_karma = entries.iter().fold(0i64, |sum, t| sum.saturating_add(t.karma));
        let daily_karma = entries
            .iter()
            .filter(|t| t.created_at >= cutoff)
            .fold(0i64, |sum, t| sum.saturating_add(t.karma));

        Ok(KarmaSummary {
            user_id: user,
            total_karma,
            daily_karma,
        })
    }

    /// All-time totals for every credited user, from a full ledger scan.
    pub fn totals<R: LedgerReader + ?Sized>(reader: &R) -> Result<BTreeMap<UserId, i64>, LedgerError> {
        let mut totals = BTreeMap::new();
        for entry in reader.read_all()? {
            let total: &mut i64 = totals.entry(entry.user_id).or_insert(0);
            *total = total.saturating_add(entry.karma);
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use karmafeed_types::{KarmaSource, NewKarmaTransaction};

    use crate::journal::KarmaLedger;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn summary_splits_total_and_daily() {
        let mut ledger = KarmaLedger::new();
        let user = UserId::new(1);
        ledger
            .append(
                NewKarmaTransaction::credit(user, KarmaSource::PostLike, 1),
                now() - Duration::days(3),
            )
            .unwrap();
        ledger
            .append(
                NewKarmaTransaction::credit(user, KarmaSource::CommentLike, 2),
                now() - Duration::hours(1),
            )
            .unwrap();
        ledger
            .append(
                NewKarmaTransaction::credit(UserId::new(2), KarmaSource::PostLike, 3),
                now(),
            )
            .unwrap();

        let summary =
            KarmaProjection::summary(&ledger, user, &LeaderboardQuery::default(), now()).unwrap();
        assert_eq!(summary.total_karma, 6);
        assert_eq!(summary.daily_karma, 1);
    }

    #[test]
    fn summary_of_unknown_user_is_zero() {
        let ledger = KarmaLedger::new();
        let summary = KarmaProjection::summary(
            &ledger,
            UserId::new(9),
            &LeaderboardQuery::default(),
            now(),
        )
        .unwrap();
        assert_eq!(summary.total_karma, 0);
        assert_eq!(summary.daily_karma, 0);
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        let mut ledger = KarmaLedger::new();
        for _ in 0..2 {
            ledger
                .append(
                    NewKarmaTransaction {
                        user_id: UserId::new(1),
                        karma: i64::MAX,
                        source_type: KarmaSource::PostLike,
                        source_id: 1,
                    },
                    now(),
                )
                .unwrap();
        }

        let summary =
            KarmaProjection::summary(&ledger, UserId::new(1), &LeaderboardQuery::default(), now())
                .unwrap();
        assert_eq!((summary.total_karma, summary.daily_karma), (i64::MAX, i64::MAX));
        assert_eq!(KarmaProjection::totals(&ledger).unwrap()[&UserId::new(1)], i64::MAX);
    }

    #[test]
    fn totals_cover_whole_ledger() {
        let mut ledger = KarmaLedger::new();
        ledger
            .append(
                NewKarmaTransaction::credit(UserId::new(1), KarmaSource::PostLike, 1),
                now() - Duration::days(30),
            )
            .unwrap();
        ledger
            .append(
                NewKarmaTransaction::credit(UserId::new(1), KarmaSource::PostLike, 2),
                now(),
            )
            .unwrap();
        ledger
            .append(
                NewKarmaTransaction::credit(UserId::new(3), KarmaSource::CommentLike, 1),
                now(),
            )
            .unwrap();

        let totals = KarmaProjection::totals(&ledger).unwrap();
        assert_eq!(totals.get(&UserId::new(1)), Some(&10));
        assert_eq!(totals.get(&UserId::new(3)), Some(&1));
        assert_eq!(totals.len(), 2);
    }
}
