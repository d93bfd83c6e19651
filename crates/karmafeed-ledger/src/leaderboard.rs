use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use karmafeed_types::{KarmaTransaction, UserId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Trailing window the leaderboard looks at by default: 24 hours.
pub const DEFAULT_WINDOW_SECS: u64 = 86_400;

/// Number of users the leaderboard shows by default.
pub const DEFAULT_LIMIT: usize = 5;

/// Parameters of one leaderboard computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub window_secs: u64,
    pub limit: usize,
}

impl LeaderboardQuery {
    pub fn new(window_secs: u64, limit: usize) -> Self {
        Self { window_secs, limit }
    }

    /// Oldest `created_at` still inside the window ending at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, LedgerError> {
        let invalid = LedgerError::InvalidWindow {
            secs: self.window_secs,
        };
        let secs = i64::try_from(self.window_secs).map_err(|_| invalid.clone())?;
        let window = Duration::try_seconds(secs).ok_or_else(|| invalid.clone())?;
        now.checked_sub_signed(window).ok_or(invalid)
    }
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS, DEFAULT_LIMIT)
    }
}

/// One ranked row. `rank` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub karma: i64,
}

/// Rolling-window leaderboard calculator.
///
/// Every call rescans the ledger; there is no maintained aggregate. Users
/// are ordered by windowed karma descending, then by user id ascending.
/// Users without a transaction inside the window do not appear at all.
pub struct Leaderboard;

impl Leaderboard {
    pub fn top_users<R: LedgerReader + ?Sized>(
        reader: &R,
        query: &LeaderboardQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let cutoff = query.cutoff(now)?;
        let recent = reader.read_since(cutoff)?;
        let ranked = Self::rank(&recent, cutoff, query.limit);
        tracing::debug!(
            window_secs = query.window_secs,
            limit = query.limit,
            scanned = recent.len(),
            ranked = ranked.len(),
            "leaderboard computed"
        );
        Ok(ranked)
    }

    /// Rank `entries` created at or after `cutoff`, truncated to `limit`.
    pub fn rank<'a, I>(entries: I, cutoff: DateTime<Utc>, limit: usize) -> Vec<LeaderboardEntry>
    where
        I: IntoIterator<Item = &'a KarmaTransaction>,
    {
        let mut totals: HashMap<UserId, i64> = HashMap::new();
        for entry in entries {
            if entry.created_at >= cutoff {
                let total = totals.entry(entry.user_id).or_default();
                *total = total.saturating_add(entry.karma);
            }
        }

        let mut rows: Vec<(UserId, i64)> = totals.into_iter().collect();
        rows.sort_by(|(a_user, a_karma), (b_user, b_karma)| {
            b_karma.cmp(a_karma).then(a_user.cmp(b_user))
        });

        rows.into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (user_id, karma))| LeaderboardEntry {
                rank: index + 1,
                user_id,
                karma,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use karmafeed_types::{KarmaSource, NewKarmaTransaction};
    use proptest::prelude::*;

    use crate::journal::KarmaLedger;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn credit(ledger: &mut KarmaLedger, user: u64, karma: i64, at: DateTime<Utc>) {
        ledger
            .append(
                NewKarmaTransaction {
                    user_id: UserId::new(user),
                    karma,
                    source_type: KarmaSource::PostLike,
                    source_id: 1,
                },
                at,
            )
            .unwrap();
    }

    #[test]
    fn only_last_24_hours_count() {
        let mut ledger = KarmaLedger::new();
        credit(&mut ledger, 1, 100, now() - Duration::days(2));
        credit(&mut ledger, 1, 10, now() - Duration::hours(12));

        let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::default(), now()).unwrap();
        assert_eq!(
            board,
            vec![LeaderboardEntry {
                rank: 1,
                user_id: UserId::new(1),
                karma: 10
            }]
        );
    }

    #[test]
    fn oversized_amounts_saturate() {
        let mut ledger = KarmaLedger::new();
        credit(&mut ledger, 1, i64::MAX, now());
        credit(&mut ledger, 1, i64::MAX, now());
        credit(&mut ledger, 2, 5, now());

        let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::default(), now()).unwrap();
        assert_eq!(board[0].user_id, UserId::new(1));
        assert_eq!(board[0].karma, i64::MAX);
        assert_eq!(board[1].karma, 5);
    }

    #[test]
    fn window_edges() {
        let mut ledger = KarmaLedger::new();
        credit(&mut ledger, 1, 5, now() - Duration::hours(25));
        credit(&mut ledger, 2, 5, now() - Duration::hours(23));
        credit(&mut ledger, 3, 5, now() - Duration::hours(24));

        let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::default(), now()).unwrap();
        let users: Vec<_> = board.iter().map(|e| e.user_id.get()).collect();
        assert_eq!(users, vec![2, 3]);
    }

    #[test]
    fn ordered_by_karma_then_user_id() {
        let mut ledger = KarmaLedger::new();
        credit(&mut ledger, 1, 15, now());
        credit(&mut ledger, 2, 25, now());
        credit(&mut ledger, 3, 5, now());
        credit(&mut ledger, 4, 15, now());

        let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::default(), now()).unwrap();
        let users: Vec<_> = board.iter().map(|e| (e.rank, e.user_id.get(), e.karma)).collect();
        assert_eq!(users, vec![(1, 2, 25), (2, 1, 15), (3, 4, 15), (4, 3, 5)]);
    }

    #[test]
    fn truncates_to_limit() {
        let mut ledger = KarmaLedger::new();
        for user in 1..=8 {
            credit(&mut ledger, user, user as i64, now());
        }

        let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::default(), now()).unwrap();
        assert_eq!(board.len(), 5);
        assert_eq!(board[0].user_id, UserId::new(8));
        assert_eq!(board[4].user_id, UserId::new(4));

        let none = Leaderboard::top_users(&ledger, &LeaderboardQuery::new(86_400, 0), now()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn empty_ledger_gives_empty_board() {
        let ledger = KarmaLedger::new();
        let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::default(), now()).unwrap();
        assert!(board.is_empty());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let ledger = KarmaLedger::new();
        let error = Leaderboard::top_users(&ledger, &LeaderboardQuery::new(u64::MAX, 5), now())
            .unwrap_err();
        assert_eq!(error, LedgerError::InvalidWindow { secs: u64::MAX });
    }

    proptest! {
        #[test]
        fn board_is_sorted_and_bounded(
            credits in prop::collection::vec((1u64..20, 1i64..10, 0i64..48), 0..60),
            limit in 0usize..10,
        ) {
            let mut ledger = KarmaLedger::new();
            for (user, karma, hours_ago) in &credits {
                credit(&mut ledger, *user, *karma, now() - Duration::hours(*hours_ago));
            }

            let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::new(86_400, limit), now()).unwrap();
            prop_assert!(board.len() <= limit);
            for pair in board.windows(2) {
                prop_assert!(
                    pair[0].karma > pair[1].karma
                        || (pair[0].karma == pair[1].karma && pair[0].user_id < pair[1].user_id)
                );
            }
            for (index, row) in board.iter().enumerate() {
                prop_assert_eq!(row.rank, index + 1);
            }
        }

        #[test]
        fn windowed_totals_match_direct_sums(
            credits in prop::collection::vec((1u64..6, 1i64..10, 0i64..48), 0..60),
        ) {
            let mut ledger = KarmaLedger::new();
            for (user, karma, hours_ago) in &credits {
                credit(&mut ledger, *user, *karma, now() - Duration::hours(*hours_ago));
            }

            let board = Leaderboard::top_users(&ledger, &LeaderboardQuery::new(86_400, usize::MAX), now()).unwrap();
            for row in &board {
                let expected: i64 = credits
                    .iter()
                    .filter(|(user, _, hours_ago)| *user == row.user_id.get() && *hours_ago <= 24)
                    .map(|(_, karma, _)| karma)
                    .sum();
                prop_assert_eq!(row.karma, expected);
            }
            let distinct_recent: std::collections::HashSet<u64> = credits
                .iter()
                .filter(|(_, _, hours_ago)| *hours_ago <= 24)
                .map(|(user, _, _)| *user)
                .collect();
            prop_assert_eq!(board.len(), distinct_recent.len());
        }
    }
}
