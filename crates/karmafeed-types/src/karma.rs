use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{TransactionId, UserId};

/// Karma credited to a post's author when someone likes the post.
pub const POST_LIKE_KARMA: i64 = 5;

/// Karma credited to a comment's author when someone likes the comment.
pub const COMMENT_LIKE_KARMA: i64 = 1;

/// Why a ledger entry exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KarmaSource {
    PostLike,
    CommentLike,
}

impl KarmaSource {
    /// Fixed karma amount for this source.
    pub const fn karma(self) -> i64 {
        match self {
            KarmaSource::PostLike => POST_LIKE_KARMA,
            KarmaSource::CommentLike => COMMENT_LIKE_KARMA,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            KarmaSource::PostLike => "post_like",
            KarmaSource::CommentLike => "comment_like",
        }
    }
}

impl fmt::Display for KarmaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KarmaSource {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post_like" => Ok(KarmaSource::PostLike),
            "comment_like" => Ok(KarmaSource::CommentLike),
            other => Err(TypeError::UnknownKarmaSource(other.to_string())),
        }
    }
}

/// One immutable entry of the karma ledger.
///
/// The ledger is the only source of truth for karma totals; nothing else
/// caches a total. Entries are never updated or deleted once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaTransaction {
    pub id: TransactionId,
    /// The user credited (the liked item's author, not the liker).
    pub user_id: UserId,
    pub karma: i64,
    pub source_type: KarmaSource,
    /// Raw id of the liked post or comment.
    pub source_id: u64,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry before the ledger has assigned its id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewKarmaTransaction {
    pub user_id: UserId,
    pub karma: i64,
    pub source_type: KarmaSource,
    pub source_id: u64,
}

impl NewKarmaTransaction {
    /// Build an entry carrying the fixed amount for `source_type`.
    pub fn credit(user_id: UserId, source_type: KarmaSource, source_id: u64) -> Self {
        Self {
            user_id,
            karma: source_type.karma(),
            source_type,
            source_id,
        }
    }
}
