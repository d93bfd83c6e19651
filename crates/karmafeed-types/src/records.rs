use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, LikeId, PostId, UserId};
use crate::karma::KarmaSource;

/// A feed member, as far as the feed cares: an id and a display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A top-level post. The author never changes after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment on a post, optionally replying to another comment of the
/// same post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Returns `true` if this comment hangs directly off its post.
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// The thing a like points at. Exactly one of post or comment, which the
/// enum makes unrepresentable otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LikeTarget {
    Post(PostId),
    Comment(CommentId),
}

impl LikeTarget {
    /// The karma source a like on this target produces.
    pub fn karma_source(&self) -> KarmaSource {
        match self {
            LikeTarget::Post(_) => KarmaSource::PostLike,
            LikeTarget::Comment(_) => KarmaSource::CommentLike,
        }
    }

    /// Raw id of the target row, as recorded in `KarmaTransaction::source_id`.
    pub fn raw_id(&self) -> u64 {
        match self {
            LikeTarget::Post(id) => id.get(),
            LikeTarget::Comment(id) => id.get(),
        }
    }

    /// Short noun for log lines and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LikeTarget::Post(_) => "post",
            LikeTarget::Comment(_) => "comment",
        }
    }
}

impl fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LikeTarget::Post(id) => write!(f, "{id}"),
            LikeTarget::Comment(id) => write!(f, "{id}"),
        }
    }
}

/// One user liking one post or comment. Created by a like, destroyed by an
/// unlike, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: LikeId,
    pub user_id: UserId,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
}
