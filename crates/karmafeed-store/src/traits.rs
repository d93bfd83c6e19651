use chrono::{DateTime, Utc};
use karmafeed_ledger::LedgerReader;
use karmafeed_types::{
    Clock, Comment, CommentId, KarmaTransaction, Like, LikeTarget, NewKarmaTransaction, Post,
    PostId, User, UserId,
};

use crate::error::{StoreError, StoreResult};

/// A post before the store assigns its id and timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
}

/// A comment before the store assigns its id and timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub content: String,
}

/// Consistent read access to every table.
///
/// Relationship lookups are explicit methods; callers ask for exactly the
/// rows they need.
pub trait StoreView {
    fn user(&self, id: UserId) -> Option<&User>;

    fn user_by_name(&self, username: &str) -> Option<&User>;

    /// All users, by id.
    fn users(&self) -> Vec<&User>;

    fn post(&self, id: PostId) -> Option<&Post>;

    /// All posts, by id.
    fn posts(&self) -> Vec<&Post>;

    fn comment(&self, id: CommentId) -> Option<&Comment>;

    /// Every comment on `post` at any depth, ordered by `created_at` then id.
    fn comments_for_post(&self, post: PostId) -> Vec<&Comment>;

    /// Direct replies to `comment`, ordered by `created_at` then id.
    fn replies_to(&self, comment: CommentId) -> Vec<&Comment>;

    fn find_like(&self, user: UserId, target: LikeTarget) -> Option<&Like>;

    fn like_count(&self, target: LikeTarget) -> u64;

    /// The karma ledger in append order.
    fn karma_entries(&self) -> &[KarmaTransaction];
}

/// Write access inside one unit of work.
///
/// Every method enforces the storage constraints itself. Writes are visible
/// to later reads in the same unit of work.
pub trait StoreTx: StoreView {
    /// Timestamp stamped on every row written by this unit of work.
    fn now(&self) -> DateTime<Utc>;

    /// Fails with a unique violation if the username is taken.
    fn insert_user(&mut self, username: &str) -> StoreResult<User>;

    fn insert_post(&mut self, post: NewPost) -> StoreResult<Post>;

    /// Fails with a check violation if the parent is on another post.
    fn insert_comment(&mut self, comment: NewComment) -> StoreResult<Comment>;

    /// Fails with a unique violation if `user` already likes `target`.
    fn insert_like(&mut self, user: UserId, target: LikeTarget) -> StoreResult<Like>;

    /// Removes and returns the like, or fails with `NotFound`.
    fn delete_like(&mut self, user: UserId, target: LikeTarget) -> StoreResult<Like>;

    /// Appends to the karma ledger. There is no counterpart that removes.
    fn append_karma(&mut self, entry: NewKarmaTransaction) -> StoreResult<KarmaTransaction>;
}

/// A feed storage backend.
///
/// Implementations must be thread-safe. Units of work are serializable with
/// respect to each other: two concurrent `transact` calls behave as if one
/// ran entirely before the other.
pub trait FeedStore: LedgerReader {
    /// Run `work` against a consistent view of the store.
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreView) -> Result<T, E>,
        E: From<StoreError>;

    /// Run `work` as one atomic unit. If `work` returns `Err` (or panics),
    /// every write it made is discarded.
    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>;

    /// The clock this store stamps rows with.
    fn clock(&self) -> &dyn Clock;
}
