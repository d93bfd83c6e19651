//! Feed storage for karmafeed.
//!
//! Four logical tables (posts, comments, likes, karma transactions) plus the
//! users they reference. Integrity rules live here, at the storage layer,
//! so that no caller can bypass them:
//!
//! 1. `(user, target)` is unique among likes.
//! 2. A reply's parent belongs to the same post as the reply.
//! 3. Every foreign key resolves.
//! 4. Karma transactions are insert-only.
//!
//! All writes happen inside a unit of work obtained from
//! [`FeedStore::transact`]; its writes are applied together or not at all.
//!
//! # Storage Backends
//!
//! - [`InMemoryFeedStore`] -- lock-guarded tables for tests and embedding

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{
    StoreError, StoreResult, COMMENTS_PARENT_SAME_POST, LIKES_USER_TARGET_UNIQUE,
    USERS_USERNAME_UNIQUE,
};
pub use memory::InMemoryFeedStore;
pub use snapshot::{FeedSnapshot, SNAPSHOT_VERSION};
pub use traits::{FeedStore, NewComment, NewPost, StoreTx, StoreView};
