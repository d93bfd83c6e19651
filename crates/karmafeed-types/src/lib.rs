//! Foundation types for karmafeed.
//!
//! Every other karmafeed crate depends on `karmafeed-types`. It holds the
//! plain data records stored by the feed and the small vocabulary shared by
//! the ledger, the store, and the engine.
//!
//! # Key Types
//!
//! - [`UserId`], [`PostId`], [`CommentId`], [`LikeId`], [`TransactionId`] -- store-assigned identifiers
//! - [`Post`], [`Comment`], [`Like`], [`User`] -- feed records
//! - [`LikeTarget`] -- what a like points at (a post or a comment, never both)
//! - [`KarmaTransaction`] -- one immutable ledger entry
//! - [`KarmaSource`] -- why karma was credited, and how much it is worth
//! - [`Clock`] -- injectable wall clock

pub mod clock;
pub mod error;
pub mod ids;
pub mod karma;
pub mod records;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::TypeError;
pub use ids::{CommentId, LikeId, PostId, TransactionId, UserId};
pub use karma::{KarmaSource, KarmaTransaction, NewKarmaTransaction, COMMENT_LIKE_KARMA, POST_LIKE_KARMA};
pub use records::{Comment, Like, LikeTarget, Post, User};
