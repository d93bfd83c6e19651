//! Feed core for karmafeed.
//!
//! Request handlers (routing, auth, presentation) live outside this crate
//! and call into [`Feed`] with the acting user's id on every operation.
//!
//! - [`LikeRegistry`] -- at most one like per user and target
//! - [`CommentTree`] -- nested comments that never cross posts
//! - [`KarmaEngine`] -- a like and its karma credit, atomically
//! - [`Feed`] -- the facade tying them to a store and a [`FeedConfig`]

pub mod comments;
pub mod config;
pub mod error;
pub mod feed;
pub mod karma;
pub mod likes;

pub use comments::{CommentNode, CommentTree, ThreadEntry};
pub use config::FeedConfig;
pub use error::{FeedError, FeedResult};
pub use feed::{Feed, LeaderboardRow};
pub use karma::KarmaEngine;
pub use likes::LikeRegistry;
