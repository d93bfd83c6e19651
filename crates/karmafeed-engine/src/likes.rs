use karmafeed_store::{StoreError, StoreTx, StoreView, LIKES_USER_TARGET_UNIQUE};
use karmafeed_types::{Like, LikeTarget, UserId};

use crate::error::FeedError;

/// At most one like per `(user, post)` and per `(user, comment)`.
///
/// Duplicates are caught by the store's unique constraint at insert time.
/// [`LikeRegistry::has_liked`] is informational only; nothing relies on it
/// as a guard.
pub struct LikeRegistry;

impl LikeRegistry {
    pub fn has_liked<V: StoreView + ?Sized>(view: &V, user: UserId, target: LikeTarget) -> bool {
        view.find_like(user, target).is_some()
    }

    /// Record `user` liking `target`.
    pub fn create_like(
        tx: &mut dyn StoreTx,
        user: UserId,
        target: LikeTarget,
    ) -> Result<Like, FeedError> {
        require_user(&*tx, user)?;
        target_author(&*tx, target)?;

        tx.insert_like(user, target).map_err(|error| match error.constraint() {
            Some(LIKES_USER_TARGET_UNIQUE) => FeedError::DuplicateLike { user, target },
            _ => error.into(),
        })
    }

    /// Remove `user`'s like of `target`. Fails with `NotFound` if the target
    /// or the like does not exist.
    pub fn remove_like(
        tx: &mut dyn StoreTx,
        user: UserId,
        target: LikeTarget,
    ) -> Result<Like, FeedError> {
        target_author(&*tx, target)?;
        tx.delete_like(user, target).map_err(|error| match error {
            StoreError::NotFound { .. } => {
                FeedError::not_found("like", format!("{user} -> {target}"))
            }
            other => other.into(),
        })
    }

    /// Number of likes on an existing target.
    pub fn like_count<V: StoreView + ?Sized>(view: &V, target: LikeTarget) -> Result<u64, FeedError> {
        target_author(view, target)?;
        Ok(view.like_count(target))
    }
}

/// Author of the liked post or comment, or `NotFound`.
pub(crate) fn target_author<V: StoreView + ?Sized>(
    view: &V,
    target: LikeTarget,
) -> Result<UserId, FeedError> {
    match target {
        LikeTarget::Post(id) => view
            .post(id)
            .map(|p| p.author_id)
            .ok_or_else(|| FeedError::not_found("post", id)),
        LikeTarget::Comment(id) => view
            .comment(id)
            .map(|c| c.author_id)
            .ok_or_else(|| FeedError::not_found("comment", id)),
    }
}

pub(crate) fn require_user<V: StoreView + ?Sized>(view: &V, user: UserId) -> Result<(), FeedError> {
    view.user(user)
        .map(|_| ())
        .ok_or_else(|| FeedError::not_found("user", user))
}
