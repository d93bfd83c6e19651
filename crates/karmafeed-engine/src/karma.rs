use karmafeed_store::FeedStore;
use karmafeed_types::{
    CommentId, KarmaTransaction, Like, LikeTarget, NewKarmaTransaction, PostId, UserId,
};

use crate::error::FeedError;
use crate::likes::{target_author, LikeRegistry};

/// Couples every like with its karma credit.
///
/// The like row and the ledger entry are written in one unit of work, so
/// either both exist or neither does. Karma goes to the author of the liked
/// post or comment, never to the liker.
pub struct KarmaEngine;

impl KarmaEngine {
    /// Like `target` and credit its author. Returns the ledger entry.
    pub fn like<S: FeedStore>(
        store: &S,
        user: UserId,
        target: LikeTarget,
    ) -> Result<KarmaTransaction, FeedError> {
        let result = store.transact(|tx| {
            let author = target_author(&*tx, target)?;
            let like = LikeRegistry::create_like(tx, user, target)?;
            let credit = tx.append_karma(NewKarmaTransaction::credit(
                author,
                target.karma_source(),
                target.raw_id(),
            ))?;
            Ok::<_, FeedError>((like, credit))
        });

        match result {
            Ok((like, credit)) => {
                tracing::info!(
                    like = %like.id,
                    liker = %user,
                    target = %target,
                    author = %credit.user_id,
                    karma = credit.karma,
                    "karma credited"
                );
                Ok(credit)
            }
            Err(error) => {
                if let FeedError::DuplicateLike { .. } = error {
                    tracing::warn!(user = %user, target = %target, "duplicate like rejected");
                }
                Err(error)
            }
        }
    }

    pub fn like_post<S: FeedStore>(
        store: &S,
        user: UserId,
        post: PostId,
    ) -> Result<KarmaTransaction, FeedError> {
        Self::like(store, user, LikeTarget::Post(post))
    }

    pub fn like_comment<S: FeedStore>(
        store: &S,
        user: UserId,
        comment: CommentId,
    ) -> Result<KarmaTransaction, FeedError> {
        Self::like(store, user, LikeTarget::Comment(comment))
    }

    /// Remove a like. Karma already credited for it stays in the ledger.
    pub fn unlike<S: FeedStore>(
        store: &S,
        user: UserId,
        target: LikeTarget,
    ) -> Result<Like, FeedError> {
        let like = store.transact(|tx| LikeRegistry::remove_like(tx, user, target))?;
        tracing::info!(like = %like.id, user = %user, target = %target, "like removed");
        Ok(like)
    }

    pub fn unlike_post<S: FeedStore>(store: &S, user: UserId, post: PostId) -> Result<Like, FeedError> {
        Self::unlike(store, user, LikeTarget::Post(post))
    }

    pub fn unlike_comment<S: FeedStore>(
        store: &S,
        user: UserId,
        comment: CommentId,
    ) -> Result<Like, FeedError> {
        Self::unlike(store, user, LikeTarget::Comment(comment))
    }
}
