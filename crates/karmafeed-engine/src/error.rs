use karmafeed_ledger::LedgerError;
use karmafeed_store::StoreError;
use karmafeed_types::{CommentId, LikeTarget, PostId, UserId};
use thiserror::Error;

/// Caller-visible failures of feed operations.
///
/// `NotFound`, `DuplicateLike` and `InvalidParent` are semantic rejections;
/// none is retried internally.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{user} already likes {target}")]
    DuplicateLike { user: UserId, target: LikeTarget },

    #[error("parent comment {parent} belongs to {parent_post}, not {post}")]
    InvalidParent {
        parent: CommentId,
        parent_post: PostId,
        post: PostId,
    },

    #[error("username {0:?} is taken")]
    UsernameTaken(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl FeedError {
    pub(crate) fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        FeedError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for FeedError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => FeedError::NotFound { entity, id },
            StoreError::Ledger(error) => FeedError::Ledger(error),
            other => FeedError::Storage(other),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
