use std::sync::Arc;

use karmafeed_ledger::{
    KarmaProjection, KarmaSummary, Leaderboard, LeaderboardQuery, LedgerValidator,
    ValidationReport,
};
use karmafeed_store::{FeedStore, InMemoryFeedStore, NewPost, StoreError, USERS_USERNAME_UNIQUE};
use karmafeed_types::{
    Clock, Comment, CommentId, KarmaTransaction, Like, LikeTarget, Post, PostId, User, UserId,
};
use serde::{Deserialize, Serialize};

use crate::comments::{CommentNode, CommentTree};
use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::karma::KarmaEngine;
use crate::likes::{require_user, LikeRegistry};

/// One leaderboard line, ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: UserId,
    pub username: String,
    /// Karma earned inside the window.
    pub karma: i64,
    /// All-time karma.
    pub total_karma: i64,
}

/// The feed core.
///
/// Every operation takes the acting user's id explicitly. Cloning a `Feed`
/// is cheap and clones share the same store.
#[derive(Debug)]
pub struct Feed<S = InMemoryFeedStore> {
    store: Arc<S>,
    config: FeedConfig,
}

impl<S> Clone for Feed<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl Feed<InMemoryFeedStore> {
    /// An empty in-memory feed on the system clock with default settings.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryFeedStore::new()),
            config: FeedConfig::default(),
        }
    }

    /// An empty in-memory feed on `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>, config: FeedConfig) -> FeedResult<Self> {
        Self::new(Arc::new(InMemoryFeedStore::with_clock(clock)), config)
    }
}

impl<S: FeedStore> Feed<S> {
    pub fn new(store: Arc<S>, config: FeedConfig) -> FeedResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    // -- users ---------------------------------------------------------------

    pub fn create_user(&self, username: &str) -> FeedResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(FeedError::Validation("username must not be empty".into()));
        }
        let user = self.store.transact(|tx| {
            tx.insert_user(username).map_err(|error| match error.constraint() {
                Some(USERS_USERNAME_UNIQUE) => FeedError::UsernameTaken(username.to_string()),
                _ => error.into(),
            })
        })?;
        tracing::debug!(user = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> FeedResult<User> {
        self.store.read(|view| {
            view.user(id)
                .cloned()
                .ok_or_else(|| FeedError::not_found("user", id))
        })
    }

    pub fn list_users(&self) -> Vec<User> {
        self.store
            .read(|view| Ok::<_, StoreError>(view.users().into_iter().cloned().collect()))
            .unwrap_or_default()
    }

    // -- posts ---------------------------------------------------------------

    /// Create a post. A blank title becomes the configured default title.
    pub fn create_post(&self, author: UserId, title: &str, content: &str) -> FeedResult<Post> {
        let title = match title.trim() {
            "" => self.config.default_post_title.clone(),
            t => t.to_string(),
        };
        if title.chars().count() > self.config.max_title_len {
            return Err(FeedError::Validation(format!(
                "title is longer than {} characters",
                self.config.max_title_len
            )));
        }
        if content.trim().is_empty() {
            return Err(FeedError::Validation("post content must not be empty".into()));
        }

        let post = self.store.transact(|tx| {
            require_user(&*tx, author)?;
            let post = tx.insert_post(NewPost {
                author_id: author,
                title,
                content: content.to_string(),
            })?;
            Ok::<_, FeedError>(post)
        })?;
        tracing::debug!(post = %post.id, author = %author, "post created");
        Ok(post)
    }

    pub fn get_post(&self, id: PostId) -> FeedResult<Post> {
        self.store.read(|view| {
            view.post(id)
                .cloned()
                .ok_or_else(|| FeedError::not_found("post", id))
        })
    }

    /// All posts, newest first.
    pub fn list_posts(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .store
            .read(|view| Ok::<_, StoreError>(view.posts().into_iter().cloned().collect()))
            .unwrap_or_default();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }

    pub fn post_like_count(&self, post: PostId) -> FeedResult<u64> {
        self.store
            .read(|view| LikeRegistry::like_count(view, LikeTarget::Post(post)))
    }

    pub fn comment_like_count(&self, comment: CommentId) -> FeedResult<u64> {
        self.store
            .read(|view| LikeRegistry::like_count(view, LikeTarget::Comment(comment)))
    }

    pub fn post_comment_count(&self, post: PostId) -> FeedResult<usize> {
        self.store.read(|view| {
            if view.post(post).is_none() {
                return Err(FeedError::not_found("post", post));
            }
            Ok(view.comments_for_post(post).len())
        })
    }

    // -- comments ------------------------------------------------------------

    pub fn create_comment(
        &self,
        post: PostId,
        parent: Option<CommentId>,
        author: UserId,
        content: &str,
    ) -> FeedResult<Comment> {
        let result = self
            .store
            .transact(|tx| CommentTree::create_comment(tx, post, parent, author, content));
        match result {
            Ok(comment) => {
                tracing::debug!(
                    comment = %comment.id,
                    post = %post,
                    parent = ?comment.parent_id,
                    author = %author,
                    "comment created"
                );
                Ok(comment)
            }
            Err(error) => {
                if let FeedError::InvalidParent {
                    parent,
                    parent_post,
                    post,
                } = &error
                {
                    tracing::warn!(
                        parent = %parent,
                        parent_post = %parent_post,
                        post = %post,
                        "reply to a comment on another post rejected"
                    );
                }
                Err(error)
            }
        }
    }

    /// Every comment on `post`, nested, oldest first at every level.
    pub fn get_thread(&self, post: PostId) -> FeedResult<Vec<CommentNode>> {
        self.store.read(|view| CommentTree::thread(view, post))
    }

    pub fn get_subtree(&self, comment: CommentId) -> FeedResult<CommentNode> {
        self.store.read(|view| CommentTree::subtree(view, comment))
    }

    // -- likes ---------------------------------------------------------------

    pub fn like_post(&self, user: UserId, post: PostId) -> FeedResult<KarmaTransaction> {
        KarmaEngine::like_post(self.store.as_ref(), user, post)
    }

    pub fn unlike_post(&self, user: UserId, post: PostId) -> FeedResult<Like> {
        KarmaEngine::unlike_post(self.store.as_ref(), user, post)
    }

    pub fn like_comment(&self, user: UserId, comment: CommentId) -> FeedResult<KarmaTransaction> {
        KarmaEngine::like_comment(self.store.as_ref(), user, comment)
    }

    pub fn unlike_comment(&self, user: UserId, comment: CommentId) -> FeedResult<Like> {
        KarmaEngine::unlike_comment(self.store.as_ref(), user, comment)
    }

    pub fn has_liked(&self, user: UserId, target: LikeTarget) -> bool {
        self.store
            .read(|view| Ok::<_, StoreError>(LikeRegistry::has_liked(view, user, target)))
            .unwrap_or(false)
    }

    // -- karma ---------------------------------------------------------------

    /// Users ranked by karma earned in the last `window_secs` seconds.
    pub fn top_users(&self, window_secs: u64, limit: usize) -> FeedResult<Vec<LeaderboardRow>> {
        let query = LeaderboardQuery::new(window_secs, limit);
        let now = self.store.clock().now();
        let ranked = Leaderboard::top_users(self.store.as_ref(), &query, now)?;
        let totals = KarmaProjection::totals(self.store.as_ref())?;

        self.store.read(|view| {
            ranked
                .into_iter()
                .map(|entry| {
                    let user = view
                        .user(entry.user_id)
                        .ok_or_else(|| FeedError::not_found("user", entry.user_id))?;
                    Ok(LeaderboardRow {
                        rank: entry.rank,
                        user_id: entry.user_id,
                        username: user.username.clone(),
                        karma: entry.karma,
                        total_karma: totals.get(&entry.user_id).copied().unwrap_or(0),
                    })
                })
                .collect()
        })
    }

    /// The leaderboard with the configured window and limit.
    pub fn leaderboard(&self) -> FeedResult<Vec<LeaderboardRow>> {
        self.top_users(self.config.leaderboard_window_secs, self.config.leaderboard_limit)
    }

    /// All-time and in-window karma for `user`.
    pub fn user_karma(&self, user: UserId) -> FeedResult<KarmaSummary> {
        self.get_user(user)?;
        let now = self.store.clock().now();
        Ok(KarmaProjection::summary(
            self.store.as_ref(),
            user,
            &self.config.leaderboard_query(),
            now,
        )?)
    }

    pub fn audit_ledger(&self) -> FeedResult<ValidationReport> {
        Ok(LedgerValidator::validate(self.store.as_ref())?)
    }
}
