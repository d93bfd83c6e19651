use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use karmafeed_ledger::{KarmaLedger, LedgerError, LedgerMark, LedgerReader};
use karmafeed_types::{
    Clock, Comment, CommentId, KarmaTransaction, Like, LikeId, LikeTarget, NewKarmaTransaction,
    Post, PostId, SystemClock, User, UserId,
};

use crate::error::{
    StoreError, StoreResult, COMMENTS_PARENT_SAME_POST, LIKES_USER_TARGET_UNIQUE,
    USERS_USERNAME_UNIQUE,
};
use crate::snapshot::{FeedSnapshot, SNAPSHOT_VERSION};
use crate::traits::{FeedStore, NewComment, NewPost, StoreTx, StoreView};

/// In-memory feed store.
///
/// All tables sit behind one `RwLock`. Reads share it; a unit of work holds
/// it exclusively from start to commit, which makes units of work
/// serializable. Constraint checks run under that lock at insert time, so
/// two racing likes for the same `(user, target)` cannot both land.
pub struct InMemoryFeedStore {
    clock: Arc<dyn Clock>,
    inner: RwLock<Tables>,
}

impl InMemoryFeedStore {
    /// Create an empty store stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(Tables::default()),
        }
    }

    /// Rebuild a store from a snapshot, re-checking every constraint.
    ///
    /// This is the only path through which rows keep their original
    /// timestamps, including backdated karma transactions.
    pub fn from_snapshot(snapshot: FeedSnapshot, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedSnapshot(snapshot.version));
        }

        let FeedSnapshot {
            mut users,
            mut posts,
            mut comments,
            mut likes,
            mut karma_transactions,
            ..
        } = snapshot;
        users.sort_by_key(|u| u.id);
        posts.sort_by_key(|p| p.id);
        comments.sort_by_key(|c| c.id);
        likes.sort_by_key(|l| l.id);
        karma_transactions.sort_by_key(|t| t.id);

        let mut tables = Tables::default();
        for user in users {
            tables.put_user(user)?;
        }
        for post in posts {
            tables.put_post(post)?;
        }
        for comment in comments {
            tables.put_comment(comment)?;
        }
        for like in likes {
            tables.put_like(like)?;
        }
        for transaction in karma_transactions {
            tables.check_karma_user(transaction.user_id)?;
            tables.ledger.restore(transaction)?;
        }

        tracing::info!(
            users = tables.users.len(),
            posts = tables.posts.len(),
            comments = tables.comments.len(),
            likes = tables.likes.len(),
            karma_transactions = tables.ledger.len(),
            "feed store restored from snapshot"
        );

        Ok(Self {
            clock,
            inner: RwLock::new(tables),
        })
    }

    /// Copy every table into a snapshot.
    pub fn export(&self) -> FeedSnapshot {
        let tables = self.read_tables();
        FeedSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: self.clock.now(),
            users: tables.users.values().cloned().collect(),
            posts: tables.posts.values().cloned().collect(),
            comments: tables.comments.values().cloned().collect(),
            likes: tables.likes.values().cloned().collect(),
            karma_transactions: tables.ledger.entries().to_vec(),
        }
    }

    // Units of work roll back on unwind, so a poisoned lock still guards
    // consistent tables.
    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryFeedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.read_tables();
        f.debug_struct("InMemoryFeedStore")
            .field("users", &tables.users.len())
            .field("posts", &tables.posts.len())
            .field("comments", &tables.comments.len())
            .field("likes", &tables.likes.len())
            .field("karma_transactions", &tables.ledger.len())
            .finish()
    }
}

impl FeedStore for InMemoryFeedStore {
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreView) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tables = self.read_tables();
        work(&*tables)
    }

    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let now = self.clock.now();
        let mut tables = self.write_tables();
        let mut tx = MemoryTx::begin(&mut *tables, now);

        match work(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(error) => {
                tracing::debug!(writes = tx.undo.len(), "unit of work aborted, rolling back");
                drop(tx);
                Err(error)
            }
        }
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl LedgerReader for InMemoryFeedStore {
    fn read_all(&self) -> Result<Vec<KarmaTransaction>, LedgerError> {
        self.read_tables().ledger.read_all()
    }

    fn read_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<KarmaTransaction>, LedgerError> {
        self.read_tables().ledger.read_since(cutoff)
    }

    fn entry_count(&self) -> Result<u64, LedgerError> {
        self.read_tables().ledger.entry_count()
    }
}

/// Next id to hand out per table.
#[derive(Clone, Copy, Debug)]
struct Sequences {
    user: UserId,
    post: PostId,
    comment: CommentId,
    like: LikeId,
}

impl Default for Sequences {
    fn default() -> Self {
        Self {
            user: UserId::new(1),
            post: PostId::new(1),
            comment: CommentId::new(1),
            like: LikeId::new(1),
        }
    }
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    comments_by_post: HashMap<PostId, Vec<CommentId>>,
    replies: HashMap<CommentId, Vec<CommentId>>,
    likes: BTreeMap<LikeId, Like>,
    like_keys: HashMap<(UserId, LikeTarget), LikeId>,
    likes_by_target: HashMap<LikeTarget, BTreeSet<LikeId>>,
    ledger: KarmaLedger,
    seq: Sequences,
}

impl Tables {
    fn put_user(&mut self, user: User) -> StoreResult<()> {
        let next = user.id.next().ok_or_else(|| ids_exhausted("users", user.id))?;
        if self.users.contains_key(&user.id) {
            return Err(duplicate_key("users_pkey", user.id));
        }
        if self.usernames.contains_key(&user.username) {
            return Err(StoreError::UniqueViolation {
                constraint: USERS_USERNAME_UNIQUE,
                detail: format!("username {:?} is taken", user.username),
            });
        }

        self.seq.user = self.seq.user.max(next);
        self.usernames.insert(user.username.clone(), user.id);
        self.users.insert(user.id, user);
        Ok(())
    }

    fn put_post(&mut self, post: Post) -> StoreResult<()> {
        let next = post.id.next().ok_or_else(|| ids_exhausted("posts", post.id))?;
        if self.posts.contains_key(&post.id) {
            return Err(duplicate_key("posts_pkey", post.id));
        }
        if !self.users.contains_key(&post.author_id) {
            return Err(missing_reference("posts_author_id_fkey", post.author_id));
        }

        self.seq.post = self.seq.post.max(next);
        self.posts.insert(post.id, post);
        Ok(())
    }

    fn put_comment(&mut self, comment: Comment) -> StoreResult<()> {
        let next = comment.id.next().ok_or_else(|| ids_exhausted("comments", comment.id))?;
        if self.comments.contains_key(&comment.id) {
            return Err(duplicate_key("comments_pkey", comment.id));
        }
        if !self.posts.contains_key(&comment.post_id) {
            return Err(missing_reference("comments_post_id_fkey", comment.post_id));
        }
        if !self.users.contains_key(&comment.author_id) {
            return Err(missing_reference("comments_author_id_fkey", comment.author_id));
        }
        if let Some(parent_id) = comment.parent_id {
            let parent = self
                .comments
                .get(&parent_id)
                .ok_or_else(|| missing_reference("comments_parent_id_fkey", parent_id))?;
            if parent.post_id != comment.post_id {
                return Err(StoreError::CheckViolation {
                    constraint: COMMENTS_PARENT_SAME_POST,
                    detail: format!(
                        "parent {parent_id} belongs to {}, reply targets {}",
                        parent.post_id, comment.post_id
                    ),
                });
            }
            self.replies.entry(parent_id).or_default().push(comment.id);
        }

        self.seq.comment = self.seq.comment.max(next);
        self.comments_by_post
            .entry(comment.post_id)
            .or_default()
            .push(comment.id);
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    fn put_like(&mut self, like: Like) -> StoreResult<()> {
        let next = like.id.next().ok_or_else(|| ids_exhausted("likes", like.id))?;
        if self.likes.contains_key(&like.id) {
            return Err(duplicate_key("likes_pkey", like.id));
        }
        if !self.users.contains_key(&like.user_id) {
            return Err(missing_reference("likes_user_id_fkey", like.user_id));
        }
        let target_exists = match like.target {
            LikeTarget::Post(id) => self.posts.contains_key(&id),
            LikeTarget::Comment(id) => self.comments.contains_key(&id),
        };
        if !target_exists {
            let constraint = match like.target {
                LikeTarget::Post(_) => "likes_post_id_fkey",
                LikeTarget::Comment(_) => "likes_comment_id_fkey",
            };
            return Err(missing_reference(constraint, like.target));
        }

        let key = (like.user_id, like.target);
        if self.like_keys.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: LIKES_USER_TARGET_UNIQUE,
                detail: format!("{} already likes {}", like.user_id, like.target),
            });
        }

        self.seq.like = self.seq.like.max(next);
        self.like_keys.insert(key, like.id);
        self.likes_by_target
            .entry(like.target)
            .or_default()
            .insert(like.id);
        self.likes.insert(like.id, like);
        Ok(())
    }

    fn take_like(&mut self, user: UserId, target: LikeTarget) -> Option<Like> {
        let id = self.like_keys.remove(&(user, target))?;
        if let Some(ids) = self.likes_by_target.get_mut(&target) {
            ids.remove(&id);
            if ids.is_empty() {
                self.likes_by_target.remove(&target);
            }
        }
        self.likes.remove(&id)
    }

    fn check_karma_user(&self, user: UserId) -> StoreResult<()> {
        if self.users.contains_key(&user) {
            Ok(())
        } else {
            Err(missing_reference("karma_transactions_user_id_fkey", user))
        }
    }

    fn remove_user(&mut self, id: UserId) {
        if let Some(user) = self.users.remove(&id) {
            self.usernames.remove(&user.username);
        }
    }

    fn remove_post(&mut self, id: PostId) {
        self.posts.remove(&id);
    }

    fn remove_comment(&mut self, id: CommentId) {
        let Some(comment) = self.comments.remove(&id) else {
            return;
        };
        if let Some(ids) = self.comments_by_post.get_mut(&comment.post_id) {
            ids.retain(|c| *c != id);
        }
        if let Some(parent_id) = comment.parent_id {
            if let Some(ids) = self.replies.get_mut(&parent_id) {
                ids.retain(|c| *c != id);
            }
        }
    }

    fn chronological<'a>(&'a self, ids: Option<&'a Vec<CommentId>>) -> Vec<&'a Comment> {
        let mut rows: Vec<&Comment> = ids
            .into_iter()
            .flatten()
            .filter_map(|id| self.comments.get(id))
            .collect();
        rows.sort_by_key(|c| (c.created_at, c.id));
        rows
    }
}

impl StoreView for Tables {
    fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    fn user_by_name(&self, username: &str) -> Option<&User> {
        self.usernames
            .get(username)
            .and_then(|id| self.users.get(id))
    }

    fn users(&self) -> Vec<&User> {
        self.users.values().collect()
    }

    fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id)
    }

    fn posts(&self) -> Vec<&Post> {
        self.posts.values().collect()
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    fn comments_for_post(&self, post: PostId) -> Vec<&Comment> {
        self.chronological(self.comments_by_post.get(&post))
    }

    fn replies_to(&self, comment: CommentId) -> Vec<&Comment> {
        self.chronological(self.replies.get(&comment))
    }

    fn find_like(&self, user: UserId, target: LikeTarget) -> Option<&Like> {
        self.like_keys
            .get(&(user, target))
            .and_then(|id| self.likes.get(id))
    }

    fn like_count(&self, target: LikeTarget) -> u64 {
        self.likes_by_target
            .get(&target)
            .map(|ids| ids.len() as u64)
            .unwrap_or(0)
    }

    fn karma_entries(&self) -> &[KarmaTransaction] {
        self.ledger.entries()
    }
}

enum Undo {
    User(UserId),
    Post(PostId),
    Comment(CommentId),
    LikeInserted(UserId, LikeTarget),
    LikeRemoved(Like),
}

/// One unit of work over exclusively borrowed tables.
///
/// Writes apply in place and are recorded in an undo log. Dropping the unit
/// without committing replays the log backwards.
struct MemoryTx<'a> {
    tables: &'a mut Tables,
    now: DateTime<Utc>,
    seq: Sequences,
    ledger_mark: LedgerMark,
    undo: Vec<Undo>,
    committed: bool,
}

impl<'a> MemoryTx<'a> {
    fn begin(tables: &'a mut Tables, now: DateTime<Utc>) -> Self {
        let seq = tables.seq;
        let ledger_mark = tables.ledger.mark();
        Self {
            tables,
            now,
            seq,
            ledger_mark,
            undo: Vec::new(),
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }

    fn rollback(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::User(id) => self.tables.remove_user(id),
                Undo::Post(id) => self.tables.remove_post(id),
                Undo::Comment(id) => self.tables.remove_comment(id),
                Undo::LikeInserted(user, target) => {
                    self.tables.take_like(user, target);
                }
                Undo::LikeRemoved(like) => {
                    let id = like.id;
                    if let Err(error) = self.tables.put_like(like) {
                        tracing::error!(like = %id, %error, "failed to restore like during rollback");
                    }
                }
            }
        }
        self.tables.ledger.rollback_to(self.ledger_mark);
        self.tables.seq = self.seq;
    }
}

impl Drop for MemoryTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

impl StoreView for MemoryTx<'_> {
    fn user(&self, id: UserId) -> Option<&User> {
        self.tables.user(id)
    }

    fn user_by_name(&self, username: &str) -> Option<&User> {
        self.tables.user_by_name(username)
    }

    fn users(&self) -> Vec<&User> {
        self.tables.users()
    }

    fn post(&self, id: PostId) -> Option<&Post> {
        self.tables.post(id)
    }

    fn posts(&self) -> Vec<&Post> {
        self.tables.posts()
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.tables.comment(id)
    }

    fn comments_for_post(&self, post: PostId) -> Vec<&Comment> {
        self.tables.comments_for_post(post)
    }

    fn replies_to(&self, comment: CommentId) -> Vec<&Comment> {
        self.tables.replies_to(comment)
    }

    fn find_like(&self, user: UserId, target: LikeTarget) -> Option<&Like> {
        self.tables.find_like(user, target)
    }

    fn like_count(&self, target: LikeTarget) -> u64 {
        self.tables.like_count(target)
    }

    fn karma_entries(&self) -> &[KarmaTransaction] {
        self.tables.karma_entries()
    }
}

impl StoreTx for MemoryTx<'_> {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn insert_user(&mut self, username: &str) -> StoreResult<User> {
        let user = User {
            id: self.tables.seq.user,
            username: username.to_string(),
            created_at: self.now,
        };
        self.tables.put_user(user.clone())?;
        self.undo.push(Undo::User(user.id));
        Ok(user)
    }

    fn insert_post(&mut self, post: NewPost) -> StoreResult<Post> {
        let post = Post {
            id: self.tables.seq.post,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: self.now,
            updated_at: self.now,
        };
        self.tables.put_post(post.clone())?;
        self.undo.push(Undo::Post(post.id));
        Ok(post)
    }

    fn insert_comment(&mut self, comment: NewComment) -> StoreResult<Comment> {
        let comment = Comment {
            id: self.tables.seq.comment,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: self.now,
            updated_at: self.now,
        };
        self.tables.put_comment(comment.clone())?;
        self.undo.push(Undo::Comment(comment.id));
        Ok(comment)
    }

    fn insert_like(&mut self, user: UserId, target: LikeTarget) -> StoreResult<Like> {
        let like = Like {
            id: self.tables.seq.like,
            user_id: user,
            target,
            created_at: self.now,
        };
        self.tables.put_like(like.clone())?;
        self.undo.push(Undo::LikeInserted(user, target));
        Ok(like)
    }

    fn delete_like(&mut self, user: UserId, target: LikeTarget) -> StoreResult<Like> {
        let like = self
            .tables
            .take_like(user, target)
            .ok_or_else(|| StoreError::NotFound {
                entity: "like",
                id: format!("{user} -> {target}"),
            })?;
        self.undo.push(Undo::LikeRemoved(like.clone()));
        Ok(like)
    }

    fn append_karma(&mut self, entry: NewKarmaTransaction) -> StoreResult<KarmaTransaction> {
        self.tables.check_karma_user(entry.user_id)?;
        Ok(self.tables.ledger.append(entry, self.now)?)
    }
}

fn duplicate_key(constraint: &'static str, id: impl std::fmt::Display) -> StoreError {
    StoreError::UniqueViolation {
        constraint,
        detail: format!("{id} already exists"),
    }
}

fn ids_exhausted(table: &'static str, id: impl std::fmt::Display) -> StoreError {
    StoreError::IdsExhausted {
        table,
        last: id.to_string(),
    }
}

fn missing_reference(constraint: &'static str, id: impl std::fmt::Display) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint,
        detail: format!("{id} does not exist"),
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Barrier;

    use chrono::{Duration, TimeZone};
    use karmafeed_types::{FixedClock, KarmaSource};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn store_at(clock: Arc<FixedClock>) -> InMemoryFeedStore {
        InMemoryFeedStore::with_clock(clock)
    }

    /// Seed two users and one post by the first.
    fn seeded() -> (InMemoryFeedStore, Arc<FixedClock>, UserId, UserId, PostId) {
        let clock = Arc::new(FixedClock::new(start()));
        let store = store_at(clock.clone());
        let (author, liker, post) = store
            .transact(|tx| {
                let author = tx.insert_user("author")?;
                let liker = tx.insert_user("liker")?;
                let post = tx.insert_post(NewPost {
                    author_id: author.id,
                    title: "Hello".into(),
                    content: "First post".into(),
                })?;
                Ok::<_, StoreError>((author.id, liker.id, post.id))
            })
            .unwrap();
        (store, clock, author, liker, post)
    }

    fn comment_on(post: PostId, parent: Option<CommentId>, author: UserId) -> NewComment {
        NewComment {
            post_id: post,
            parent_id: parent,
            author_id: author,
            content: "comment".into(),
        }
    }

    #[test]
    fn inserted_rows_are_readable() {
        let (store, _, author, _, post) = seeded();
        store
            .read(|view| {
                assert_eq!(view.user(author).unwrap().username, "author");
                assert_eq!(view.user_by_name("liker").unwrap().id, UserId::new(2));
                assert_eq!(view.post(post).unwrap().created_at, start());
                assert_eq!(view.posts().len(), 1);
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (store, _, _, _, _) = seeded();
        let error = store
            .transact(|tx| tx.insert_user("author").map(|_| ()))
            .unwrap_err();
        assert_eq!(error.constraint(), Some(USERS_USERNAME_UNIQUE));
    }

    #[test]
    fn cross_post_parent_is_a_check_violation() {
        let (store, _, author, _, post) = seeded();
        let (other_comment, other_post) = store
            .transact(|tx| {
                let other = tx.insert_post(NewPost {
                    author_id: author,
                    title: "Other".into(),
                    content: "Other content".into(),
                })?;
                let c = tx.insert_comment(comment_on(other.id, None, author))?;
                Ok::<_, StoreError>((c.id, other.id))
            })
            .unwrap();

        let error = store
            .transact(|tx| tx.insert_comment(comment_on(post, Some(other_comment), author)))
            .unwrap_err();
        assert_eq!(error.constraint(), Some(COMMENTS_PARENT_SAME_POST));

        store
            .read(|view| {
                assert!(view.comments_for_post(post).is_empty());
                assert_eq!(view.comments_for_post(other_post).len(), 1);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let next = store
            .transact(|tx| tx.insert_comment(comment_on(post, None, author)))
            .unwrap();
        assert_eq!(next.id, CommentId::new(2));
    }

    #[test]
    fn duplicate_like_is_a_unique_violation() {
        let (store, _, _, liker, post) = seeded();
        store
            .transact(|tx| tx.insert_like(liker, LikeTarget::Post(post)))
            .unwrap();
        let error = store
            .transact(|tx| tx.insert_like(liker, LikeTarget::Post(post)))
            .unwrap_err();
        assert_eq!(error.constraint(), Some(LIKES_USER_TARGET_UNIQUE));
        assert_eq!(
            store
                .read(|view| Ok::<_, StoreError>(view.like_count(LikeTarget::Post(post))))
                .unwrap(),
            1
        );
    }

    #[test]
    fn like_on_missing_target_is_a_foreign_key_violation() {
        let (store, _, _, liker, _) = seeded();
        let error = store
            .transact(|tx| tx.insert_like(liker, LikeTarget::Comment(CommentId::new(40))))
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::ForeignKeyViolation { constraint: "likes_comment_id_fkey", .. }
        ));
    }

    #[test]
    fn failed_unit_of_work_leaves_no_trace() {
        let (store, _, author, liker, post) = seeded();
        let result: Result<(), StoreError> = store.transact(|tx| {
            tx.insert_like(liker, LikeTarget::Post(post))?;
            tx.append_karma(NewKarmaTransaction::credit(author, KarmaSource::PostLike, post.get()))?;
            Err(StoreError::Serialization("boom".into()))
        });
        assert!(result.is_err());

        assert_eq!(store.entry_count().unwrap(), 0);
        store
            .read(|view| {
                assert!(view.find_like(liker, LikeTarget::Post(post)).is_none());
                assert_eq!(view.like_count(LikeTarget::Post(post)), 0);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let like = store
            .transact(|tx| tx.insert_like(liker, LikeTarget::Post(post)))
            .unwrap();
        assert_eq!(like.id, LikeId::new(1));
    }

    #[test]
    fn rollback_restores_deleted_like() {
        let (store, _, _, liker, post) = seeded();
        store
            .transact(|tx| tx.insert_like(liker, LikeTarget::Post(post)))
            .unwrap();

        let result: Result<(), StoreError> = store.transact(|tx| {
            tx.delete_like(liker, LikeTarget::Post(post))?;
            Err(StoreError::Serialization("abort".into()))
        });
        assert!(result.is_err());
        store
            .read(|view| {
                assert!(view.find_like(liker, LikeTarget::Post(post)).is_some());
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn panicking_unit_of_work_is_rolled_back() {
        let (store, _, author, _, post) = seeded();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.transact(|tx| {
                tx.append_karma(NewKarmaTransaction::credit(author, KarmaSource::PostLike, post.get()))?;
                if tx.karma_entries().len() == 1 {
                    panic!("crash mid unit of work");
                }
                Ok::<_, StoreError>(())
            });
        }));
        assert!(outcome.is_err());
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn deleting_missing_like_is_not_found() {
        let (store, _, _, liker, post) = seeded();
        let error = store
            .transact(|tx| tx.delete_like(liker, LikeTarget::Post(post)))
            .unwrap_err();
        assert!(matches!(error, StoreError::NotFound { entity: "like", .. }));
    }

    #[test]
    fn karma_for_unknown_user_is_rejected() {
        let (store, _, _, _, post) = seeded();
        let error = store
            .transact(|tx| {
                tx.append_karma(NewKarmaTransaction::credit(
                    UserId::new(99),
                    KarmaSource::PostLike,
                    post.get(),
                ))
            })
            .unwrap_err();
        assert_eq!(error.constraint(), Some("karma_transactions_user_id_fkey"));
    }

    #[test]
    fn comments_come_back_in_creation_time_order() {
        let (store, clock, author, _, post) = seeded();
        clock.advance(Duration::minutes(10));
        let late = store
            .transact(|tx| tx.insert_comment(comment_on(post, None, author)))
            .unwrap();
        clock.set(start() + Duration::minutes(5));
        let early = store
            .transact(|tx| tx.insert_comment(comment_on(post, None, author)))
            .unwrap();
        let reply = store
            .transact(|tx| tx.insert_comment(comment_on(post, Some(late.id), author)))
            .unwrap();

        store
            .read(|view| {
                let ids: Vec<_> = view.comments_for_post(post).iter().map(|c| c.id).collect();
                assert_eq!(ids, vec![early.id, reply.id, late.id]);
                let replies: Vec<_> = view.replies_to(late.id).iter().map(|c| c.id).collect();
                assert_eq!(replies, vec![reply.id]);
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn concurrent_likes_land_exactly_once() {
        let (store, _, author, liker, post) = seeded();
        let threads = 16;
        let barrier = Barrier::new(threads);

        let successes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        store
                            .transact(|tx| {
                                tx.insert_like(liker, LikeTarget::Post(post))?;
                                tx.append_karma(NewKarmaTransaction::credit(
                                    author,
                                    KarmaSource::PostLike,
                                    post.get(),
                                ))
                            })
                            .is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(successes, 1);
        assert_eq!(store.entry_count().unwrap(), 1);
    }
}
