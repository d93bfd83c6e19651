use std::collections::HashMap;
use std::fmt;

use karmafeed_store::{NewComment, StoreTx, StoreView, COMMENTS_PARENT_SAME_POST};
use karmafeed_types::{Comment, CommentId, PostId, UserId};
use serde::Serialize;

use crate::error::FeedError;
use crate::likes::require_user;

/// A comment with its replies, each level ordered by creation time.
///
/// Reply chains have no depth limit. Walks over a node, including `Drop`,
/// use an explicit stack.
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// This comment plus all of its descendants.
    pub fn comment_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first iterator over this comment and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &Comment> + '_ {
        self.walk().map(|(_, comment)| comment)
    }

    /// Depth-first iterator yielding each comment with its depth below this
    /// node (0 for the node itself).
    pub fn walk(&self) -> impl Iterator<Item = (usize, &Comment)> + '_ {
        let mut stack = vec![(0, self)];
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.replies.iter().rev().map(|reply| (depth + 1, reply)));
            Some((depth, &node.comment))
        })
    }

    /// The tree as a flat pre-order list, ready to serialize.
    pub fn entries(&self) -> Vec<ThreadEntry> {
        self.walk()
            .map(|(depth, comment)| ThreadEntry {
                depth,
                comment: comment.clone(),
            })
            .collect()
    }
}

impl fmt::Debug for CommentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentNode")
            .field("comment", &self.comment.id)
            .field("replies", &self.replies.len())
            .finish()
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// One row of a flattened thread. `depth` is 0 for top-level comments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadEntry {
    pub depth: usize,
    pub comment: Comment,
}

/// Nested comments whose replies never leave their post.
///
/// Cycles cannot form: a parent must already exist when its reply is
/// written, so a parent is always strictly older than its replies.
pub struct CommentTree;

impl CommentTree {
    /// Precondition for a reply: `parent` must belong to `post`.
    pub fn validate_parent(post: PostId, parent: &Comment) -> Result<(), FeedError> {
        if parent.post_id == post {
            Ok(())
        } else {
            Err(FeedError::InvalidParent {
                parent: parent.id,
                parent_post: parent.post_id,
                post,
            })
        }
    }

    pub fn create_comment(
        tx: &mut dyn StoreTx,
        post: PostId,
        parent: Option<CommentId>,
        author: UserId,
        content: &str,
    ) -> Result<Comment, FeedError> {
        if content.trim().is_empty() {
            return Err(FeedError::Validation("comment content must not be empty".into()));
        }
        if tx.post(post).is_none() {
            return Err(FeedError::not_found("post", post));
        }
        require_user(&*tx, author)?;
        if let Some(parent_id) = parent {
            let parent = tx
                .comment(parent_id)
                .ok_or_else(|| FeedError::not_found("comment", parent_id))?;
            Self::validate_parent(post, parent)?;
        }

        tx.insert_comment(NewComment {
            post_id: post,
            parent_id: parent,
            author_id: author,
            content: content.to_string(),
        })
        .map_err(|error| match (error.constraint(), parent) {
            (Some(COMMENTS_PARENT_SAME_POST), Some(parent_id)) => FeedError::InvalidParent {
                parent: parent_id,
                parent_post: tx
                    .comment(parent_id)
                    .map(|c| c.post_id)
                    .unwrap_or(post),
                post,
            },
            _ => error.into(),
        })
    }

    /// Every comment on `post` as a forest of top-level comments.
    pub fn thread<V: StoreView + ?Sized>(view: &V, post: PostId) -> Result<Vec<CommentNode>, FeedError> {
        if view.post(post).is_none() {
            return Err(FeedError::not_found("post", post));
        }
        let mut children = group_by_parent(view.comments_for_post(post));
        Ok(build_forest(&mut children, None))
    }

    /// A whole thread as one flat pre-order list.
    pub fn flatten(nodes: &[CommentNode]) -> Vec<ThreadEntry> {
        nodes.iter().flat_map(CommentNode::entries).collect()
    }

    /// The tree rooted at one comment.
    pub fn subtree<V: StoreView + ?Sized>(view: &V, root: CommentId) -> Result<CommentNode, FeedError> {
        let comment = view
            .comment(root)
            .ok_or_else(|| FeedError::not_found("comment", root))?;
        let mut children = group_by_parent(view.comments_for_post(comment.post_id));
        Ok(CommentNode {
            comment: comment.clone(),
            replies: build_forest(&mut children, Some(root)),
        })
    }
}

/// Buckets comments by parent, keeping the chronological order they came in.
fn group_by_parent(comments: Vec<&Comment>) -> HashMap<Option<CommentId>, Vec<&Comment>> {
    let mut children: HashMap<Option<CommentId>, Vec<&Comment>> = HashMap::new();
    for comment in comments {
        children.entry(comment.parent_id).or_default().push(comment);
    }
    children
}

/// A comment whose replies are still being assembled.
struct Frame<'a> {
    comment: Option<&'a Comment>,
    pending: std::vec::IntoIter<&'a Comment>,
    built: Vec<CommentNode>,
}

impl<'a> Frame<'a> {
    fn new(comment: Option<&'a Comment>, replies: Vec<&'a Comment>) -> Self {
        Self {
            comment,
            pending: replies.into_iter(),
            built: Vec::new(),
        }
    }
}

/// Builds the forest under `root` depth-first, finishing each node once all
/// of its replies are built.
fn build_forest(
    children: &mut HashMap<Option<CommentId>, Vec<&Comment>>,
    root: Option<CommentId>,
) -> Vec<CommentNode> {
    let top = children.remove(&root).unwrap_or_default();
    let mut stack = vec![Frame::new(None, top)];

    while let Some(frame) = stack.last_mut() {
        if let Some(next) = frame.pending.next() {
            let replies = children.remove(&Some(next.id)).unwrap_or_default();
            stack.push(Frame::new(Some(next), replies));
            continue;
        }

        let Some(done) = stack.pop() else { break };
        match (done.comment, stack.last_mut()) {
            (Some(comment), Some(parent)) => parent.built.push(CommentNode {
                comment: comment.clone(),
                replies: done.built,
            }),
            _ => return done.built,
        }
    }
    Vec::new()
}
