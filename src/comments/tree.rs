use crate::models::comment::Comment;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A comment with its direct replies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub sub_replies: Vec<CommentNode>,
}

impl CommentNode {
    fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            sub_replies: Vec::new(),
        }
    }

    /// This node plus all its descendants
    pub fn count(&self) -> usize {
        1 + self.sub_replies.iter().map(CommentNode::count).sum::<usize>()
    }
}

/// Comments of one claim arranged by reply depth
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentTree {
    /// Top-level comments in fetch order, each holding its replies
    pub root_comments: Vec<CommentNode>,
    /// Every reply in fetch order, including orphans
    pub replies: Vec<Comment>,
    /// Level 1 holds the roots, level n+1 the replies to level n
    pub levels: BTreeMap<usize, Vec<Comment>>,
}

impl CommentTree {
    pub fn total(&self) -> usize {
        self.levels.get(&1).map_or(0, Vec::len) + self.replies.len()
    }

    /// Replies that could not be attached because their parent is missing
    pub fn orphans(&self) -> usize {
        let placed: usize = self
            .levels
            .iter()
            .filter(|(level, _)| **level > 1)
            .map(|(_, comments)| comments.len())
            .sum();
        self.replies.len() - placed
    }
}

/// Arrange a flat page of comments into reply trees.
///
/// A reply lands on level n+1 when its parent is on level n. Each reply is
/// placed at most once, so duplicate ids and reply cycles cannot loop.
/// Replies whose parent is not in `items` stay only in `replies`.
pub fn build_tree(items: Vec<Comment>) -> CommentTree {
    let (roots, replies): (Vec<Comment>, Vec<Comment>) =
        items.into_iter().partition(Comment::is_root);

    let mut levels: BTreeMap<usize, Vec<Comment>> = BTreeMap::new();
    let mut placed = vec![false; replies.len()];
    let mut current = roots;
    let mut depth = 1;

    loop {
        let mut next: Vec<Comment> = Vec::new();
        {
            let parent_ids: HashSet<&str> =
                current.iter().map(|c| c.comment_id.as_str()).collect();

            for (i, reply) in replies.iter().enumerate() {
                if placed[i] {
                    continue;
                }
                if reply.parent_id.as_deref().is_some_and(|p| parent_ids.contains(p)) {
                    placed[i] = true;
                    next.push(reply.clone());
                }
            }
        }

        levels.insert(depth, current);
        if next.is_empty() {
            break;
        }

        current = next;
        depth += 1;
    }

    let root_comments = link_levels(&levels);

    CommentTree {
        root_comments,
        replies,
        levels,
    }
}

/// Attach every level to the one above, deepest first
fn link_levels(levels: &BTreeMap<usize, Vec<Comment>>) -> Vec<CommentNode> {
    let mut below: Vec<CommentNode> = Vec::new();

    for comments in levels.values().rev() {
        let mut nodes: Vec<CommentNode> = comments.iter().cloned().map(CommentNode::leaf).collect();

        // With duplicate ids the first comment wins
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, c) in comments.iter().enumerate() {
            index.entry(c.comment_id.as_str()).or_insert(i);
        }

        for child in below {
            let parent = child.comment.parent_id.as_deref().and_then(|p| index.get(p));
            if let Some(&i) = parent {
                nodes[i].sub_replies.push(child);
            }
        }

        below = nodes;
    }

    below
}
