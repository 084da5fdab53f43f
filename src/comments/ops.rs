use crate::comments::render::{render_comments, RenderOptions};
use crate::comments::tree::{build_tree, CommentTree};
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::models::claim::Claim;
use crate::models::comment::{Comment, CommentChannel, CommentPage, SignedData};
use crate::search::item::search_item;
use crate::utils::time::{format_local, format_utc, TFMT};
use crate::validation::params::ClaimRef;
use serde_json::json;
use tracing::{debug, info};

/// Paging and filtering for `comment.List`
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub page: u32,
    pub page_size: u32,
    /// Only hidden comments; ignored when `visible` is also set
    pub hidden: bool,
    /// Only visible comments; ignored when `hidden` is also set
    pub visible: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 999,
            hidden: false,
            visible: false,
        }
    }
}

/// The comments of one claim plus the header shown above them
#[derive(Debug, Clone)]
pub struct CommentListing {
    pub claim: Claim,
    pub server: String,
    pub tree: CommentTree,
}

impl CommentListing {
    pub fn header_lines(&self) -> Vec<String> {
        let release = match self.claim.value.release_time {
            Some(ts) => format_local(ts, TFMT),
            None => "0".to_string(),
        };

        let mut lines = vec![
            format!("canonical_url: {}", self.claim.canonical_url.as_deref().unwrap_or_default()),
            format!("claim_id: {}", self.claim.claim_id),
            format!("release_time: {release}"),
            format!("title: {}", self.claim.value.title.as_deref().unwrap_or("(None)")),
            format!("comment server: {}", self.server),
            "-".repeat(80),
            format!("Total comments: {}", self.tree.total()),
            format!("Total base comments: {}", self.tree.root_comments.len()),
            format!("Total replies: {}", self.tree.replies.len()),
        ];

        for (level, comments) in self.tree.levels.iter().filter(|(level, _)| **level > 1) {
            lines.push(format!(" - Level {level} replies: {}", comments.len()));
        }
        lines
    }

    /// Header followed by the rendered comment tree
    pub fn lines(&self, opts: &RenderOptions) -> Vec<String> {
        let mut lines = self.header_lines();
        lines.extend(render_comments(&self.tree.root_comments, opts));
        lines
    }
}

/// Fetch the comments of a claim and arrange them by reply level
pub async fn list_comments(session: &Session, claim: &ClaimRef, opts: &ListOptions) -> Outcome<CommentListing> {
    let claim = search_item(&session.daemon, claim).await?;

    let params = if opts.hidden ^ opts.visible {
        json!({
            "claim_id": claim.claim_id,
            "visible": opts.visible,
            "hidden": opts.hidden,
            "page": opts.page,
            "page_size": opts.page_size,
        })
    } else {
        json!({
            "claim_id": claim.claim_id,
            "page": opts.page,
            "page_size": opts.page_size,
            "top_level": false,
            "sort_by": 3,
        })
    };

    let page: CommentPage = session.comments.call("comment.List", params).await?;

    // `items` is sometimes missing even when `total_items` is positive
    let items = if page.total_items.unwrap_or(0) < 1 {
        Vec::new()
    } else {
        page.items.unwrap_or_default()
    };

    debug!(claim_id = %claim.claim_id, comments = items.len(), "Fetched comments");

    Ok(CommentListing {
        claim,
        server: session.comments.endpoint().to_string(),
        tree: build_tree(items),
    })
}

/// Sign `data` with the private key of a channel held by the wallet
pub async fn sign_data(session: &Session, data: &str, channel: &str) -> Outcome<SignedData> {
    let channel_name = if channel.starts_with('@') {
        channel.to_string()
    } else {
        format!("@{channel}")
    };

    let signed = session
        .daemon
        .call(
            "channel_sign",
            json!({
                "channel_name": channel_name,
                "hexdata": hex::encode(data.as_bytes()),
                "wallet_id": session.wallet_id(),
            }),
        )
        .await?;
    Ok(signed)
}

/// Publish a comment on a claim, signed by one of our channels
pub async fn create_comment(
    session: &Session,
    text: &str,
    claim: &ClaimRef,
    author: &ClaimRef,
    parent_id: Option<&str>,
) -> Outcome<Comment> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ToolError::InvalidInput("comment text is empty".to_string()));
    }

    let target = search_item(&session.daemon, claim).await?;
    let channel = search_item(&session.daemon, author).await?;

    let signed = sign_data(session, text, &channel.name).await?;

    let mut params = json!({
        "comment": text,
        "claim_id": target.claim_id,
        "channel_id": channel.claim_id,
        "channel_name": channel.name,
        "signature": signed.signature,
        "signing_ts": signed.signing_ts,
    });
    if let Some(parent) = parent_id.filter(|p| !p.is_empty()) {
        params["parent_id"] = json!(parent);
    }

    let created: Comment = session.comments.call("comment.Create", params).await?;
    info!(
        comment_id = %created.comment_id,
        claim_id = %target.claim_id,
        channel = %channel.name,
        "Comment created"
    );
    Ok(created)
}

/// Owner channel of a comment, and a signature over `text` or, when there
/// is no text, over the comment id
async fn channel_and_sign(session: &Session, comment_id: &str, text: Option<&str>) -> Outcome<(CommentChannel, SignedData)> {
    let channel: CommentChannel = session
        .comments
        .call("comment.GetChannelFromCommentID", json!({ "comment_id": comment_id }))
        .await?;

    let signed = sign_data(session, text.unwrap_or(comment_id), &channel.channel_name).await?;
    Ok((channel, signed))
}

/// Replace the text of an existing comment
pub async fn update_comment(session: &Session, text: &str, comment_id: &str) -> Outcome<Comment> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ToolError::InvalidInput("comment text is empty".to_string()));
    }

    let (channel, signed) = channel_and_sign(session, comment_id, Some(text)).await?;

    let edited: Comment = session
        .comments
        .call(
            "comment.Edit",
            json!({
                "comment_id": comment_id,
                "comment": text,
                "channel_id": channel.channel_id,
                "channel_name": channel.channel_name,
                "signature": signed.signature,
                "signing_ts": signed.signing_ts,
            }),
        )
        .await?;

    info!(comment_id, channel = %channel.channel_name, "Comment updated");
    Ok(edited)
}

/// Remove a comment we authored
pub async fn abandon_comment(session: &Session, comment_id: &str) -> Outcome<Comment> {
    let (channel, signed) = channel_and_sign(session, comment_id, None).await?;

    let abandoned: Comment = session
        .comments
        .call(
            "comment.Abandon",
            json!({
                "comment_id": comment_id,
                "channel_id": channel.channel_id,
                "channel_name": channel.channel_name,
                "signature": signed.signature,
                "signing_ts": signed.signing_ts,
            }),
        )
        .await?;

    info!(comment_id, channel = %channel.channel_name, "Comment abandoned");
    Ok(abandoned)
}

/// Fields of a created, edited or abandoned comment, one per line
pub fn comment_result_lines(c: &Comment) -> Vec<String> {
    fn opt<T: ToString>(v: &Option<T>) -> String {
        v.as_ref().map_or_else(|| "(None)".to_string(), ToString::to_string)
    }

    let timestamp = c.timestamp.map_or_else(|| "(None)".to_string(), |ts| format_utc(ts, TFMT));

    vec![
        format!("claim_id: {}", opt(&c.claim_id)),
        format!("timestamp:  {timestamp}"),
        format!("signing_ts: {}", opt(&c.signing_ts)),
        format!("comment author: {}", opt(&c.channel_name)),
        format!("comment author ID: {}", opt(&c.channel_id)),
        format!("comment_id: {}", c.comment_id),
        format!("parent_id:  {}", opt(&c.parent_id)),
        format!("currency: {}", opt(&c.currency)),
        format!("support_amount: {}", opt(&c.support_amount)),
        format!("is_fiat: {}", opt(&c.is_fiat)),
        format!("is_hidden: {}", c.is_hidden),
        format!("is_pinned: {}", c.is_pinned),
        format!("abandoned: {}", opt(&c.abandoned)),
        "comment:".to_string(),
        "'''".to_string(),
        c.comment.clone(),
        "'''".to_string(),
    ]
}
