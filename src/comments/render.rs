use crate::comments::tree::CommentNode;
use crate::models::comment::Comment;
use crate::utils::text::{first_line, sanitize_text};

/// Characters of a comment shown when not printing in full
pub const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Descend into replies; otherwise only top-level comments are shown
    pub sub_replies: bool,
    /// Show the whole text instead of a one-line preview
    pub full: bool,
    pub sanitize: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            sub_replies: true,
            full: false,
            sanitize: false,
        }
    }
}

/// One line per comment, replies indented two spaces per level
pub fn render_comments(roots: &[CommentNode], opts: &RenderOptions) -> Vec<String> {
    let mut lines = Vec::new();
    render_level(roots, opts, 0, &mut lines);
    lines
}

fn render_level(nodes: &[CommentNode], opts: &RenderOptions, indent: usize, lines: &mut Vec<String>) {
    let n = nodes.len();

    for (num, node) in nodes.iter().enumerate() {
        lines.push(format!(
            "{}{:2}/{:2}; {:30}; \"{}\"",
            " ".repeat(indent),
            num + 1,
            n,
            author(&node.comment),
            comment_text(&node.comment.comment, opts)
        ));

        if opts.sub_replies && !node.sub_replies.is_empty() {
            render_level(&node.sub_replies, opts, indent + 2, lines);
        }
    }
}

/// `@name#abc` from the channel URL, first three characters of the claim id
pub fn author(comment: &Comment) -> String {
    let url = comment.channel_url.as_deref().unwrap_or("lbry://_Unknown_#000");
    let url = url.strip_prefix("lbry://").unwrap_or(url);

    match url.split_once('#') {
        Some((name, id)) => format!("{name}#{}", id.chars().take(3).collect::<String>()),
        None => url.to_string(),
    }
}

fn comment_text(text: &str, opts: &RenderOptions) -> String {
    let text = if opts.sanitize {
        sanitize_text(text)
    } else {
        text.to_string()
    };

    if opts.full {
        text
    } else {
        first_line(&text, PREVIEW_CHARS)
    }
}
