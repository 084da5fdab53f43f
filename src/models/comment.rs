use crate::models::claim::lenient_string;
use serde::{Deserialize, Serialize};

/// A comment as returned by the comment server
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Comment {
    #[serde(default)]
    pub comment_id: String,
    /// Absent or null for top-level comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub claim_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub channel_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub signing_ts: Option<String>,
    /// Number of direct replies reported by the server
    #[serde(default)]
    pub replies: Option<u32>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub support_amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_fiat: Option<bool>,
    #[serde(default)]
    pub abandoned: Option<bool>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.as_deref().map_or(true, str::is_empty)
    }
}

/// One page of `comment.List`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub items: Option<Vec<Comment>>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_items: Option<i64>,
    #[serde(default)]
    pub total_pages: Option<i64>,
    #[serde(default)]
    pub has_hidden_comments: Option<bool>,
}

/// Result of `channel_sign`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignedData {
    pub signature: String,
    #[serde(deserialize_with = "required_string")]
    pub signing_ts: String,
}

fn required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    lenient_string(deserializer)?.ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

/// Channel information from `comment.GetChannelFromCommentID`
#[derive(Debug, Clone, Deserialize)]
pub struct CommentChannel {
    pub channel_id: String,
    pub channel_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_parent_is_root() {
        let c: Comment = serde_json::from_value(json!({
            "comment_id": "a",
            "parent_id": null,
            "comment": "hi"
        }))
        .unwrap();
        assert!(c.is_root());

        let c: Comment =
            serde_json::from_value(json!({"comment_id": "b", "parent_id": "a"})).unwrap();
        assert!(!c.is_root());
    }

    #[test]
    fn test_page_without_items() {
        let page: CommentPage = serde_json::from_value(json!({"total_items": 0})).unwrap();
        assert!(page.items.is_none());
    }
}
