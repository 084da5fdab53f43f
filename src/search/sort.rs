use crate::api::client::{DaemonClient, ItemPage};
use crate::core::error::{Outcome, ToolError};
use crate::models::file_item::FileItem;
use crate::search::channel::resolve_channel;
use crate::search::item::search_item;
use crate::utils::channels::normalize_channel;
use crate::utils::time::duration_text;
use crate::validation::params::ClaimRef;
use serde_json::json;
use tracing::{debug, info, warn};

/// Large enough to list every local file in one page
const FILE_LIST_PAGE: usize = 99_000;

/// Local files ordered by release time, oldest first unless `reverse`.
/// Old claims without a release time use their block timestamp.
pub async fn sort_items(daemon: &DaemonClient, channel: Option<&str>, reverse: bool) -> Outcome<Vec<FileItem>> {
    let mut params = json!({ "page_size": FILE_LIST_PAGE });

    if let Some(channel) = channel {
        let channel = normalize_channel(channel);
        // file_list does not know a channel until it has been resolved
        resolve_channel(daemon, &channel).await?;
        params["channel_name"] = json!(channel);
    }

    let page: ItemPage<FileItem> = daemon.items("file_list", params).await?;
    let mut items = page.items;

    if items.is_empty() {
        return Err(ToolError::NotFound(match channel {
            Some(ch) => format!("no downloaded items from channel {ch}"),
            None => "no downloaded items".to_string(),
        }));
    }

    for item in items.iter().filter(|i| i.metadata.release_time.is_none()) {
        debug!(claim_name = %item.claim_name, "No release_time, using timestamp");
    }

    items.sort_by_key(FileItem::release_time);
    if reverse {
        items.reverse();
    }

    info!(items = items.len(), "Listed local files");
    Ok(items)
}

/// Local files that no longer resolve online
pub async fn sort_invalid(daemon: &DaemonClient, channel: Option<&str>, reverse: bool) -> Outcome<Vec<FileItem>> {
    let items = sort_items(daemon, channel, reverse).await?;
    let n_items = items.len();
    let mut invalid = Vec::new();

    for (num, item) in items.into_iter().enumerate() {
        match search_item(daemon, &ClaimRef::ClaimId(item.claim_id.clone())).await {
            Ok(_) => {}
            Err(ToolError::NotFound(_)) => {
                warn!(
                    index = num + 1,
                    total = n_items,
                    claim_id = %item.claim_id,
                    claim_name = %item.claim_name,
                    "Claim no longer resolves"
                );
                invalid.push(item);
            }
            Err(e) => return Err(e),
        }
    }

    info!(invalid = invalid.len(), "Invalid items found (possibly deleted from the network)");
    Ok(invalid)
}

/// Local files with their total size and duration
#[derive(Debug, Clone, Default)]
pub struct ItemsSummary {
    pub claims: Vec<FileItem>,
    pub size: u64,
    pub duration: u64,
}

impl ItemsSummary {
    pub fn from_items(claims: Vec<FileItem>) -> Self {
        let size = claims.iter().map(|c| c.metadata.size()).sum();
        let duration = claims.iter().map(|c| c.metadata.duration()).sum();
        Self { claims, size, duration }
    }

    pub fn lines(&self) -> Vec<String> {
        let gib = self.size as f64 / 1024f64.powi(3);
        vec![
            format!("Total unique claims: {}", self.claims.len()),
            format!("Total download size: {gib:.4} GiB"),
            format!("Total duration: {}", duration_text(self.duration)),
        ]
    }
}

/// `sort_items` or `sort_invalid` plus totals; nothing downloaded is an
/// empty summary
pub async fn sort_items_size(
    daemon: &DaemonClient,
    channel: Option<&str>,
    reverse: bool,
    invalid: bool,
) -> Outcome<ItemsSummary> {
    let claims = if invalid {
        sort_invalid(daemon, channel, reverse).await
    } else {
        sort_items(daemon, channel, reverse).await
    };

    match claims {
        Ok(claims) => Ok(ItemsSummary::from_items(claims)),
        Err(ToolError::NotFound(_)) => Ok(ItemsSummary::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ok, FakeServer};
    use serde_json::Value;

    fn file(cid: &str, release: Option<&str>, timestamp: i64) -> Value {
        let mut metadata = json!({"source": {"size": "1073741824"}, "video": {"duration": 3600}});
        if let Some(r) = release {
            metadata["release_time"] = json!(r);
        }
        json!({"claim_id": cid, "claim_name": cid, "timestamp": timestamp, "metadata": metadata})
    }

    #[tokio::test]
    async fn test_sorted_by_release_time() {
        let server = FakeServer::spawn(|_, _| {
            ok(json!({"items": [
                file("b", Some("300"), 1),
                file("a", None, 100),
                file("c", Some("200"), 1)
            ]}))
        })
        .await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();

        let items = sort_items(&daemon, None, false).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.claim_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);

        let items = sort_items(&daemon, None, true).await.unwrap();
        assert_eq!(items[0].claim_id, "b");
    }

    #[tokio::test]
    async fn test_nothing_downloaded() {
        let server = FakeServer::spawn(|_, _| ok(json!({"items": []}))).await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();

        assert!(sort_items(&daemon, None, false).await.unwrap_err().is_not_found());

        let summary = sort_items_size(&daemon, None, false, false).await.unwrap();
        assert!(summary.claims.is_empty());
        assert_eq!(summary.size, 0);
    }

    #[tokio::test]
    async fn test_invalid_items() {
        let server = FakeServer::spawn(|method, params| match method {
            "file_list" => ok(json!({"items": [file("gone", Some("1"), 1), file("here", Some("2"), 2)]})),
            "claim_search" => {
                if params["claim_id"] == "gone" {
                    ok(json!({"items": [], "total_items": 0}))
                } else {
                    ok(json!({"items": [{"claim_id": "here"}], "total_items": 1}))
                }
            }
            _ => ok(Value::Null),
        })
        .await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();

        let invalid = sort_invalid(&daemon, None, false).await.unwrap();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].claim_id, "gone");
    }

    #[test]
    fn test_summary_lines() {
        let items: Vec<FileItem> = vec![
            serde_json::from_value(file("a", Some("1"), 1)).unwrap(),
            serde_json::from_value(file("b", Some("2"), 1)).unwrap(),
        ];
        let summary = ItemsSummary::from_items(items);

        assert_eq!(summary.size, 2 * 1073741824);
        assert_eq!(summary.duration, 7200);
        let lines = summary.lines();
        assert_eq!(lines[0], "Total unique claims: 2");
        assert_eq!(lines[1], "Total download size: 2.0000 GiB");
        assert_eq!(lines[2], "Total duration: 2 h 0 min 0 s, or 0.0833 days");
    }
}
