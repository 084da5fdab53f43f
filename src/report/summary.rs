use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::models::file_item::FileItem;
use crate::search::channel::{find_channel, ChannelForm, UNKNOWN_CHANNEL};
use crate::search::sort::{sort_invalid, sort_items};
use crate::utils::pool::run_bounded;
use crate::utils::time::format_local;
use crate::validation::params::{ClaimRef, ShowFilter};
use tracing::{debug, info};

const TFMT_ITEM: &str = "%Y%m%d_%H:%M:%S%z";

/// Columns of `print_items`
#[derive(Debug, Clone)]
pub struct ItemOptions {
    pub show: ShowFilter,
    pub title: bool,
    pub typ: bool,
    pub path: bool,
    pub cid: bool,
    pub blobs: bool,
    pub ch: bool,
    /// Look the channel up online instead of in the local record
    pub ch_online: bool,
    pub name: bool,
    pub start: usize,
    pub end: usize,
    /// Only items whose channel contains this text
    pub channel: Option<String>,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            show: ShowFilter::All,
            title: false,
            typ: false,
            path: false,
            cid: true,
            blobs: true,
            ch: false,
            ch_online: true,
            name: true,
            start: 1,
            end: 0,
            channel: None,
        }
    }
}

impl ShowFilter {
    pub fn keeps(self, item: &FileItem) -> bool {
        let has_path = item.download_path.is_some();
        match self {
            ShowFilter::All => true,
            ShowFilter::Media => has_path,
            ShowFilter::Missing => !has_path,
            ShowFilter::Incomplete => item.blobs_completed != item.blobs_in_stream,
            ShowFilter::Full => item.blobs_completed >= item.blobs_in_stream,
        }
    }
}

/// One line per local file that passes the filter
pub async fn print_items(session: &Session, items: &[FileItem], opts: &ItemOptions) -> Outcome<Vec<String>> {
    let n_items = items.len();
    let mut lines = Vec::new();

    for (num, item) in items.iter().enumerate() {
        let it = num + 1;
        if it < opts.start {
            continue;
        }
        if opts.end != 0 && it > opts.end {
            break;
        }
        if !opts.show.keeps(item) {
            continue;
        }

        let mut out = format!("{it:4}/{n_items:4}, {}, ", format_local(item.release_time(), TFMT_ITEM));

        if opts.title {
            out.push_str(&format!("{}, ", item.metadata.title.as_deref().unwrap_or("(None)")));
        }
        if opts.typ {
            out.push_str(&format!("{}, ", item.metadata.stream_type.as_deref().unwrap_or("_")));
        }
        if opts.path {
            let path = item
                .download_path
                .as_ref()
                .map_or_else(|| "None".to_string(), |p| p.display().to_string());
            out.push_str(&format!("{path}, "));
        }
        if opts.cid {
            out.push_str(&format!("{}, ", item.claim_id));
        }
        if opts.blobs {
            out.push_str(&format!("{:3}/{:3}, ", item.blobs_completed, item.blobs_in_stream));
        }
        if opts.ch || opts.channel.is_some() {
            let channel = if opts.ch_online {
                match find_channel(&session.daemon, &ClaimRef::ClaimId(item.claim_id.clone()), ChannelForm::Full, false).await {
                    Ok(channel) => channel,
                    Err(ToolError::NotFound(reason)) => {
                        debug!(claim_id = %item.claim_id, reason, "Channel not found online");
                        "_None_".to_string()
                    }
                    Err(e) => return Err(e),
                }
            } else {
                item.channel_name.clone().unwrap_or_else(|| "_None_".to_string())
            };

            if let Some(wanted) = &opts.channel {
                if !channel.contains(wanted.as_str()) {
                    continue;
                }
            }
            out.push_str(&format!("{channel}, "));
        }
        if opts.name {
            out.push_str(&format!("{}, ", item.claim_name));
        }
        out.push_str(if item.download_path.is_some() { "media" } else { "missing" });

        lines.push(out);
    }

    Ok(lines)
}

/// `print_items` over every downloaded claim, or over the ones that no
/// longer resolve with `invalid`
pub async fn print_summary(session: &Session, opts: &ItemOptions, invalid: bool, reverse: bool) -> Outcome<Vec<String>> {
    let items = if invalid {
        sort_invalid(&session.daemon, None, reverse).await?
    } else {
        sort_items(&session.daemon, None, reverse).await?
    };

    // Invalid claims only have a channel in the local record
    let mut opts = opts.clone();
    if invalid {
        opts.ch_online = false;
    }

    print_items(session, &items, &opts).await
}

#[derive(Debug, Clone)]
pub struct ChannelListOptions {
    pub form: ChannelForm,
    pub invalid: bool,
    /// One line with every channel instead of three columns
    pub simple: bool,
    pub pre_num: bool,
    pub sep: String,
}

impl Default for ChannelListOptions {
    fn default() -> Self {
        Self {
            form: ChannelForm::Full,
            invalid: false,
            simple: false,
            pre_num: true,
            sep: ";".to_string(),
        }
    }
}

/// Unique, sorted channels of the downloaded claims
pub async fn find_channels(session: &Session, invalid: bool, form: ChannelForm) -> Outcome<Vec<String>> {
    let items = if invalid {
        sort_invalid(&session.daemon, None, false).await?
    } else {
        sort_items(&session.daemon, None, false).await?
    };

    let cids: Vec<String> = items.into_iter().map(|i| i.claim_id).collect();
    let task_session = session.clone();
    let slots = run_bounded(cids, session.config.peers.claim_threads, move |cid: String| {
        let session = task_session.clone();
        async move {
            find_channel(&session.daemon, &ClaimRef::ClaimId(cid), form, invalid)
                .await
                .ok()
        }
    })
    .await;

    let mut channels: Vec<String> = slots
        .into_iter()
        .flatten()
        .flatten()
        .filter(|ch| ch != UNKNOWN_CHANNEL)
        .collect();
    channels.sort();
    channels.dedup();

    if channels.is_empty() {
        return Err(ToolError::NotFound(
            "no channels could be determined; claims may be invalid or their channels unresolved".to_string(),
        ));
    }

    info!(channels = channels.len(), "Channels found");
    Ok(channels)
}

/// Channels three per line, numbered by the index of the first one
pub fn three_columns(channels: &[String], pre_num: bool, sep: &str) -> Vec<String> {
    let last = channels.len().saturating_sub(1);

    channels
        .chunks(3)
        .enumerate()
        .map(|(row, chunk)| {
            let cells: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(col, ch)| {
                    let index = row * 3 + col;
                    let cell = if index == last { ch.clone() } else { format!("{ch}{sep}") };
                    format!("{cell:33}")
                })
                .collect();

            let line = cells.join(" ").trim_end().to_string();
            if pre_num {
                format!("{:3}: {line}", row * 3 + 1)
            } else {
                line
            }
        })
        .collect()
}

pub async fn list_channels(session: &Session, opts: &ChannelListOptions) -> Outcome<Vec<String>> {
    // Invalid claims can only be looked up locally
    let channels = find_channels(session, opts.invalid, opts.form).await?;

    let mut lines = vec![format!("Channels found: {}", channels.len()), "-".repeat(80)];
    if opts.simple {
        lines.push(channels.join(&format!("{} ", opts.sep)));
    } else {
        lines.extend(three_columns(&channels, opts.pre_num, &opts.sep));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_session;
    use crate::testing::{ok, FakeServer};
    use serde_json::{json, Value};

    fn item(cid: &str, path: Option<&str>, done: u64, total: u64) -> FileItem {
        serde_json::from_value(json!({
            "claim_id": cid,
            "claim_name": format!("name-{cid}"),
            "download_path": path,
            "blobs_completed": done,
            "blobs_in_stream": total,
            "channel_name": "@local",
            "metadata": {"release_time": "1600000000"}
        }))
        .unwrap()
    }

    #[test]
    fn test_filters() {
        let with_media = item("a", Some("/m/a.mp4"), 3, 3);
        let partial = item("b", None, 1, 3);

        assert!(ShowFilter::Media.keeps(&with_media));
        assert!(!ShowFilter::Media.keeps(&partial));
        assert!(ShowFilter::Missing.keeps(&partial));
        assert!(ShowFilter::Incomplete.keeps(&partial));
        assert!(!ShowFilter::Incomplete.keeps(&with_media));
        assert!(ShowFilter::Full.keeps(&with_media));
        assert!(ShowFilter::All.keeps(&partial));
    }

    #[tokio::test]
    async fn test_item_lines() {
        let server = FakeServer::spawn(|_, _| ok(Value::Null)).await;
        let session = test_session(&server.url);
        let items = vec![item("a", Some("/m/a.mp4"), 3, 3), item("b", None, 1, 3)];

        let opts = ItemOptions {
            show: ShowFilter::Incomplete,
            ch: true,
            ch_online: false,
            ..Default::default()
        };
        let lines = print_items(&session, &items, &opts).await.unwrap();

        assert_eq!(lines.len(), 1);
        let stamp = format_local(1600000000, TFMT_ITEM);
        assert_eq!(lines[0], format!("   2/   2, {stamp}, b,   1/  3, @local, name-b, missing"));
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn test_channel_filter() {
        let server = FakeServer::spawn(|_, _| ok(Value::Null)).await;
        let session = test_session(&server.url);
        let items = vec![item("a", None, 1, 1)];

        let opts = ItemOptions {
            ch_online: false,
            channel: Some("@other".to_string()),
            ..Default::default()
        };
        assert!(print_items(&session, &items, &opts).await.unwrap().is_empty());
    }

    #[test]
    fn test_three_columns() {
        let channels: Vec<String> = ["@a", "@b", "@c", "@d"].iter().map(|s| s.to_string()).collect();
        let lines = three_columns(&channels, true, ";");

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("  1: {:33} {:33} {}", "@a;", "@b;", "@c;"));
        assert_eq!(lines[1], "  4: @d");

        let lines = three_columns(&channels[..3], false, ";");
        assert_eq!(lines, vec![format!("{:33} {:33} @c", "@a;", "@b;")]);
    }

    #[tokio::test]
    async fn test_list_channels_unique_sorted() {
        let server = FakeServer::spawn(|method, params| match method {
            "file_list" => ok(json!({"items": [
                {"claim_id": "1", "claim_name": "x", "metadata": {"release_time": "1"}},
                {"claim_id": "2", "claim_name": "y", "metadata": {"release_time": "2"}},
                {"claim_id": "3", "claim_name": "z", "metadata": {"release_time": "3"}}
            ]})),
            "claim_search" => {
                let channel = if params["claim_id"] == "2" { "@zed#2" } else { "@alpha#1" };
                ok(json!({"items": [{
                    "claim_id": params["claim_id"],
                    "signing_channel": {"claim_id": "1", "canonical_url": format!("lbry://{channel}")}
                }]}))
            }
            _ => ok(Value::Null),
        })
        .await;
        let session = test_session(&server.url);

        let channels = find_channels(&session, false, ChannelForm::Full).await.unwrap();
        assert_eq!(channels, vec!["@alpha#1", "@zed#2"]);

        let opts = ChannelListOptions {
            simple: true,
            ..Default::default()
        };
        let lines = list_channels(&session, &opts).await.unwrap();
        assert_eq!(lines[0], "Channels found: 2");
        assert_eq!(lines[2], "@alpha#1; @zed#2");
    }
}
