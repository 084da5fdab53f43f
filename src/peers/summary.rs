use crate::models::peer::{MultiChannelAggregate, PeerAggregate, StreamLookup, StreamPeers};
use crate::utils::text::sanitize_text;
use crate::utils::time::{duration_text, format_local, format_utc, hms, TFMT, TFMT_SHORT};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const BLANK: &str = "________";

/// Fields shown for each claim of a peer search
#[derive(Debug, Clone)]
pub struct LineOptions {
    pub cid: bool,
    /// Value type and stream type columns
    pub typ: bool,
    /// Show the title instead of the claim name
    pub title: bool,
    pub sanitize: bool,
    /// Local time zone instead of UTC in one-line summaries
    pub local_time: bool,
    pub sep: String,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            cid: false,
            typ: true,
            title: false,
            sanitize: false,
            local_time: false,
            sep: ";".to_string(),
        }
    }
}

/// One stream as a line, or as a paragraph when `inline` is false
pub fn claim_summary(info: &StreamPeers, opts: &LineOptions, inline: bool) -> Vec<String> {
    let stream = &info.stream;
    let sep = &opts.sep;
    let fmt = if inline { TFMT_SHORT } else { TFMT };

    let stamp = |t: i64| {
        if inline && opts.local_time {
            format_local(t, fmt)
        } else {
            format_utc(t, fmt)
        }
    };
    let release = stream.value.release_time.filter(|t| *t != 0).map(|t| stamp(t));
    let created = stamp(stream.meta.creation_timestamp.unwrap_or(0));

    let title = stream.value.title.clone().unwrap_or_else(|| "(no title)".to_string());
    let mut name = if opts.title {
        stream.value.title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| stream.name.clone())
    } else {
        stream.name.clone()
    };
    let title = if opts.sanitize {
        name = sanitize_text(&name);
        sanitize_text(&title)
    } else {
        title
    };

    let vtype = stream.value_type.as_deref().unwrap_or(BLANK);
    let stream_type = stream.value.stream_type.as_deref().unwrap_or(BLANK);
    let (mi, sec) = (info.duration / 60, info.duration % 60);
    let size_mb = info.size as f64 / MIB;
    let n_user = info.peers_user.len();
    let n_tracker = info.peers_tracker.len();

    if !inline {
        return vec![
            format!("canonical_url: {}", stream.canonical_url.as_deref().unwrap_or_default()),
            format!("claim_id: {}", stream.claim_id),
            format!("title: {title}"),
            format!("release_time:  {}", release.as_deref().unwrap_or(BLANK)),
            format!("creation_time: {created}"),
            format!("value_type: {vtype}"),
            format!("stream_type: {stream_type}"),
            format!("size: {size_mb:.4} MB"),
            format!("duration: {mi} min {sec} s"),
            format!("sd_hash: {}", stream.sd_hash().unwrap_or(BLANK)),
            format!("user peers: {n_user}"),
            format!("tracker peers: {n_tracker}"),
            format!("locally hosted: {}", info.local_node),
        ];
    }

    let mut line = format!("{}{sep} ", release.unwrap_or(created));
    if opts.cid {
        line += &format!("{}{sep} ", stream.claim_id);
    }
    if opts.typ {
        line += &format!("{vtype:10}{sep} {stream_type:9}{sep} ");
    }
    line += &format!(
        "{mi:3}:{sec:02}{sep} {size_mb:9.4} MB{sep} peers: {n_user:2} ({n_tracker:2}){sep} hosted: {:5}{sep} \"{name}\"",
        info.local_node.to_string()
    );
    vec![line]
}

/// Every claim of a search, numbered; paragraphs are separated by a blank
/// line
pub fn claims_lines(agg: &PeerAggregate, opts: &LineOptions, inline: bool) -> Vec<String> {
    let n = agg.n_claims;
    let sep = &opts.sep;
    let mut out = Vec::new();

    for (num, lookup) in agg.streams_info.iter().enumerate() {
        let num = num + 1;
        let text = match lookup {
            StreamLookup::Found(info) => claim_summary(info, opts, inline),
            StreamLookup::Unresolved { original } => vec![format!("Claim does not exist: {original}")],
            StreamLookup::Failed { claim, reason } => vec![format!("Peer search failed: {claim}: {reason}")],
        };

        if inline {
            out.extend(text.into_iter().map(|t| format!("{num:4}/{n:4}{sep} {t}")));
        } else {
            out.push(format!("Claim {num}/{n}"));
            out.extend(text);
            out.push(String::new());
        }
    }
    out
}

fn node_count(n: usize, local_node: bool) -> String {
    if local_node {
        format!("{n} + 1")
    } else {
        n.to_string()
    }
}

/// Totals of one search; the channel heads the paragraph when present
pub fn summary_lines(agg: &PeerAggregate) -> Vec<String> {
    let mut out = Vec::with_capacity(16);

    if let Some(channel) = &agg.channel {
        out.push(format!("Channel: {channel}"));
    }

    out.extend([
        format!("Claims searched: {}", agg.n_claims),
        format!("Downloadable streams: {}", agg.n_streams),
        format!("- Streams with at least one user host: {}", agg.streams_with_hosts),
        format!("- Streams with all types of host: {}", agg.streams_with_hosts_all),
        format!("- Size of streams: {:.4} GiB", agg.total_size as f64 / GIB),
        format!("- Duration of streams: {}", duration_text(agg.total_duration)),
        String::new(),
        format!("Total user peers in all searched claims: {}", agg.total_peers),
        format!("Total peers in all searched claims: {}", agg.total_peers_all),
        format!(
            "Total unique user peers (nodes) hosting streams: {}",
            node_count(agg.unique_nodes.len(), agg.local_node)
        ),
        format!("Total unique tracker peers hosting streams: {}", agg.unique_trackers.len()),
        format!("Average number of user peers per stream: {:.4}", agg.peer_ratio),
        format!("Average number of total peers per stream: {:.4}", agg.peer_ratio_all),
        format!("User hosting coverage: {:.2}%", agg.hosting_coverage * 100.0),
        format!("Total hosting coverage: {:.2}%", agg.hosting_coverage_all * 100.0),
    ]);
    out
}

/// One line per channel of a multi-channel search
pub fn channel_lines(channels: &[Option<PeerAggregate>], sep: &str) -> Vec<String> {
    let n = channels.len();

    channels
        .iter()
        .enumerate()
        .map(|(num, agg)| {
            let num = num + 1;
            let Some(agg) = agg else {
                return format!("{num:4}/{n:4}{sep} \"None\"");
            };

            let channel = format!("\"{}\"", agg.channel.as_deref().unwrap_or_default());
            let (hr, mi, sec) = hms(agg.total_duration);
            let nodes = if agg.local_node {
                format!("{:3} + 1", agg.unique_nodes.len())
            } else {
                format!("{:3}", agg.unique_nodes.len())
            };

            format!(
                "{num:4}/{n:4}{sep} {channel:42}{sep} streams: {:3}/{:3}{sep} {:9.4} GB{sep} \
                 {hr:3} h {mi:2} min {sec:2} s{sep} peers/stream: {:7.4}{sep} coverage: {:6.2}%{sep} \
                 unique peers: {nodes}",
                agg.streams_with_hosts,
                agg.n_streams,
                agg.total_size as f64 / GIB,
                agg.peer_ratio,
                agg.hosting_coverage * 100.0,
            )
        })
        .collect()
}

/// Totals over every channel of a multi-channel search
pub fn multi_summary_lines(merged: &MultiChannelAggregate) -> Vec<String> {
    let (hr, mi, sec) = hms(merged.total_duration);

    vec![
        format!("Channels: {}", merged.n_channels),
        format!("Total streams: {}", merged.n_streams),
        format!("- Total streams that have at least one host: {}", merged.streams_with_hosts),
        format!("- Total size of streams: {:.4} GiB", merged.total_size as f64 / GIB),
        format!("- Total duration of streams: {hr} h {mi} min {sec} s"),
        String::new(),
        format!("Total peers in all searched claims: {}", merged.total_peers),
        format!(
            "Total unique peers (nodes) hosting streams: {}",
            node_count(merged.unique_nodes.len(), merged.local_node)
        ),
        format!("Total average number of peers per stream: {:.4}", merged.peer_ratio),
        format!("Total hosting coverage: {:.2}%", merged.hosting_coverage * 100.0),
    ]
}
