use crate::models::peer::{MultiChannelAggregate, Peer, PeerAggregate, StreamLookup};
use std::collections::HashSet;

/// Keeps the first peer seen for every node id and every tracker address
#[derive(Default)]
struct UniquePeers {
    node_ids: HashSet<String>,
    addresses: HashSet<String>,
    nodes: Vec<Peer>,
    trackers: Vec<Peer>,
}

impl UniquePeers {
    fn add(&mut self, peer: &Peer) {
        match peer.node_id.as_deref() {
            Some(node) if !node.is_empty() => {
                if self.node_ids.insert(node.to_string()) {
                    self.nodes.push(peer.clone());
                }
            }
            _ => {
                if self.addresses.insert(peer.address.clone()) {
                    self.trackers.push(peer.clone());
                }
            }
        }
    }

    fn add_all<'a>(&mut self, peers: impl IntoIterator<Item = &'a Peer>) {
        for peer in peers {
            self.add(peer);
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Statistics over the peer searches of a group of claims.
///
/// Size, duration and the local flag come from every found stream; streams
/// without any peer add nothing else. Ratios divide by `n_streams`, and
/// `n_streams == 0` leaves every total at zero.
pub fn fold_streams(
    channel: Option<String>,
    n_claims: usize,
    n_streams: usize,
    streams_info: Vec<StreamLookup>,
) -> PeerAggregate {
    let mut agg = PeerAggregate {
        channel,
        n_claims,
        n_streams,
        ..Default::default()
    };

    if n_streams < 1 {
        agg.streams_info = streams_info;
        return agg;
    }

    let mut unique = UniquePeers::default();

    for info in streams_info.iter().filter_map(StreamLookup::found) {
        agg.total_size += info.size;
        agg.total_duration += info.duration;
        agg.local_node |= info.local_node;

        if info.peers.is_empty() {
            continue;
        }

        agg.total_peers += info.peers_user.len();
        agg.total_peers_all += info.peers.len();

        if !info.peers_user.is_empty() {
            agg.streams_with_hosts += 1;
        }
        agg.streams_with_hosts_all += 1;

        unique.add_all(&info.peers);
    }

    agg.peer_ratio = ratio(agg.total_peers, n_streams);
    agg.peer_ratio_all = ratio(agg.total_peers_all, n_streams);
    agg.hosting_coverage = ratio(agg.streams_with_hosts, n_streams);
    agg.hosting_coverage_all = ratio(agg.streams_with_hosts_all, n_streams);
    agg.unique_nodes = unique.nodes;
    agg.unique_trackers = unique.trackers;
    agg.streams_info = streams_info;
    agg
}

/// Merge per-channel results; `None` marks a channel whose search failed.
///
/// Ratios are averaged over every requested channel, failed ones included,
/// so a failed channel pulls the averages down. Returns `None` when no
/// channel produced a result.
pub fn merge_channels(channels: Vec<Option<PeerAggregate>>) -> Option<MultiChannelAggregate> {
    if channels.iter().all(Option::is_none) {
        return None;
    }

    let n_channels = channels.len();
    let mut merged = MultiChannelAggregate {
        n_channels,
        ..Default::default()
    };
    let mut unique = UniquePeers::default();

    for agg in channels.iter().flatten() {
        merged.n_streams += agg.n_streams;
        merged.total_size += agg.total_size;
        merged.total_duration += agg.total_duration;
        merged.streams_with_hosts += agg.streams_with_hosts;
        merged.streams_with_hosts_all += agg.streams_with_hosts_all;
        merged.total_peers += agg.total_peers;
        merged.total_peers_all += agg.total_peers_all;

        unique.add_all(&agg.unique_nodes);
        unique.add_all(&agg.unique_trackers);

        merged.peer_ratio += agg.peer_ratio;
        merged.peer_ratio_all += agg.peer_ratio_all;
        merged.hosting_coverage += agg.hosting_coverage;
        merged.hosting_coverage_all += agg.hosting_coverage_all;
        merged.local_node |= agg.local_node;
    }

    let divisor = n_channels as f64;
    merged.peer_ratio /= divisor;
    merged.peer_ratio_all /= divisor;
    merged.hosting_coverage /= divisor;
    merged.hosting_coverage_all /= divisor;

    merged.unique_nodes = unique.nodes;
    merged.unique_trackers = unique.trackers;
    merged.base_chs_peers_info = channels;
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::claim::Claim;
    use crate::models::peer::StreamPeers;

    fn node(id: &str) -> Peer {
        Peer::new(&format!("10.0.0.{}", id.len()), Some(id))
    }

    fn tracker(address: &str) -> Peer {
        Peer::new(address, None)
    }

    fn stream(peers: Vec<Peer>, size: u64, local_node: bool) -> StreamLookup {
        let (peers_user, peers_tracker) = peers.iter().cloned().partition(Peer::is_user);
        StreamLookup::Found(StreamPeers {
            stream: Claim::default(),
            size,
            duration: 60,
            peers,
            peers_user,
            peers_tracker,
            local_node,
        })
    }

    fn channel_agg(n_streams: usize, peer_ratio: f64, coverage: f64, nodes: &[&str]) -> PeerAggregate {
        PeerAggregate {
            n_streams,
            peer_ratio,
            hosting_coverage: coverage,
            unique_nodes: nodes.iter().map(|id| node(id)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fold_counts_and_ratios() {
        let streams = vec![
            stream(vec![node("A"), node("B"), tracker("t1")], 100, false),
            stream(vec![tracker("t1")], 200, true),
            stream(vec![], 300, false),
            stream(vec![node("A")], 400, false),
        ];

        let agg = fold_streams(Some("@chan#1".to_string()), 4, 4, streams);

        assert_eq!(agg.total_size, 1000);
        assert_eq!(agg.total_duration, 240);
        assert_eq!(agg.total_peers, 3);
        assert_eq!(agg.total_peers_all, 5);
        assert_eq!(agg.streams_with_hosts, 2);
        assert_eq!(agg.streams_with_hosts_all, 3);
        assert!((agg.peer_ratio - 0.75).abs() < 1e-9);
        assert!((agg.peer_ratio_all - 1.25).abs() < 1e-9);
        assert!((agg.hosting_coverage - 0.5).abs() < 1e-9);
        assert!((agg.hosting_coverage_all - 0.75).abs() < 1e-9);
        assert!(agg.local_node);

        let ids: Vec<_> = agg.unique_nodes.iter().map(|p| p.node_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(agg.unique_trackers.len(), 1);
        assert_eq!(agg.streams_info.len(), 4);
    }

    #[test]
    fn test_fold_without_streams_is_zero() {
        let agg = fold_streams(Some("@empty".to_string()), 2, 0, vec![stream(vec![node("A")], 10, true)]);

        assert_eq!(agg.n_claims, 2);
        assert_eq!(agg.total_peers, 0);
        assert_eq!(agg.total_size, 0);
        assert_eq!(agg.peer_ratio, 0.0);
        assert!(!agg.local_node);
        assert!(agg.unique_nodes.is_empty());
    }

    #[test]
    fn test_fold_skips_failed_slots() {
        let streams = vec![
            StreamLookup::Unresolved {
                original: "lbry://gone".to_string(),
            },
            stream(vec![node("A")], 10, false),
            StreamLookup::Failed {
                claim: "x".to_string(),
                reason: "timeout".to_string(),
            },
        ];

        let agg = fold_streams(None, 3, 2, streams);
        assert_eq!(agg.total_peers, 1);
        assert!((agg.peer_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_merge_two_channels() {
        let merged = merge_channels(vec![
            Some(channel_agg(2, 1.0, 0.5, &["X"])),
            Some(channel_agg(3, 2.0, 1.0, &["X", "Y"])),
        ])
        .unwrap();

        assert_eq!(merged.n_channels, 2);
        assert_eq!(merged.n_streams, 5);
        assert!((merged.peer_ratio - 1.5).abs() < 1e-9);
        assert!((merged.hosting_coverage - 0.75).abs() < 1e-9);

        let ids: Vec<_> = merged.unique_nodes.iter().map(|p| p.node_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["X", "Y"]);
    }

    #[test]
    fn test_merge_divides_by_requested_channels() {
        let merged = merge_channels(vec![Some(channel_agg(2, 1.0, 0.5, &["X"])), None]).unwrap();

        assert_eq!(merged.n_channels, 2);
        assert_eq!(merged.n_streams, 2);
        assert!((merged.peer_ratio - 0.5).abs() < 1e-9);
        assert!((merged.hosting_coverage - 0.25).abs() < 1e-9);
        assert_eq!(merged.base_chs_peers_info.len(), 2);
    }

    #[test]
    fn test_merge_dedups_trackers_and_ors_local() {
        let mut first = channel_agg(1, 1.0, 1.0, &[]);
        first.unique_trackers = vec![tracker("t1")];
        let mut second = channel_agg(1, 1.0, 1.0, &[]);
        second.unique_trackers = vec![tracker("t1"), tracker("t2")];
        second.local_node = true;

        let merged = merge_channels(vec![Some(first), Some(second)]).unwrap();
        assert_eq!(merged.unique_trackers.len(), 2);
        assert!(merged.local_node);
    }

    #[test]
    fn test_merge_nothing_to_report() {
        assert!(merge_channels(Vec::new()).is_none());
        assert!(merge_channels(vec![None, None]).is_none());
    }
}
