use crate::models::claim::Claim;
use serde::{Deserialize, Serialize};

/// A host of a blob as reported by `peer_list`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Peer {
    /// IP address of the host
    pub address: String,
    /// 96-character node id; `None` for fixed trackers
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub tcp_port: Option<u16>,
    #[serde(default)]
    pub udp_port: Option<u16>,
}

impl Peer {
    pub fn new(address: &str, node_id: Option<&str>) -> Self {
        Self {
            address: address.to_string(),
            node_id: node_id.map(str::to_string),
            tcp_port: None,
            udp_port: None,
        }
    }

    /// A user node, as opposed to a tracker
    pub fn is_user(&self) -> bool {
        self.node_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Peer search result for a single claim
#[derive(Clone, Debug, Default, Serialize)]
pub struct StreamPeers {
    pub stream: Claim,
    /// Size in bytes, 0 when unknown
    pub size: u64,
    /// Duration in seconds, 0 for non audio/video streams
    pub duration: u64,
    pub peers: Vec<Peer>,
    pub peers_user: Vec<Peer>,
    pub peers_tracker: Vec<Peer>,
    /// The manifest blob is present in our own blob directory
    pub local_node: bool,
}

impl StreamPeers {
    /// Result for a claim that has nothing to download
    pub fn empty(stream: Claim) -> Self {
        Self {
            stream,
            ..Default::default()
        }
    }

    pub fn is_stream(&self) -> bool {
        self.stream.sd_hash().is_some()
    }
}

/// One slot of a per-claim peer search
#[derive(Clone, Debug, Serialize)]
pub enum StreamLookup {
    Found(StreamPeers),
    /// The claim text did not resolve
    Unresolved { original: String },
    /// The search for this claim failed midway
    Failed { claim: String, reason: String },
}

impl StreamLookup {
    pub fn found(&self) -> Option<&StreamPeers> {
        match self {
            StreamLookup::Found(info) => Some(info),
            _ => None,
        }
    }
}

/// Statistics over the streams of one channel or one group of claims
#[derive(Clone, Debug, Default, Serialize)]
pub struct PeerAggregate {
    /// Canonical channel name, or the requested name when nothing resolved
    pub channel: Option<String>,
    pub n_claims: usize,
    pub n_streams: usize,
    pub streams_info: Vec<StreamLookup>,
    pub total_size: u64,
    pub total_duration: u64,
    /// Streams with at least one user peer
    pub streams_with_hosts: usize,
    /// Streams with any peer
    pub streams_with_hosts_all: usize,
    pub total_peers: usize,
    pub total_peers_all: usize,
    pub unique_nodes: Vec<Peer>,
    pub unique_trackers: Vec<Peer>,
    pub peer_ratio: f64,
    pub peer_ratio_all: f64,
    pub hosting_coverage: f64,
    pub hosting_coverage_all: f64,
    pub local_node: bool,
}

/// Statistics merged over several channels
#[derive(Clone, Debug, Default, Serialize)]
pub struct MultiChannelAggregate {
    /// Number of channels requested, failed ones included
    pub n_channels: usize,
    pub n_streams: usize,
    pub total_size: u64,
    pub total_duration: u64,
    pub streams_with_hosts: usize,
    pub streams_with_hosts_all: usize,
    pub total_peers: usize,
    pub total_peers_all: usize,
    pub unique_nodes: Vec<Peer>,
    pub unique_trackers: Vec<Peer>,
    pub peer_ratio: f64,
    pub peer_ratio_all: f64,
    pub hosting_coverage: f64,
    pub hosting_coverage_all: f64,
    pub local_node: bool,
    pub base_chs_peers_info: Vec<Option<PeerAggregate>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_peer_kind() {
        let peers: Vec<Peer> = serde_json::from_value(json!([
            {"address": "1.2.3.4", "node_id": "ab", "tcp_port": 4444, "udp_port": 4444},
            {"address": "5.6.7.8", "node_id": null, "tcp_port": 5567}
        ]))
        .unwrap();

        assert!(peers[0].is_user());
        assert!(!peers[1].is_user());
        assert_eq!(peers[1].tcp_port, Some(5567));
    }

    #[test]
    fn test_empty_node_id_is_tracker() {
        let peer = Peer::new("9.9.9.9", Some(""));
        assert!(!peer.is_user());
    }
}
