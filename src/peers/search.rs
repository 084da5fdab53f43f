use crate::api::client::{DaemonClient, ItemPage};
use crate::core::error::Outcome;
use crate::core::state::Session;
use crate::models::blob::SdBlob;
use crate::models::claim::Claim;
use crate::models::peer::{Peer, PeerAggregate, StreamLookup, StreamPeers};
use crate::peers::aggregate::fold_streams;
use crate::search::item::search_item;
use crate::utils::pool::run_bounded;
use crate::validation::params::ClaimRef;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Every peer of a blob fits in one page
const PEER_PAGE: usize = 9999;

/// Hosts announcing a blob
pub async fn get_peers(daemon: &DaemonClient, blob_hash: &str) -> Outcome<Vec<Peer>> {
    let page: ItemPage<Peer> = daemon
        .items("peer_list", json!({ "blob_hash": blob_hash, "page_size": PEER_PAGE }))
        .await?;
    Ok(page.items)
}

/// Hash of the first data blob, read from a locally stored manifest
pub fn first_data_blob(sd_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(sd_path).ok()?;

    match serde_json::from_str::<SdBlob>(&content) {
        Ok(sd) => sd.data_blobs().next().map(|(_, hash)| hash.to_string()),
        Err(e) => {
            debug!(path = %sd_path.display(), error = %e, "Unreadable manifest blob");
            None
        }
    }
}

/// Peers of one stream claim.
///
/// Peers of the manifest blob come first. When the manifest is stored
/// locally, peers of the first data blob not already listed are added,
/// since a host may hold the data without announcing the manifest.
pub async fn calculate_peers(daemon: &DaemonClient, claim: Claim, blob_dir: &Path) -> Outcome<StreamPeers> {
    let Some(sd_hash) = claim.sd_hash().map(str::to_string) else {
        return Ok(StreamPeers::empty(claim));
    };

    let mut peers = get_peers(daemon, &sd_hash).await?;

    let sd_path = blob_dir.join(&sd_hash);
    let local_node = sd_path.is_file();

    if let Some(first) = local_node.then(|| first_data_blob(&sd_path)).flatten() {
        for peer in get_peers(daemon, &first).await? {
            if !peers.contains(&peer) {
                peers.push(peer);
            }
        }
    }

    let (peers_user, peers_tracker): (Vec<Peer>, Vec<Peer>) =
        peers.iter().cloned().partition(Peer::is_user);

    debug!(
        claim_name = %claim.name,
        sd_hash = %sd_hash,
        user = peers_user.len(),
        tracker = peers_tracker.len(),
        local_node,
        "Peers found"
    );

    Ok(StreamPeers {
        size: claim.size(),
        duration: claim.duration(),
        stream: claim,
        peers,
        peers_user,
        peers_tracker,
        local_node,
    })
}

/// Local blob directory as reported by the daemon
pub async fn blob_dir(daemon: &DaemonClient) -> Outcome<PathBuf> {
    Ok(daemon.settings().await?.blob_dir())
}

/// Resolve each claim and search its peers, `threads` claims at a time.
///
/// Only claims of type `stream` count towards the ratios.
pub async fn search_claims_peers(session: &Session, claims: Vec<ClaimRef>, threads: usize) -> Outcome<PeerAggregate> {
    let blob_dir = blob_dir(&session.daemon).await?;
    let n_claims = claims.len();
    let originals: Vec<String> = claims.iter().map(ToString::to_string).collect();

    info!(claims = n_claims, threads, "Searching peers of claims");

    let task_session = session.clone();
    let slots = run_bounded(claims, threads, move |claim| {
        let session = task_session.clone();
        let blob_dir = blob_dir.clone();
        async move { lookup_claim(&session.daemon, &claim, &blob_dir).await }
    })
    .await;

    let streams_info: Vec<StreamLookup> = slots
        .into_iter()
        .zip(originals)
        .map(|(slot, original)| {
            slot.unwrap_or(StreamLookup::Failed {
                claim: original,
                reason: "peer search task failed".to_string(),
            })
        })
        .collect();

    let n_streams = streams_info
        .iter()
        .filter_map(StreamLookup::found)
        .filter(|info| info.stream.value_type.as_deref() == Some("stream"))
        .count();

    Ok(fold_streams(None, n_claims, n_streams, streams_info))
}

async fn lookup_claim(daemon: &DaemonClient, claim: &ClaimRef, blob_dir: &Path) -> StreamLookup {
    let resolved = match search_item(daemon, claim).await {
        Ok(resolved) => resolved,
        Err(e) if e.is_not_found() => {
            warn!(claim = %claim, "Claim does not resolve");
            return StreamLookup::Unresolved {
                original: claim.to_string(),
            };
        }
        Err(e) => {
            warn!(claim = %claim, error = %e, "Claim lookup failed");
            return StreamLookup::Failed {
                claim: claim.to_string(),
                reason: e.to_string(),
            };
        }
    };

    lookup_stream(daemon, resolved, blob_dir).await
}

/// `calculate_peers` with its failure folded into the slot
pub(crate) async fn lookup_stream(daemon: &DaemonClient, claim: Claim, blob_dir: &Path) -> StreamLookup {
    let claim_id = claim.claim_id.clone();

    match calculate_peers(daemon, claim, blob_dir).await {
        Ok(info) => StreamLookup::Found(info),
        Err(e) => {
            warn!(claim_id = %claim_id, error = %e, "Peer search failed");
            StreamLookup::Failed {
                claim: claim_id,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_session;
    use crate::testing::{ok, stream_claim, FakeServer};
    use serde_json::Value;

    const SD: &str = "sdhash";

    fn peer(address: &str, node: Option<&str>) -> Value {
        json!({"address": address, "node_id": node, "tcp_port": 3333, "udp_port": 4444})
    }

    fn peer_handler(method: &str, params: &Value) -> Value {
        match method {
            "peer_list" if params["blob_hash"] == SD => ok(json!({"items": [
                peer("1.1.1.1", Some("X")),
                peer("9.9.9.9", None)
            ]})),
            "peer_list" => ok(json!({"items": [
                peer("1.1.1.1", Some("X")),
                peer("2.2.2.2", Some("Y"))
            ]})),
            _ => ok(Value::Null),
        }
    }

    #[tokio::test]
    async fn test_manifest_peers_only() {
        let server = FakeServer::spawn(peer_handler).await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let claim: Claim = serde_json::from_value(stream_claim(&"a".repeat(40), "v", SD)).unwrap();

        let info = calculate_peers(&daemon, claim, dir.path()).await.unwrap();

        assert!(!info.local_node);
        assert_eq!(info.peers.len(), 2);
        assert_eq!(info.peers_user.len(), 1);
        assert_eq!(info.peers_tracker.len(), 1);
        assert_eq!(info.size, 1048576);
        assert_eq!(info.duration, 90);
        assert_eq!(server.methods(), vec!["peer_list"]);
    }

    #[tokio::test]
    async fn test_local_manifest_adds_first_blob_peers() {
        let server = FakeServer::spawn(peer_handler).await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SD),
            r#"{"blobs": [{"blob_hash": "first", "length": 2097152}, {"length": 0}]}"#,
        )
        .unwrap();
        let claim: Claim = serde_json::from_value(stream_claim(&"a".repeat(40), "v", SD)).unwrap();

        let info = calculate_peers(&daemon, claim, dir.path()).await.unwrap();

        assert!(info.local_node);
        // X appears in both lists and is kept once
        assert_eq!(info.peers.len(), 3);
        assert_eq!(info.peers_user.len(), 2);
        assert_eq!(server.calls()[1].1["blob_hash"], "first");
    }

    #[tokio::test]
    async fn test_claim_without_source() {
        let server = FakeServer::spawn(peer_handler).await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();
        let claim: Claim = serde_json::from_value(json!({"claim_id": "c", "value_type": "channel"})).unwrap();

        let info = calculate_peers(&daemon, claim, Path::new("/nonexistent")).await.unwrap();

        assert!(info.peers.is_empty());
        assert_eq!(info.size, 0);
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn test_search_claims_counts_streams() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_string_lossy().to_string();

        let server = FakeServer::spawn(move |method, params| match method {
            "settings_get" => ok(json!({"data_dir": data_dir, "download_dir": "/tmp"})),
            "claim_search" if params["claim_id"] == "b".repeat(40) => ok(json!({"items": [], "total_items": 0})),
            "claim_search" => {
                let cid = params["claim_id"].as_str().unwrap_or_default().to_string();
                ok(json!({"items": [stream_claim(&cid, "v", SD)], "total_items": 1}))
            }
            _ => peer_handler(method, params),
        })
        .await;
        let session = test_session(&server.url);

        let claims = vec![
            ClaimRef::ClaimId("a".repeat(40)),
            ClaimRef::ClaimId("b".repeat(40)),
            ClaimRef::ClaimId("c".repeat(40)),
        ];
        let agg = search_claims_peers(&session, claims, 2).await.unwrap();

        assert_eq!(agg.n_claims, 3);
        assert_eq!(agg.n_streams, 2);
        assert!(matches!(agg.streams_info[1], StreamLookup::Unresolved { .. }));
        assert_eq!(agg.total_peers, 2);
        assert_eq!(agg.total_peers_all, 4);
        assert_eq!(agg.unique_nodes.len(), 1);
        assert_eq!(agg.unique_trackers.len(), 1);
        assert!((agg.hosting_coverage - 1.0).abs() < 1e-9);
    }
}
