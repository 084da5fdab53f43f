use crate::core::error::Outcome;
use crate::core::state::Session;
use crate::models::peer::{PeerAggregate, StreamLookup};
use crate::peers::aggregate::fold_streams;
use crate::peers::search::{blob_dir, lookup_stream};
use crate::search::channel::ch_search_latest;
use crate::utils::channels::ChannelSpec;
use crate::utils::pool::run_bounded;
use tracing::{info, warn};

/// Peers of the newest `number` claims of a channel, `threads` claims at a
/// time. A channel without claims gives an aggregate with zero streams.
pub async fn search_ch_peers(session: &Session, channel: &str, number: usize, threads: usize) -> Outcome<PeerAggregate> {
    let claims = match ch_search_latest(&session.daemon, channel, number).await {
        Ok(claims) => claims,
        Err(e) if e.is_not_found() => {
            warn!(channel, error = %e, "No claims to search");
            return Ok(fold_streams(Some(channel.to_string()), number, 0, Vec::new()));
        }
        Err(e) => return Err(e),
    };

    let blob_dir = blob_dir(&session.daemon).await?;

    let canonical = claims
        .first()
        .and_then(|c| c.channel_name())
        .unwrap_or_else(|| channel.to_string());
    let n_streams = claims.iter().filter(|c| c.sd_hash().is_some()).count();
    let claim_ids: Vec<String> = claims.iter().map(|c| c.claim_id.clone()).collect();

    let task_session = session.clone();
    let slots = run_bounded(claims, threads, move |claim| {
        let session = task_session.clone();
        let blob_dir = blob_dir.clone();
        async move { lookup_stream(&session.daemon, claim, &blob_dir).await }
    })
    .await;

    let streams_info: Vec<StreamLookup> = slots
        .into_iter()
        .zip(claim_ids)
        .map(|(slot, claim)| {
            slot.unwrap_or(StreamLookup::Failed {
                claim,
                reason: "peer search task failed".to_string(),
            })
        })
        .collect();

    let agg = fold_streams(Some(canonical), number, n_streams, streams_info);
    info!(
        channel = agg.channel.as_deref().unwrap_or(channel),
        streams = agg.n_streams,
        coverage = agg.hosting_coverage,
        "Channel peers searched"
    );
    Ok(agg)
}

/// Search several channels at once.
///
/// `channel_threads` channels run concurrently and each runs its own pool
/// of `claim_threads` claim searches. A channel that fails leaves `None` in
/// its slot.
pub async fn ch_search_ch_peers(session: &Session, channels: Vec<ChannelSpec>) -> Vec<Option<PeerAggregate>> {
    let channel_threads = session.config.peers.channel_threads;
    let claim_threads = session.config.peers.claim_threads;

    info!(
        channels = channels.len(),
        channel_threads, claim_threads, "Channel peer search"
    );

    let task_session = session.clone();
    run_bounded(channels, channel_threads, move |spec: ChannelSpec| {
        let session = task_session.clone();
        async move {
            match search_ch_peers(&session, &spec.channel, spec.number, claim_threads).await {
                Ok(agg) => Some(agg),
                Err(e) => {
                    warn!(channel = %spec.channel, error = %e, "Channel peer search failed");
                    None
                }
            }
        }
    })
    .await
    .into_iter()
    .map(Option::flatten)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_session;
    use crate::peers::aggregate::merge_channels;
    use crate::testing::{ok, rpc_error, stream_claim, FakeServer};
    use serde_json::{json, Value};

    fn channel_claim(name: &str) -> Value {
        json!({"claim_id": "1111", "name": name, "canonical_url": format!("lbry://{name}#1"), "value_type": "channel"})
    }

    fn handler(method: &str, params: &Value) -> Value {
        match method {
            "resolve" => {
                let uri = params["urls"].as_str().unwrap_or_default().to_string();
                if uri == "@broken" {
                    return rpc_error("InternalError", "daemon crashed");
                }
                ok(json!({ uri.clone(): channel_claim(&uri) }))
            }
            "settings_get" => ok(json!({"data_dir": "/nonexistent"})),
            "claim_search" if params["channel"] == "@empty" => ok(json!({"items": [], "total_pages": 0})),
            "claim_search" => ok(json!({"items": [
                stream_claim(&"a".repeat(40), "one", "sd1"),
                stream_claim(&"b".repeat(40), "two", "sd2"),
                {"claim_id": "c".repeat(40), "name": "post", "value_type": "stream", "value": {}}
            ], "total_pages": 1})),
            "peer_list" if params["blob_hash"] == "sd1" => ok(json!({"items": [
                {"address": "1.1.1.1", "node_id": "X"},
                {"address": "2.2.2.2", "node_id": "Y"}
            ]})),
            "peer_list" => ok(json!({"items": []})),
            _ => ok(Value::Null),
        }
    }

    #[tokio::test]
    async fn test_channel_aggregate() {
        let server = FakeServer::spawn(handler).await;
        let session = test_session(&server.url);

        let agg = search_ch_peers(&session, "@chan", 3, 2).await.unwrap();

        assert_eq!(agg.channel.as_deref(), Some("@chan#1"));
        assert_eq!(agg.n_claims, 3);
        assert_eq!(agg.n_streams, 2);
        assert_eq!(agg.total_peers, 2);
        assert_eq!(agg.streams_with_hosts, 1);
        assert!((agg.peer_ratio - 1.0).abs() < 1e-9);
        assert!((agg.hosting_coverage - 0.5).abs() < 1e-9);
        assert_eq!(agg.streams_info.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_channel_is_zero_aggregate() {
        let server = FakeServer::spawn(handler).await;
        let session = test_session(&server.url);

        let agg = search_ch_peers(&session, "@empty", 2, 2).await.unwrap();

        assert_eq!(agg.channel.as_deref(), Some("@empty"));
        assert_eq!(agg.n_streams, 0);
        assert!(agg.streams_info.is_empty());
    }

    #[tokio::test]
    async fn test_failed_channel_keeps_its_slot() {
        let server = FakeServer::spawn(handler).await;
        let session = test_session(&server.url);

        let specs = vec![
            ChannelSpec::parse("@chan=3").unwrap(),
            ChannelSpec::parse("@broken").unwrap(),
            ChannelSpec::parse("@empty").unwrap(),
        ];
        let results = ch_search_ch_peers(&session, specs).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert_eq!(results[2].as_ref().map(|a| a.n_streams), Some(0));

        let merged = merge_channels(results).unwrap();
        assert_eq!(merged.n_channels, 3);
        assert_eq!(merged.n_streams, 2);
        assert!((merged.peer_ratio - 1.0 / 3.0).abs() < 1e-9);
    }
}
