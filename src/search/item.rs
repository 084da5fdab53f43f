use crate::api::client::{DaemonClient, ItemPage};
use crate::core::error::{Outcome, RpcError, ToolError};
use crate::models::claim::Claim;
use crate::models::file_item::FileItem;
use crate::validation::params::ClaimRef;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Find a claim online by URI, claim id or name. Reposts are followed to
/// the original claim.
pub async fn search_item(daemon: &DaemonClient, claim: &ClaimRef) -> Outcome<Claim> {
    let item = match claim {
        ClaimRef::Uri(uri) => search_item_uri(daemon, uri).await?,
        ClaimRef::ClaimId(cid) => search_claims(daemon, json!({ "claim_id": cid }), claim).await?,
        ClaimRef::Name(name) => search_claims(daemon, json!({ "name": name }), claim).await?,
    };

    Ok(check_repost(item))
}

async fn search_item_uri(daemon: &DaemonClient, uri: &str) -> Outcome<Claim> {
    let mut result = daemon.call_value("resolve", json!({ "urls": uri })).await?;

    let item = result
        .get_mut(uri)
        .map(Value::take)
        .ok_or_else(|| ToolError::NotFound(format!("uri={uri}")))?;

    if let Some(error) = item.get("error") {
        let reason = match (error.get("name"), error.get("text")) {
            (Some(name), Some(text)) => format!("{}, {}", as_text(name), as_text(text)),
            _ => as_text(error),
        };
        return Err(ToolError::NotFound(format!("uri={uri}: {reason}")));
    }

    serde_json::from_value(item).map_err(|e| {
        ToolError::from(RpcError::Malformed {
            method: "resolve".to_string(),
            reason: e.to_string(),
        })
    })
}

async fn search_claims(daemon: &DaemonClient, params: Value, claim: &ClaimRef) -> Outcome<Claim> {
    let page: ItemPage<Claim> = daemon.items("claim_search", params).await?;

    // The list may include reposts; the last item is the oldest, the original
    if page.total_items.unwrap_or(page.items.len() as i64) <= 0 {
        return Err(ToolError::NotFound(claim.to_string()));
    }
    page.items
        .into_iter()
        .last()
        .ok_or_else(|| ToolError::NotFound(claim.to_string()))
}

/// Replace a repost by the claim it points to
pub fn check_repost(item: Claim) -> Claim {
    let repost = item.short_canonical();
    match item.reposted_claim {
        Some(original) => {
            info!(
                repost = %repost,
                reposted_claim = %original.short_canonical(),
                "Following repost"
            );
            *original
        }
        None => item,
    }
}

/// Find a claim in the local database. Works for claims removed from the
/// network as long as they were downloaded before.
pub async fn search_item_offline(daemon: &DaemonClient, claim: &ClaimRef) -> Outcome<FileItem> {
    let params = match claim {
        ClaimRef::ClaimId(cid) => json!({ "claim_id": cid }),
        ClaimRef::Name(name) => json!({ "claim_name": name }),
        ClaimRef::Uri(_) => {
            return Err(ToolError::InvalidInput(
                "local lookups need a claim id or a name".to_string(),
            ))
        }
    };

    debug!(%claim, "Searching local files");
    let page: ItemPage<FileItem> = daemon.items("file_list", params).await?;

    page.items
        .into_iter()
        .last()
        .ok_or_else(|| ToolError::NotFound(claim.to_string()))
}

fn as_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
