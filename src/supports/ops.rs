use crate::api::client::ItemPage;
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::models::claim::Claim;
use crate::models::support::{SupportItem, Transaction};
use crate::search::item::search_item;
use crate::validation::params::ClaimRef;
use serde_json::json;
use tracing::{debug, info};

const SUPPORT_PAGE: usize = 99_000;

/// One of our supports and the claim it points to, `None` when the claim
/// no longer resolves
#[derive(Debug, Clone)]
pub struct SupportListing {
    pub support: SupportItem,
    pub resolved: Option<Claim>,
}

/// Every support of the wallet, with its claim resolved online
pub async fn get_all_supports(session: &Session) -> Outcome<Vec<SupportListing>> {
    let page: ItemPage<SupportItem> = session
        .daemon
        .items("support_list", json!({ "page_size": SUPPORT_PAGE }))
        .await?;

    if page.items.is_empty() {
        return Err(ToolError::NotFound("no supports in the wallet".to_string()));
    }

    let mut listings = Vec::with_capacity(page.items.len());
    for support in page.items {
        let resolved = match search_item(&session.daemon, &ClaimRef::ClaimId(support.claim_id.clone())).await {
            Ok(claim) => Some(claim),
            Err(ToolError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        listings.push(SupportListing { support, resolved });
    }

    info!(supports = listings.len(), "Supports listed");
    Ok(listings)
}

#[derive(Debug, Clone)]
pub struct SupportListOptions {
    pub show_claim_id: bool,
    /// Only supports of claims that no longer resolve
    pub invalid: bool,
    /// Sum the trending scores instead of showing each
    pub combine: bool,
    pub claims: bool,
    pub channels: bool,
    pub sep: String,
}

impl Default for SupportListOptions {
    fn default() -> Self {
        Self {
            show_claim_id: false,
            invalid: false,
            combine: true,
            claims: true,
            channels: true,
            sep: ";".to_string(),
        }
    }
}

pub fn support_lines(listings: &[SupportListing], opts: &SupportListOptions) -> Vec<String> {
    let sep = opts.sep.as_str();
    let n_items = listings.len();
    let mut lines = Vec::new();

    for (num, listing) in listings.iter().enumerate() {
        let support = &listing.support;
        let is_channel = support.is_channel();
        if (is_channel && !opts.channels) || (!is_channel && !opts.claims) || support.is_spent {
            continue;
        }
        if opts.invalid && listing.resolved.is_some() {
            continue;
        }

        let mut obj = String::new();
        if opts.show_claim_id {
            obj.push_str(&format!("\"{}\"{sep} ", support.claim_id));
        }
        let name = match listing.resolved {
            Some(_) => format!("\"{}\"", support.name),
            None => format!("[\"{}\"]", support.name),
        };
        obj.push_str(&format!("{name:58}"));

        let (existing, meta) = match &listing.resolved {
            Some(claim) => (
                claim.amount.unwrap_or(0.0) + claim.meta.support_amount.unwrap_or(0.0),
                claim.meta.clone(),
            ),
            None => (support.amount(), Default::default()),
        };

        let global = meta.trending_global.unwrap_or(0.0);
        let group = meta.trending_group.unwrap_or(0.0);
        let local = meta.trending_local.unwrap_or(0.0);
        let mixed = meta.trending_mixed.unwrap_or(0.0);

        let trend = if opts.combine {
            format!("combined: {:7.2}", global + group + local + mixed)
        } else {
            format!("mix: {mixed:7.2}{sep} glob: {global:7.2}{sep} grp: {group:7.2}{sep} loc: {local:7.2}")
        };

        lines.push(format!(
            "{:3}/{:3}{sep} {obj}{sep} {:14.8}{sep} {existing:15.8}{sep} {trend}",
            num + 1,
            n_items,
            support.amount()
        ));
    }

    lines
}

/// Our unspent supports, one line each
pub async fn list_supports(session: &Session, opts: &SupportListOptions) -> Outcome<Vec<String>> {
    let listings = get_all_supports(session).await?;
    Ok(support_lines(&listings, opts))
}

/// Support on a claim split into what others gave and what we gave
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSupport {
    pub canonical_url: String,
    pub claim_id: String,
    /// Claim amount plus every support
    pub existing: f64,
    /// `existing` without our supports
    pub base: f64,
    /// Our supports
    pub old: f64,
}

impl BaseSupport {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("canonical_url: {}", self.canonical_url),
            format!("claim_id: {}", self.claim_id),
            format!("Existing support: {:14.8}", self.existing),
            format!("Base support:     {:14.8}", self.base),
            format!("Old support:      {:14.8}", self.old),
        ]
    }
}

pub async fn get_base_support(session: &Session, claim: &ClaimRef) -> Outcome<BaseSupport> {
    let item = search_item(&session.daemon, claim).await?;
    let existing = item.amount.unwrap_or(0.0) + item.meta.support_amount.unwrap_or(0.0);

    let ours: ItemPage<SupportItem> = session
        .daemon
        .items("support_list", json!({ "claim_id": item.claim_id }))
        .await?;
    let old: f64 = ours.items.iter().map(SupportItem::amount).sum();

    Ok(BaseSupport {
        canonical_url: item.canonical_url.clone().unwrap_or_default(),
        claim_id: item.claim_id.clone(),
        existing,
        base: existing - old,
        old,
    })
}

/// Outcome of a change to our support on a claim
#[derive(Debug, Clone)]
pub struct SupportChange {
    pub base: BaseSupport,
    pub target: Option<f64>,
    pub must_add: Option<f64>,
    pub new_support: f64,
    /// `None` when nothing had to be sent
    pub transaction: Option<Transaction>,
}

impl SupportChange {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = self.base.lines();

        if let Some(target) = self.target {
            lines.push(String::new());
            lines.push(format!("Target:           {target:14.8}"));
        }
        if let Some(must_add) = self.must_add {
            lines.push(format!("Must add:         {must_add:14.8}"));
        }
        lines.push(format!("New support:      {:14.8}", self.new_support));
        lines.push(String::new());

        let applied = if self.transaction.is_some() { self.new_support } else { 0.0 };
        let tx = self.transaction.clone().unwrap_or_default();
        lines.extend([
            format!("Applied:          {applied:14.8}"),
            format!("total_input:      {:14.8}", tx.total_input.unwrap_or(0.0)),
            format!("total_output:     {:14.8}", tx.total_output.unwrap_or(0.0)),
            format!("total_fee:        {:14.8}", tx.total_fee.unwrap_or(0.0)),
            format!(
                "txid: {}",
                self.transaction.as_ref().map_or("None", |t| t.txid.as_str())
            ),
        ]);
        lines
    }
}

/// The wallet takes amounts as strings with 8 decimals, the smallest
/// unit being 0.00000001
fn lbc(amount: f64) -> String {
    format!("{amount:.8}")
}

async fn support_create_tx(session: &Session, claim_id: &str, amount: f64) -> Outcome<Transaction> {
    debug!(claim_id, amount, "support_create");
    Ok(session
        .daemon
        .call("support_create", json!({ "claim_id": claim_id, "amount": lbc(amount) }))
        .await?)
}

/// Abandon our supports on a claim, keeping `keep` as a new support
async fn support_abandon_tx(session: &Session, claim_id: &str, keep: f64) -> Outcome<Transaction> {
    let mut params = json!({ "claim_id": claim_id });
    if keep > 0.0 {
        params["keep"] = json!(lbc(keep));
    }

    debug!(claim_id, keep, "support_abandon");
    Ok(session.daemon.call("support_abandon", params).await?)
}

/// Add a new support of `amount` on top of the existing ones
pub async fn create_support(session: &Session, claim: &ClaimRef, amount: f64) -> Outcome<SupportChange> {
    let amount = amount.abs();
    let base = get_base_support(session, claim).await?;

    let tx = support_create_tx(session, &base.claim_id, amount).await?;
    info!(claim_id = %base.claim_id, amount, txid = %tx.txid, "Support created");

    Ok(SupportChange {
        base,
        target: None,
        must_add: None,
        new_support: amount,
        transaction: Some(tx),
    })
}

/// Remove our supports on a claim, leaving `keep` in place
pub async fn abandon_support(session: &Session, claim: &ClaimRef, keep: f64) -> Outcome<SupportChange> {
    let keep = keep.abs();
    let base = get_base_support(session, claim).await?;

    let tx = support_abandon_tx(session, &base.claim_id, keep).await?;
    info!(claim_id = %base.claim_id, keep, txid = %tx.txid, "Support abandoned");

    Ok(SupportChange {
        base,
        target: None,
        must_add: None,
        new_support: keep,
        transaction: Some(tx),
    })
}

/// `abandon_support` for a claim that no longer resolves, found among
/// our supports by claim id or name
pub async fn abandon_support_invalid(session: &Session, claim: &ClaimRef, keep: f64) -> Outcome<SupportChange> {
    let keep = keep.abs();
    let listings = get_all_supports(session).await?;

    let needle = claim.as_str();
    let found = listings
        .into_iter()
        .filter(|l| l.resolved.is_none())
        .map(|l| l.support)
        .find(|s| match claim {
            ClaimRef::ClaimId(_) => s.claim_id.contains(needle),
            _ => s.name.contains(needle),
        })
        .ok_or_else(|| ToolError::NotFound(format!("{claim} among the invalid claims")))?;

    let tx = support_abandon_tx(session, &found.claim_id, keep).await?;
    info!(claim_id = %found.claim_id, keep, txid = %tx.txid, "Support on invalid claim abandoned");

    Ok(SupportChange {
        base: BaseSupport {
            canonical_url: found.name.clone(),
            claim_id: found.claim_id.clone(),
            existing: found.amount(),
            base: 0.0,
            old: found.amount(),
        },
        target: None,
        must_add: None,
        new_support: keep,
        transaction: Some(tx),
    })
}

/// Amount to add and our resulting support so that the claim reaches
/// `target`.
///
/// Above the base, our support makes up the difference. At or below the
/// base, our support is removed entirely.
pub fn compute_target(target: f64, base: &BaseSupport) -> (f64, f64) {
    if target > base.base {
        let must_add = target - base.existing;
        (must_add, base.old + must_add)
    } else if target < base.base && base.old != 0.0 {
        (-base.old, 0.0)
    } else {
        (0.0, 0.0)
    }
}

/// Create, update or remove our support so the claim reaches `target`
pub async fn target_support(session: &Session, claim: &ClaimRef, target: f64) -> Outcome<SupportChange> {
    let target = target.abs();
    let base = get_base_support(session, claim).await?;
    let (must_add, new_support) = compute_target(target, &base);

    let transaction = if new_support == base.old {
        info!(claim_id = %base.claim_id, "Support already at target");
        None
    } else if base.old == 0.0 && new_support > 0.0 {
        Some(support_create_tx(session, &base.claim_id, new_support).await?)
    } else {
        Some(support_abandon_tx(session, &base.claim_id, new_support).await?)
    };

    Ok(SupportChange {
        base,
        target: Some(target),
        must_add: Some(must_add),
        new_support,
        transaction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_session;
    use crate::testing::{ok, stream_claim, FakeServer};
    use serde_json::Value;

    const CID: &str = "70dfefa510ca6eee7023a2a927e34d385b5a18bd";

    fn base(existing: f64, old: f64) -> BaseSupport {
        BaseSupport {
            canonical_url: "lbry://x".to_string(),
            claim_id: CID.to_string(),
            existing,
            base: existing - old,
            old,
        }
    }

    #[test]
    fn test_target_above_base() {
        // Others gave 10, we gave 2, target 15: add 3 to reach 5 of ours
        let (must_add, new) = compute_target(15.0, &base(12.0, 2.0));
        assert!((must_add - 3.0).abs() < 1e-9);
        assert!((new - 5.0).abs() < 1e-9);

        // Lowering the target above the base reduces our support
        let (must_add, new) = compute_target(11.0, &base(12.0, 2.0));
        assert!((must_add + 1.0).abs() < 1e-9);
        assert!((new - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_target_below_base() {
        assert_eq!(compute_target(5.0, &base(12.0, 2.0)), (-2.0, 0.0));
        assert_eq!(compute_target(5.0, &base(12.0, 0.0)), (0.0, 0.0));
        assert_eq!(compute_target(10.0, &base(12.0, 2.0)), (0.0, 0.0));
    }

    fn handler(old: f64) -> impl Fn(&str, &Value) -> Value {
        move |method, params| match method {
            "claim_search" => {
                let mut claim = stream_claim(CID, "video", "sd");
                claim["amount"] = json!("1.0");
                claim["meta"]["support_amount"] = json!((9.0 + old).to_string());
                ok(json!({"items": [claim]}))
            }
            "support_list" if params.get("claim_id").is_some() && old > 0.0 => {
                ok(json!({"items": [{"claim_id": CID, "name": "video", "amount": old.to_string()}]}))
            }
            "support_list" => ok(json!({"items": []})),
            "support_create" | "support_abandon" => ok(json!({
                "txid": "beef",
                "total_input": "5.0",
                "total_output": "4.9",
                "total_fee": "0.0001"
            })),
            _ => ok(Value::Null),
        }
    }

    #[tokio::test]
    async fn test_base_support() {
        let server = FakeServer::spawn(handler(2.0)).await;
        let session = test_session(&server.url);

        let base = get_base_support(&session, &ClaimRef::ClaimId(CID.to_string())).await.unwrap();
        assert!((base.existing - 12.0).abs() < 1e-9);
        assert!((base.old - 2.0).abs() < 1e-9);
        assert!((base.base - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_target_creates_when_no_support() {
        let server = FakeServer::spawn(handler(0.0)).await;
        let session = test_session(&server.url);

        let change = target_support(&session, &ClaimRef::ClaimId(CID.to_string()), 15.0).await.unwrap();

        assert!((change.new_support - 5.0).abs() < 1e-9);
        let (method, params) = server.calls().last().cloned().unwrap();
        assert_eq!(method, "support_create");
        assert_eq!(params["amount"], "5.00000000");

        let lines = change.lines();
        assert!(lines.contains(&"Must add:             5.00000000".to_string()));
        assert_eq!(lines.last().unwrap(), "txid: beef");
    }

    #[tokio::test]
    async fn test_target_updates_existing_support() {
        let server = FakeServer::spawn(handler(2.0)).await;
        let session = test_session(&server.url);

        target_support(&session, &ClaimRef::ClaimId(CID.to_string()), 5.0).await.unwrap();

        let (method, params) = server.calls().last().cloned().unwrap();
        assert_eq!(method, "support_abandon");
        assert!(params.get("keep").is_none());
    }

    #[tokio::test]
    async fn test_target_already_reached() {
        let server = FakeServer::spawn(handler(0.0)).await;
        let session = test_session(&server.url);

        let change = target_support(&session, &ClaimRef::ClaimId(CID.to_string()), 10.0).await.unwrap();

        assert!(change.transaction.is_none());
        assert!(!server.methods().iter().any(|m| m.starts_with("support_create")));
    }

    #[tokio::test]
    async fn test_abandon_keeps_amount() {
        let server = FakeServer::spawn(handler(2.0)).await;
        let session = test_session(&server.url);

        abandon_support(&session, &ClaimRef::ClaimId(CID.to_string()), 0.5).await.unwrap();

        let (method, params) = server.calls().last().cloned().unwrap();
        assert_eq!(method, "support_abandon");
        assert_eq!(params["keep"], "0.50000000");
    }

    #[tokio::test]
    async fn test_list_marks_invalid() {
        let server = FakeServer::spawn(|method, params| match method {
            "support_list" => ok(json!({"items": [
                {"claim_id": CID, "name": "video", "amount": "2.0"},
                {"claim_id": "f".repeat(40), "name": "@gone", "amount": "1.0"}
            ]})),
            "claim_search" if params["claim_id"] == CID => ok(json!({"items": [stream_claim(CID, "video", "sd")]})),
            "claim_search" => ok(json!({"items": [], "total_items": 0})),
            _ => ok(Value::Null),
        })
        .await;
        let session = test_session(&server.url);

        let listings = get_all_supports(&session).await.unwrap();
        assert!(listings[0].resolved.is_some());
        assert!(listings[1].resolved.is_none());

        let lines = support_lines(&listings, &SupportListOptions::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("[\"@gone\"]"));

        let only_invalid = SupportListOptions {
            invalid: true,
            ..Default::default()
        };
        assert_eq!(support_lines(&listings, &only_invalid).len(), 1);

        let no_channels = SupportListOptions {
            channels: false,
            ..Default::default()
        };
        assert_eq!(support_lines(&listings, &no_channels).len(), 1);
    }
}
