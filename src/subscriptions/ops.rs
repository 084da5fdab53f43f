use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::models::claim::Claim;
use crate::models::peer::PeerAggregate;
use crate::models::subscription::{Followed, Preferences};
use crate::peers::channels::ch_search_ch_peers;
use crate::search::channel::ch_search_latest;
use crate::search::item::search_item;
use crate::utils::channels::{process_channels, ChannelSpec};
use crate::utils::pool::run_bounded;
use crate::validation::params::ClaimRef;
use clap::ValueEnum;
use serde_json::json;
use tracing::{info, warn};

/// Which followed channels to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SubsFilter {
    /// Every followed channel
    #[default]
    All,
    /// By whether the channel still resolves
    Valid,
    /// By whether notifications are on
    Notifications,
    /// By validity first, then by notifications
    Both,
}

#[derive(Debug, Clone)]
pub struct SubsOptions {
    /// Read the synced database, falling back to the local one
    pub shared: bool,
    pub filter: SubsFilter,
    /// Keep channels that resolve, or with `false` those that do not
    pub valid: bool,
    /// Keep channels with notifications on, or with `false` those with
    /// notifications off
    pub notifications: bool,
}

impl Default for SubsOptions {
    fn default() -> Self {
        Self {
            shared: true,
            filter: SubsFilter::All,
            valid: true,
            notifications: false,
        }
    }
}

/// A followed channel and its claim, `None` when it no longer resolves
#[derive(Debug, Clone)]
pub struct Subscription {
    pub followed: Followed,
    pub resolved: Option<Claim>,
}

impl Subscription {
    pub fn is_valid(&self) -> bool {
        self.resolved.is_some()
    }
}

/// The newest claims of a followed channel, `None` when the search failed
#[derive(Debug, Clone)]
pub struct ChannelLatest {
    /// `@name#abc`
    pub channel: String,
    pub claim_id: String,
    pub claims: Option<Vec<Claim>>,
}

/// Followed channels from the wallet preferences
pub async fn following(session: &Session, shared: bool) -> Outcome<Vec<Followed>> {
    let prefs: Preferences = session.daemon.call("preference_get", json!({})).await?;
    info!(sync = prefs.enable_sync, "Read wallet preferences");

    let store = match (shared, prefs.shared, prefs.local) {
        (true, Some(shared), _) => {
            info!("Database: shared");
            shared
        }
        (_, _, Some(local)) => {
            if shared {
                warn!("No shared database, using local");
            } else {
                info!("Database: local");
            }
            local
        }
        (_, _, None) => return Err(ToolError::NotFound("no subscription database in the wallet".to_string())),
    };

    Ok(store.value.following)
}

/// Followed channels, resolved online and filtered.
///
/// Channels are resolved `claim_threads` at a time. A channel that fails to
/// resolve for any reason counts as invalid.
pub async fn search_ch_subs(session: &Session, opts: &SubsOptions) -> Outcome<Vec<Subscription>> {
    let followed = following(session, opts.shared).await?;
    let threads = session.config.peers.claim_threads;
    info!(channels = followed.len(), threads, "Resolving followed channels");

    let task_session = session.clone();
    let slots = run_bounded(followed.clone(), threads, move |ch: Followed| {
        let session = task_session.clone();
        async move {
            match search_item(&session.daemon, &ClaimRef::Uri(ch.uri.clone())).await {
                Ok(claim) => Some(claim),
                Err(e) => {
                    warn!(channel = %ch.uri, error = %e, "Channel does not resolve");
                    None
                }
            }
        }
    })
    .await;

    let subs: Vec<Subscription> = followed
        .into_iter()
        .zip(slots)
        .map(|(followed, slot)| Subscription {
            followed,
            resolved: slot.flatten(),
        })
        .collect();

    Ok(filter_subs(subs, opts))
}

pub fn filter_subs(subs: Vec<Subscription>, opts: &SubsOptions) -> Vec<Subscription> {
    let by_valid = |s: &Subscription| s.is_valid() == opts.valid;
    let by_notif = |s: &Subscription| s.followed.notifications() == opts.notifications;

    subs.into_iter()
        .filter(|s| match opts.filter {
            SubsFilter::All => true,
            SubsFilter::Valid => by_valid(s),
            SubsFilter::Notifications => by_notif(s),
            SubsFilter::Both => by_valid(s) && by_notif(s),
        })
        .collect()
}

/// The newest `number` claims of every filtered followed channel.
/// Channels run `channel_threads` at a time.
pub async fn search_ch_subs_latest(
    session: &Session,
    opts: &SubsOptions,
    number: usize,
) -> Outcome<Vec<ChannelLatest>> {
    let number = number.max(1);
    let subs = search_ch_subs(session, opts).await?;
    if subs.is_empty() {
        return Err(ToolError::NotFound("no followed channels left after filtering".to_string()));
    }

    let threads = session.config.peers.channel_threads;
    info!(channels = subs.len(), number, threads, "Searching followed channels");

    let targets: Vec<(String, String)> = subs
        .iter()
        .map(|s| (s.followed.short_name(), s.followed.name_and_id().1.to_string()))
        .collect();

    let task_session = session.clone();
    let slots = run_bounded(targets.clone(), threads, move |(channel, _)| {
        let session = task_session.clone();
        async move {
            match ch_search_latest(&session.daemon, &channel, number).await {
                Ok(claims) => Some(claims),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Channel search failed");
                    None
                }
            }
        }
    })
    .await;

    Ok(targets
        .into_iter()
        .zip(slots)
        .map(|((channel, claim_id), slot)| ChannelLatest {
            channel,
            claim_id,
            claims: slot.flatten(),
        })
        .collect())
}

/// Peer search input for the followed channels numbered `start..=end`
/// (1-based, `end = 0` for the last). Channels that no longer resolve are
/// kept in brackets so they report zero streams.
pub fn subs_channel_specs(subs: &[Subscription], number: usize, start: usize, end: usize) -> Vec<ChannelSpec> {
    subs.iter()
        .enumerate()
        .map(|(idx, sub)| (idx + 1, sub))
        .filter(|(num, _)| *num >= start && (end == 0 || *num <= end))
        .map(|(_, sub)| {
            let name = sub.followed.short_name();
            ChannelSpec {
                channel: if sub.is_valid() { name } else { format!("[{name}]") },
                number,
            }
        })
        .collect()
}

/// Peers of the newest `number` claims of every followed channel.
///
/// With `valid_only`, channels that no longer resolve are left out;
/// otherwise they are searched and come back empty.
pub async fn list_ch_subs_peers(
    session: &Session,
    shared: bool,
    valid_only: bool,
    number: usize,
    start: usize,
    end: usize,
    shuffle: bool,
) -> Outcome<Vec<Option<PeerAggregate>>> {
    let opts = SubsOptions {
        shared,
        filter: if valid_only { SubsFilter::Valid } else { SubsFilter::All },
        valid: true,
        notifications: false,
    };

    let subs = search_ch_subs(session, &opts).await?;
    let specs = process_channels(subs_channel_specs(&subs, number, start, end), None, shuffle)?;

    Ok(ch_search_ch_peers(session, specs).await)
}
