//! Command line interface.

use crate::blobs::action::{blobs_action, resolve_blob_dir};
use crate::blobs::count::{blob_info_lines, count_blobs, count_blobs_all, redownload_blobs};
use crate::blobs::ratio::blobs_ratio;
use crate::clean::delete::{delete_single, Deleted};
use crate::clean::multi::{ch_cleanup_multi, remove_claims, remove_media, DeleteBatch};
use crate::clean::space::{cleanup_space, main_dir, CleanupOutcome, DEFAULT_PERCENT, DEFAULT_SIZE_GB};
use crate::comments::ops::{
    abandon_comment, comment_result_lines, create_comment, list_comments, update_comment, ListOptions,
};
use crate::comments::render::RenderOptions;
use crate::core::error::Outcome;
use crate::core::state::Session;
use crate::download::multi::{
    ch_download_latest_multi, download_claims, multi_list_lines, redownload_latest, BatchResult,
};
use crate::download::single::{download_single, info_post_get, info_pre_get, info_pre_get_offline, DownloadOptions};
use crate::models::peer::PeerAggregate;
use crate::peers::aggregate::merge_channels;
use crate::peers::channels::{ch_search_ch_peers, search_ch_peers};
use crate::peers::search::search_claims_peers;
use crate::peers::summary::{channel_lines, claims_lines, multi_summary_lines, summary_lines, LineOptions};
use crate::report::summary::{list_channels, print_summary, ChannelListOptions, ItemOptions};
use crate::search::channel::ChannelForm;
use crate::search::claim_file::ClaimSource;
use crate::search::item::{search_item, search_item_offline};
use crate::search::sort::sort_items_size;
use crate::subscriptions::ops::{list_ch_subs_peers, search_ch_subs, search_ch_subs_latest, SubsFilter, SubsOptions};
use crate::subscriptions::render::{latest_lines, subs_lines, LatestOptions};
use crate::supports::ops::{
    abandon_support, abandon_support_invalid, create_support, list_supports, target_support,
    SupportListOptions,
};
use crate::utils::channels::{process_channels, ChannelSpec};
use crate::utils::output::{print_content, OutputTarget};
use crate::utils::time::now_stamp;
use crate::validation::params::{BlobAction, ClaimRef, CleanTarget, ShowFilter};
use anyhow::Result;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download, seed, clean up and inspect claims through a local LBRY daemon",
    long_about = None,
    name = "claimkit",
)]
pub struct Cli {
    /// Configuration file. Defaults to `./claimkit.toml` when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where reports are written
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Write the report to this file instead of stdout
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,
    /// Prefix the report file name with the current date
    #[arg(long, global = true)]
    pub date: bool,
    /// Field separator in reports
    #[arg(long, global = true, default_value = ";")]
    pub sep: String,
}

impl OutputArgs {
    fn target(&self) -> OutputTarget {
        match &self.file {
            Some(file) => OutputTarget::file(file, self.date),
            None => OutputTarget::stdout(),
        }
    }
}

/// A claim by URI, claim id or name, in that order of precedence
#[derive(Args, Debug, Clone)]
pub struct ClaimArgs {
    /// `lbry://@channel#3/name#2`, or part of it
    #[arg(long)]
    pub uri: Option<String>,
    #[arg(long)]
    pub claim_id: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
}

impl ClaimArgs {
    fn claim(&self) -> Outcome<ClaimRef> {
        ClaimRef::select(self.uri.as_deref(), self.claim_id.as_deref(), self.name.as_deref())
    }
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Download directory, the home directory by default
    #[arg(long)]
    pub ddir: Option<PathBuf>,
    /// Put every claim directly in the download directory instead of a
    /// subdirectory per channel
    #[arg(long)]
    pub flat: bool,
    /// Only fetch the blobs, do not write the media file
    #[arg(long)]
    pub blobs_only: bool,
}

impl DownloadArgs {
    fn options(&self) -> DownloadOptions {
        DownloadOptions {
            ddir: self.ddir.clone(),
            own_dir: !self.flat,
            save_file: !self.blobs_only,
        }
    }
}

/// Claims numbered `start..=end` from a claim file, or from the local
/// downloads when no file is given
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// File with one claim id per line, in any column
    #[arg(long)]
    pub claim_file: Option<PathBuf>,
    /// Column separator of the claim file
    #[arg(long, default_value = ",")]
    pub claim_file_sep: String,
    #[arg(long, default_value_t = 1)]
    pub start: usize,
    /// Last claim to process, 0 for all
    #[arg(long, default_value_t = 0)]
    pub end: usize,
}

impl SourceArgs {
    fn source(&self) -> ClaimSource {
        match &self.claim_file {
            Some(path) => ClaimSource::File {
                path: path.clone(),
                sep: self.claim_file_sep.clone(),
            },
            None => ClaimSource::Local,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PeerLineArgs {
    /// Show the claim id of every claim
    #[arg(long)]
    pub cid: bool,
    /// Hide the value and stream type columns
    #[arg(long)]
    pub no_type: bool,
    /// Show titles instead of claim names
    #[arg(long)]
    pub title: bool,
    /// Replace emojis and other symbols
    #[arg(long)]
    pub sanitize: bool,
    /// Local time instead of UTC
    #[arg(long)]
    pub local_time: bool,
    /// One line per claim instead of a paragraph
    #[arg(long)]
    pub inline: bool,
}

impl PeerLineArgs {
    fn options(&self, sep: &str) -> LineOptions {
        LineOptions {
            cid: self.cid,
            typ: !self.no_type,
            title: self.title,
            sanitize: self.sanitize,
            local_time: self.local_time,
            sep: sep.to_string(),
        }
    }
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// Check that the daemon is running
    Check,
    /// Show the details of a claim
    Resolve {
        #[command(flatten)]
        claim: ClaimArgs,
        /// Look the claim up in the local downloads only
        #[arg(long)]
        offline: bool,
    },
    /// Download one claim
    Download {
        #[command(flatten)]
        claim: ClaimArgs,
        /// The claim no longer resolves; rebuild it from local blobs
        #[arg(long)]
        invalid: bool,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Download the newest claims of several channels
    DownloadChannels {
        /// `@channel` or `@channel=N`
        #[arg(required = true)]
        channels: Vec<String>,
        /// Claims per channel, overriding the per-channel counts
        #[arg(long)]
        number: Option<usize>,
        #[arg(long)]
        shuffle: bool,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Download again the newest local claims to complete their blobs
    Redownload {
        #[arg(long, default_value_t = 2)]
        number: usize,
        /// Pick random claims instead of the newest
        #[arg(long)]
        shuffle: bool,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Download the claims listed in a file, or every local claim again
    DownloadFile {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        invalid: bool,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Delete the media file or blobs of one claim
    Delete {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        invalid: bool,
        #[arg(long, value_enum, default_value = "media")]
        what: CleanTarget,
    },
    /// Delete the oldest claims until disk usage is under the limit
    Cleanup {
        /// Directory on the filesystem to measure, the home directory by default
        #[arg(long)]
        main_dir: Option<PathBuf>,
        /// Space set aside for downloads, in GB
        #[arg(long, default_value_t = DEFAULT_SIZE_GB)]
        size: f64,
        /// Share of `size` that may be used before cleaning up
        #[arg(long, default_value_t = DEFAULT_PERCENT)]
        percent: f64,
        /// Channels whose claims are never deleted
        #[arg(long)]
        never_delete: Vec<String>,
        #[arg(long, value_enum, default_value = "media")]
        what: CleanTarget,
    },
    /// Delete the oldest claims of several channels, keeping the newest
    CleanChannels {
        /// `@channel` or `@channel=N`, where N claims are kept
        #[arg(required = true)]
        channels: Vec<String>,
        /// Claims kept per channel, overriding the per-channel counts
        #[arg(long)]
        keep: Option<usize>,
        #[arg(long, value_enum, default_value = "media")]
        what: CleanTarget,
    },
    /// Delete every downloaded media file, keeping the blobs
    RemoveMedia {
        #[arg(long)]
        never_delete: Vec<String>,
    },
    /// Delete the claims listed in a file, or every local claim
    RemoveClaims {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        invalid: bool,
        #[arg(long, value_enum, default_value = "media")]
        what: CleanTarget,
    },
    /// Inspect, fetch and announce blobs
    #[command(subcommand)]
    Blobs(BlobsCommand),
    /// Read and write comments
    #[command(subcommand)]
    Comments(CommentsCommand),
    /// Count the peers that host claims
    #[command(subcommand)]
    Peers(PeersCommand),
    /// Manage our supports
    #[command(subcommand)]
    Supports(SupportsCommand),
    /// Channels we follow
    #[command(subcommand)]
    Subs(SubsCommand),
    /// List the downloaded claims
    Summary {
        #[arg(long, value_enum, default_value = "all")]
        show: ShowFilter,
        #[arg(long)]
        title: bool,
        #[arg(long = "type")]
        typ: bool,
        #[arg(long)]
        path: bool,
        #[arg(long)]
        no_cid: bool,
        #[arg(long)]
        no_blobs: bool,
        /// Show the channel of every claim
        #[arg(long)]
        ch: bool,
        /// Read channels from the local record instead of resolving them
        #[arg(long)]
        ch_offline: bool,
        #[arg(long)]
        no_name: bool,
        #[arg(long, default_value_t = 1)]
        start: usize,
        #[arg(long, default_value_t = 0)]
        end: usize,
        /// Only claims whose channel contains this text
        #[arg(long)]
        channel: Option<String>,
        /// Only claims that no longer resolve
        #[arg(long)]
        invalid: bool,
        /// Newest first
        #[arg(long)]
        reverse: bool,
        /// Only the totals: claims, size and duration
        #[arg(long)]
        totals: bool,
    },
    /// List the channels of the downloaded claims
    Channels {
        #[arg(long, value_enum, default_value = "full")]
        form: ChannelForm,
        #[arg(long)]
        invalid: bool,
        /// Every channel on one line
        #[arg(long)]
        simple: bool,
        #[arg(long)]
        no_number: bool,
    },
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum BlobsCommand {
    /// Check which blobs of a claim are on disk
    Count {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        blob_dir: Option<PathBuf>,
        /// List every blob
        #[arg(long)]
        each: bool,
    },
    /// Check the blobs of every downloaded claim
    CountAll {
        #[arg(long)]
        blob_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        start: usize,
        #[arg(long, default_value_t = 0)]
        end: usize,
    },
    /// Fetch or announce every blob in the blob directory
    Action {
        #[arg(long)]
        blob_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "get")]
        action: BlobAction,
        #[arg(long, default_value_t = 1)]
        start: usize,
        #[arg(long, default_value_t = 0)]
        end: usize,
    },
    /// Download a claim again when some of its blobs are missing
    Redownload {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        blob_dir: Option<PathBuf>,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Estimate the upload/download ratio from the daemon logs
    Ratio {
        /// Daemon data directory, taken from the daemon by default
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum CommentsCommand {
    /// Show the comments of a claim as a tree
    List {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        hidden: bool,
        #[arg(long)]
        visible: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 999)]
        page_size: u32,
        /// Only top-level comments
        #[arg(long)]
        no_replies: bool,
        /// Whole comments instead of a preview
        #[arg(long)]
        full: bool,
        #[arg(long)]
        sanitize: bool,
    },
    /// Comment on a claim
    Create {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        text: String,
        /// Channel that signs the comment, `@name` or a claim id
        #[arg(long)]
        author: String,
        /// Reply to this comment
        #[arg(long)]
        parent_id: Option<String>,
    },
    /// Edit a comment
    Update {
        #[arg(long)]
        comment_id: String,
        #[arg(long)]
        text: String,
    },
    /// Delete a comment
    Abandon {
        #[arg(long)]
        comment_id: String,
    },
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum PeersCommand {
    /// Peers hosting one claim
    Claim {
        #[command(flatten)]
        claim: ClaimArgs,
        #[command(flatten)]
        lines: PeerLineArgs,
    },
    /// Peers hosting a list of claims, given as URIs or claim ids
    Claims {
        #[arg(required = true)]
        claims: Vec<String>,
        #[command(flatten)]
        lines: PeerLineArgs,
    },
    /// Peers hosting the newest claims of a channel
    Channel {
        channel: String,
        #[arg(long, default_value_t = 50)]
        number: usize,
        #[command(flatten)]
        lines: PeerLineArgs,
    },
    /// Peers of several channels, summarized per channel
    Channels {
        /// `@channel` or `@channel=N`
        #[arg(required = true)]
        channels: Vec<String>,
        /// Claims per channel, overriding the per-channel counts
        #[arg(long)]
        number: Option<usize>,
        #[arg(long)]
        shuffle: bool,
    },
    /// Peers of the channels we follow, summarized per channel
    Subs {
        /// Claims per channel
        #[arg(long, default_value_t = 2)]
        number: usize,
        #[arg(long)]
        shuffle: bool,
        /// First followed channel to search, 1-based
        #[arg(long, default_value_t = 1)]
        start: usize,
        /// Last followed channel to search, 0 for all
        #[arg(long, default_value_t = 0)]
        end: usize,
        /// Read the local subscription database instead of the synced one
        #[arg(long)]
        local: bool,
        /// Also search channels that no longer resolve
        #[arg(long)]
        include_invalid: bool,
    },
}

/// Which followed channels to show
#[derive(Args, Debug, Clone)]
pub struct SubsArgs {
    /// Read the local subscription database instead of the synced one
    #[arg(long)]
    pub local: bool,
    #[arg(long, value_enum, default_value = "all")]
    pub filter: SubsFilter,
    /// With `valid` or `both`, keep the channels that no longer resolve
    #[arg(long)]
    pub invalid: bool,
    /// With `notifications` or `both`, keep the channels with
    /// notifications on instead of off
    #[arg(long)]
    pub notifications: bool,
}

impl SubsArgs {
    fn options(&self) -> SubsOptions {
        SubsOptions {
            shared: !self.local,
            filter: self.filter,
            valid: !self.invalid,
            notifications: self.notifications,
        }
    }
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum SubsCommand {
    /// List the followed channels and whether they still resolve
    List {
        #[command(flatten)]
        subs: SubsArgs,
        #[arg(long)]
        claim_id: bool,
    },
    /// The newest claims of every followed channel
    Latest {
        #[command(flatten)]
        subs: SubsArgs,
        #[arg(long, default_value_t = 4)]
        number: usize,
        #[arg(long)]
        claim_id: bool,
        /// Hide the claim type columns
        #[arg(long)]
        no_type: bool,
        #[arg(long)]
        title: bool,
        #[arg(long)]
        sanitize: bool,
        #[arg(long, default_value_t = 1)]
        start: usize,
        /// Last channel to show, 0 for all
        #[arg(long, default_value_t = 0)]
        end: usize,
    },
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
pub enum SupportsCommand {
    /// List our supports
    List {
        #[arg(long)]
        claim_id: bool,
        /// Only supports on claims that no longer resolve
        #[arg(long)]
        invalid: bool,
        /// Show the trending scores separately
        #[arg(long)]
        separate: bool,
        #[arg(long)]
        no_claims: bool,
        #[arg(long)]
        no_channels: bool,
    },
    /// Add a support to a claim
    Create {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        amount: f64,
    },
    /// Remove our supports from a claim
    Abandon {
        #[command(flatten)]
        claim: ClaimArgs,
        /// Amount left as a new support
        #[arg(long, default_value_t = 0.0)]
        keep: f64,
        /// The claim no longer resolves
        #[arg(long)]
        invalid: bool,
    },
    /// Add or remove support until our support reaches an amount
    Target {
        #[command(flatten)]
        claim: ClaimArgs,
        #[arg(long)]
        target: f64,
    },
}

fn parse_channels(channels: &[String], number: Option<usize>, shuffle: bool) -> Outcome<Vec<ChannelSpec>> {
    let specs = channels
        .iter()
        .map(|ch| ChannelSpec::parse(ch))
        .collect::<Outcome<Vec<_>>>()?;
    process_channels(specs, number, shuffle)
}

fn deleted_lines(deleted: &Deleted) -> Vec<String> {
    let mut lines = vec![
        format!("claim_name: {}", deleted.claim_name),
        format!("claim_id: {}", deleted.claim_id),
        format!("blobs: {}/{}", deleted.blobs_completed, deleted.blobs_in_stream),
    ];
    if let Some(path) = &deleted.media_removed {
        lines.push(format!("Deleted media: {}", path.display()));
    }
    if deleted.blobs_removed {
        lines.push("Deleted blobs".to_string());
    }
    lines
}

fn batch_lines(batch: &DeleteBatch, sep: &str) -> Vec<String> {
    let n = batch.len();
    batch
        .iter()
        .enumerate()
        .map(|(num, result)| match result {
            Ok(d) => format!("{:4}/{n:4}{sep} {}{sep} \"{}\"", num + 1, d.claim_id, d.claim_name),
            Err(e) => format!("{:4}/{n:4}{sep} \"{e}\"", num + 1),
        })
        .collect()
}

fn download_lines(results: BatchResult, sep: &str) -> Vec<String> {
    multi_list_lines(&[Ok(results)], sep)
}

impl Cli {
    /// Run the command and write its report
    pub async fn execute(self, session: &Session) -> Result<()> {
        let target = self.output.target();
        let sep = self.output.sep.clone();

        let lines = run(self.command, session, &sep).await?;
        if !lines.is_empty() {
            print_content(&lines, &target)?;
        }
        Ok(())
    }
}

async fn run(command: Command, session: &Session, sep: &str) -> Result<Vec<String>> {
    let lines = match command {
        Command::Check => {
            session.daemon.server_exists().await?;
            vec![format!("Daemon running at {}", session.daemon.endpoint())]
        }
        Command::Resolve { claim, offline } => {
            let claim = claim.claim()?;
            if offline {
                info_pre_get_offline(&search_item_offline(&session.daemon, &claim).await?)
            } else {
                info_pre_get(&search_item(&session.daemon, &claim).await?)
            }
        }
        Command::Download {
            claim,
            invalid,
            download,
        } => {
            let info = download_single(session, &claim.claim()?, invalid, &download.options()).await?;
            info_post_get(&info)
        }
        Command::DownloadChannels {
            channels,
            number,
            shuffle,
            download,
        } => {
            let specs = parse_channels(&channels, number, shuffle)?;
            let results = ch_download_latest_multi(session, specs, &download.options()).await;
            multi_list_lines(&results, sep)
        }
        Command::Redownload {
            number,
            shuffle,
            download,
        } => download_lines(redownload_latest(session, number, shuffle, &download.options()).await?, sep),
        Command::DownloadFile {
            source,
            invalid,
            download,
        } => {
            let results = download_claims(
                session,
                &source.source(),
                source.start,
                source.end,
                invalid,
                &download.options(),
            )
            .await?;
            download_lines(results, sep)
        }
        Command::Delete { claim, invalid, what } => {
            deleted_lines(&delete_single(session, &claim.claim()?, invalid, what).await?)
        }
        Command::Cleanup {
            main_dir: dir,
            size,
            percent,
            never_delete,
            what,
        } => {
            let dir = main_dir(dir.as_deref());
            let outcome = cleanup_space(session, &dir, size, percent, &never_delete, what).await?;
            vec![match outcome {
                CleanupOutcome::NothingToDo => "Usage within the limit, nothing deleted".to_string(),
                CleanupOutcome::Cleared { deleted } => format!("Usage within the limit after deleting {deleted} claims"),
                CleanupOutcome::Exhausted { deleted } => {
                    format!("Deleted {deleted} claims and usage is still above the limit")
                }
            }]
        }
        Command::CleanChannels { channels, keep, what } => {
            let specs = parse_channels(&channels, keep, false)?;
            let names: Vec<String> = specs.iter().map(|s| s.channel.clone()).collect();
            let results = ch_cleanup_multi(session, specs, what).await;

            let mut lines = Vec::new();
            for (channel, result) in names.iter().zip(results) {
                lines.push(channel.clone());
                match result {
                    Ok(batch) => lines.extend(batch_lines(&batch, sep)),
                    Err(e) => lines.push(format!("  \"{e}\"")),
                }
            }
            lines
        }
        Command::RemoveMedia { never_delete } => {
            let removed = remove_media(session, &never_delete).await?;
            let mut lines: Vec<String> = removed.iter().map(|p| p.display().to_string()).collect();
            lines.push(format!("Media files removed: {}", removed.len()));
            lines
        }
        Command::RemoveClaims { source, invalid, what } => {
            let batch = remove_claims(session, &source.source(), source.start, source.end, invalid, what).await?;
            batch_lines(&batch, sep)
        }
        Command::Blobs(command) => run_blobs(command, session, sep).await?,
        Command::Comments(command) => run_comments(command, session).await?,
        Command::Peers(command) => run_peers(command, session, sep).await?,
        Command::Supports(command) => run_supports(command, session, sep).await?,
        Command::Subs(command) => run_subs(command, session, sep).await?,
        Command::Summary {
            show,
            title,
            typ,
            path,
            no_cid,
            no_blobs,
            ch,
            ch_offline,
            no_name,
            start,
            end,
            channel,
            invalid,
            reverse,
            totals,
        } => {
            if totals {
                sort_items_size(&session.daemon, channel.as_deref(), reverse, invalid)
                    .await?
                    .lines()
            } else {
                let opts = ItemOptions {
                    show,
                    title,
                    typ,
                    path,
                    cid: !no_cid,
                    blobs: !no_blobs,
                    ch,
                    ch_online: !ch_offline,
                    name: !no_name,
                    start,
                    end,
                    channel,
                };
                print_summary(session, &opts, invalid, reverse).await?
            }
        }
        Command::Channels {
            form,
            invalid,
            simple,
            no_number,
        } => {
            let opts = ChannelListOptions {
                form,
                invalid,
                simple,
                pre_num: !no_number,
                sep: sep.to_string(),
            };
            list_channels(session, &opts).await?
        }
    };
    Ok(lines)
}

async fn run_blobs(command: BlobsCommand, session: &Session, sep: &str) -> Result<Vec<String>> {
    let lines = match command {
        BlobsCommand::Count { claim, blob_dir, each } => {
            let blob_dir = resolve_blob_dir(session, blob_dir.as_deref()).await?;
            blob_info_lines(&count_blobs(session, &claim.claim()?, &blob_dir).await?, each)
        }
        BlobsCommand::CountAll { blob_dir, start, end } => {
            let blob_dir = resolve_blob_dir(session, blob_dir.as_deref()).await?;
            count_blobs_all(session, &blob_dir, start, end).await?.lines()
        }
        BlobsCommand::Action {
            blob_dir,
            action,
            start,
            end,
        } => {
            let blob_dir = resolve_blob_dir(session, blob_dir.as_deref()).await?;
            let results = blobs_action(session, &blob_dir, action, start, end).await?;
            let failed = results.iter().filter(|r| r.is_err()).count();
            vec![
                format!("Blobs processed: {}", results.len()),
                format!("Failed: {failed}"),
            ]
        }
        BlobsCommand::Redownload {
            claim,
            blob_dir,
            download,
        } => {
            let blob_dir = resolve_blob_dir(session, blob_dir.as_deref()).await?;
            let started = redownload_blobs(session, &claim.claim()?, &blob_dir, &download.options()).await?;
            vec![if started {
                "Missing blobs, download started".to_string()
            } else {
                "All blob files present".to_string()
            }]
        }
        BlobsCommand::Ratio { data_dir } => {
            let data_dir = match data_dir {
                Some(dir) => dir,
                None => session.daemon.settings().await?.data_dir,
            };
            blobs_ratio(&data_dir, Local::now())?.lines(sep)
        }
    };
    Ok(lines)
}

async fn run_comments(command: CommentsCommand, session: &Session) -> Result<Vec<String>> {
    let lines = match command {
        CommentsCommand::List {
            claim,
            hidden,
            visible,
            page,
            page_size,
            no_replies,
            full,
            sanitize,
        } => {
            let opts = ListOptions {
                page,
                page_size,
                hidden,
                visible,
            };
            let render = RenderOptions {
                sub_replies: !no_replies,
                full,
                sanitize,
            };
            list_comments(session, &claim.claim()?, &opts).await?.lines(&render)
        }
        CommentsCommand::Create {
            claim,
            text,
            author,
            parent_id,
        } => {
            let author = ClaimRef::guess(&author);
            let created = create_comment(session, &text, &claim.claim()?, &author, parent_id.as_deref()).await?;
            comment_result_lines(&created)
        }
        CommentsCommand::Update { comment_id, text } => {
            comment_result_lines(&update_comment(session, &text, &comment_id).await?)
        }
        CommentsCommand::Abandon { comment_id } => comment_result_lines(&abandon_comment(session, &comment_id).await?),
    };
    Ok(lines)
}

/// Peer searches can take minutes, so the report carries its start and
/// end time
async fn run_peers(command: PeersCommand, session: &Session, sep: &str) -> Result<Vec<String>> {
    let start = now_stamp();
    let claim_threads = session.config.peers.claim_threads;

    let mut lines = match command {
        PeersCommand::Claim { claim, lines } => {
            let agg = search_claims_peers(session, vec![claim.claim()?], 1).await?;
            let mut out = claims_lines(&agg, &lines.options(sep), lines.inline);
            out.extend(summary_lines(&agg));
            out
        }
        PeersCommand::Claims { claims, lines } => {
            let claims = claims.iter().map(|c| ClaimRef::guess(c)).collect();
            let agg = search_claims_peers(session, claims, claim_threads).await?;
            let mut out = claims_lines(&agg, &lines.options(sep), lines.inline);
            out.extend(summary_lines(&agg));
            out
        }
        PeersCommand::Channel { channel, number, lines } => {
            let agg = search_ch_peers(session, &channel, number, claim_threads).await?;
            let mut out = claims_lines(&agg, &lines.options(sep), lines.inline);
            out.extend(summary_lines(&agg));
            out
        }
        PeersCommand::Channels {
            channels,
            number,
            shuffle,
        } => {
            let specs = parse_channels(&channels, number, shuffle)?;
            let results = ch_search_ch_peers(session, specs).await;
            multi_channel_lines(results, sep)
        }
        PeersCommand::Subs {
            number,
            shuffle,
            start,
            end,
            local,
            include_invalid,
        } => {
            let results = list_ch_subs_peers(session, !local, !include_invalid, number, start, end, shuffle).await?;
            multi_channel_lines(results, sep)
        }
    };

    let end = now_stamp();
    info!(start = %start, end = %end, "Peer search finished");
    lines.push(format!("start: {start}"));
    lines.push(format!("end:   {end}"));
    Ok(lines)
}

fn multi_channel_lines(results: Vec<Option<PeerAggregate>>, sep: &str) -> Vec<String> {
    let mut out = channel_lines(&results, sep);
    if let Some(merged) = merge_channels(results) {
        out.push(String::new());
        out.extend(multi_summary_lines(&merged));
    }
    out
}

async fn run_subs(command: SubsCommand, session: &Session, sep: &str) -> Result<Vec<String>> {
    let lines = match command {
        SubsCommand::List { subs, claim_id } => {
            let found = search_ch_subs(session, &subs.options()).await?;
            subs_lines(&found, claim_id, sep)
        }
        SubsCommand::Latest {
            subs,
            number,
            claim_id,
            no_type,
            title,
            sanitize,
            start,
            end,
        } => {
            let results = search_ch_subs_latest(session, &subs.options(), number).await?;
            let opts = LatestOptions {
                claim_id,
                typ: !no_type,
                title,
                sanitize,
                start,
                end,
                sep: sep.to_string(),
            };
            latest_lines(&results, &opts)
        }
    };
    Ok(lines)
}

async fn run_supports(command: SupportsCommand, session: &Session, sep: &str) -> Result<Vec<String>> {
    let lines = match command {
        SupportsCommand::List {
            claim_id,
            invalid,
            separate,
            no_claims,
            no_channels,
        } => {
            let opts = SupportListOptions {
                show_claim_id: claim_id,
                invalid,
                combine: !separate,
                claims: !no_claims,
                channels: !no_channels,
                sep: sep.to_string(),
            };
            list_supports(session, &opts).await?
        }
        SupportsCommand::Create { claim, amount } => create_support(session, &claim.claim()?, amount).await?.lines(),
        SupportsCommand::Abandon { claim, keep, invalid } => {
            let claim = claim.claim()?;
            let change = if invalid {
                abandon_support_invalid(session, &claim, keep).await?
            } else {
                abandon_support(session, &claim, keep).await?
            };
            change.lines()
        }
        SupportsCommand::Target { claim, target } => target_support(session, &claim.claim()?, target).await?.lines(),
    };
    Ok(lines)
}
