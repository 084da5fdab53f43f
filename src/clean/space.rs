use crate::clean::delete::delete_single;
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::search::channel::{find_channel, ChannelForm};
use crate::search::sort::sort_items;
use crate::validation::params::{ClaimRef, CleanTarget};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Width of the usage bar
const BAR_WIDTH: usize = 63;

pub const DEFAULT_SIZE_GB: f64 = 1000.0;
pub const DEFAULT_PERCENT: f64 = 90.0;

/// Space on the filesystem holding a directory, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[cfg(unix)]
pub fn disk_usage(dir: &Path) -> Outcome<DiskUsage> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes()).map_err(|_| {
        ToolError::InvalidInput(format!("path contains a NUL byte: {}", dir.display()))
    })?;

    // SAFETY: c_path is NUL-terminated and stat is a plain C struct the call fills in
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(ToolError::io(dir, std::io::Error::last_os_error()));
    }

    let frsize = stat.f_frsize as u64;
    let blocks = stat.f_blocks as u64;
    let bfree = stat.f_bfree as u64;
    let bavail = stat.f_bavail as u64;

    Ok(DiskUsage {
        total: blocks * frsize,
        used: blocks.saturating_sub(bfree) * frsize,
        free: bavail * frsize,
    })
}

#[cfg(not(unix))]
pub fn disk_usage(dir: &Path) -> Outcome<DiskUsage> {
    Err(ToolError::InvalidInput(format!(
        "disk usage is only available on unix systems: {}",
        dir.display()
    )))
}

/// Usage of a directory against a soft limit of `percent` of `size_gb`
#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    pub dir: PathBuf,
    pub size_gb: f64,
    pub percent: f64,
    pub used_gb: f64,
}

impl UsageReport {
    /// Out-of-range size and percent fall back to 1000 GB and 90 %
    pub fn new(dir: impl Into<PathBuf>, size_gb: f64, percent: f64, used_gb: f64) -> Self {
        let size_gb = if size_gb > 0.0 && size_gb.is_finite() {
            size_gb
        } else {
            warn!(size_gb, "Max disk usage should be positive, using {DEFAULT_SIZE_GB} GB");
            DEFAULT_SIZE_GB
        };

        let percent = if percent > 0.0 && percent <= 100.0 {
            percent
        } else {
            warn!(percent, "Percentage should be in (0, 100], using {DEFAULT_PERCENT}");
            DEFAULT_PERCENT
        };

        Self {
            dir: dir.into(),
            size_gb,
            percent,
            used_gb,
        }
    }

    pub fn limit_gb(&self) -> f64 {
        self.size_gb * self.percent / 100.0
    }

    pub fn used_percent(&self) -> f64 {
        self.used_gb / self.size_gb * 100.0
    }

    pub fn above_limit(&self) -> bool {
        self.used_percent() >= self.percent
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Main directory: {}", self.dir.display()),
            format!(
                "Limit: {:.2}% ({:.1} GB) of {:.1} GB",
                self.percent,
                self.limit_gb(),
                self.size_gb
            ),
            format!("Usage: {:.2}% ({:.1} GB)", self.used_percent(), self.used_gb),
        ];

        if self.above_limit() {
            lines.push(">>> Downloads are above the indicated limit.".to_string());
        } else {
            lines.push("Downloads are within limits.".to_string());
        }

        lines.extend(usage_bar(self.size_gb, self.percent, self.used_percent()));
        lines
    }
}

/// Three lines: a `v` over the limit, the bar, and a `^` under the usage
pub fn usage_bar(size_gb: f64, percent: f64, used_percent: f64) -> [String; 3] {
    // NaN or infinite usage (zero-sized filesystem) is drawn at the start
    let position = |p: f64| {
        if p.is_finite() {
            (p / 100.0 * BAR_WIDTH as f64).max(0.0) as usize
        } else {
            0
        }
    };
    let limit = position(percent);
    let mut mark = position(used_percent);

    let bar = if used_percent.is_finite() && used_percent > 100.0 {
        // Past the end, the caret goes under the size label
        mark = BAR_WIDTH + 13;
        format!("|{}| {size_gb:.1} GB", "=".repeat(BAR_WIDTH - 1))
    } else {
        format!(
            "|{}{}| {size_gb:.1} GB",
            "=".repeat(mark),
            ".".repeat((BAR_WIDTH - 1).saturating_sub(mark))
        )
    };

    [
        format!("{}v", " ".repeat(limit)),
        bar,
        format!("{}^", " ".repeat(mark)),
    ]
}

/// A directory that does not exist is replaced by the home directory
pub fn main_dir(dir: Option<&Path>) -> PathBuf {
    match dir {
        Some(dir) if dir.exists() => dir.to_path_buf(),
        other => {
            let home = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
            if let Some(dir) = other {
                warn!(dir = %dir.display(), home = %home.display(), "Directory does not exist, using home");
            }
            home
        }
    }
}

/// Measure the filesystem holding `dir` against the limit
pub fn measure_usage(dir: &Path, size_gb: f64, percent: f64) -> Outcome<UsageReport> {
    let usage = disk_usage(dir)?;
    Ok(UsageReport::new(dir, size_gb, percent, usage.used as f64 / GB))
}

/// A channel listed in `never_delete`, with or without `@` and claim id
pub fn is_protected(channel: &str, never_delete: &[String]) -> bool {
    let bare = |name: &str| {
        let name = name.trim().trim_start_matches('@');
        name.split(['#', ':']).next().unwrap_or(name).to_string()
    };

    let channel = bare(channel);
    never_delete.iter().any(|protected| bare(protected) == channel)
}

/// How `cleanup_space` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Usage was already below the limit
    NothingToDo,
    /// Usage went below the limit after deleting this many claims
    Cleared { deleted: usize },
    /// Every claim was tried and usage is still above the limit
    Exhausted { deleted: usize },
}

/// Delete the oldest downloads until usage of `dir` drops below `percent`
/// of `size_gb`. Claims from channels in `never_delete` are kept.
pub async fn cleanup_space(
    session: &Session,
    dir: &Path,
    size_gb: f64,
    percent: f64,
    never_delete: &[String],
    target: CleanTarget,
) -> Outcome<CleanupOutcome> {
    let mut measure = || -> Outcome<UsageReport> {
        let report = measure_usage(dir, size_gb, percent)?;
        for line in report.lines() {
            info!("{line}");
        }
        Ok(report)
    };

    cleanup_with(session, never_delete, target, &mut measure).await
}

pub(crate) async fn cleanup_with<M>(
    session: &Session,
    never_delete: &[String],
    target: CleanTarget,
    measure: &mut M,
) -> Outcome<CleanupOutcome>
where
    M: FnMut() -> Outcome<UsageReport>,
{
    if !measure()?.above_limit() {
        info!("Nothing to clean up");
        return Ok(CleanupOutcome::NothingToDo);
    }

    let items = sort_items(&session.daemon, None, false).await?;
    let n_items = items.len();
    let mut deleted = 0;

    for (num, item) in items.iter().enumerate() {
        let claim = ClaimRef::ClaimId(item.claim_id.clone());

        if !never_delete.is_empty() {
            // Claims removed from the network only have the local channel name
            let channel = match find_channel(&session.daemon, &claim, ChannelForm::Short, false).await
            {
                Ok(channel) => Some(channel),
                Err(e) => {
                    debug!(claim_id = %item.claim_id, error = %e, "Channel lookup failed, using local record");
                    item.channel_name.clone()
                }
            };
            if let Some(channel) = channel.filter(|ch| is_protected(ch, never_delete)) {
                info!(index = num + 1, total = n_items, claim_name = %item.claim_name, channel = %channel, "Protected channel, skipping");
                continue;
            }
        }

        info!(index = num + 1, total = n_items, claim_name = %item.claim_name, "Deleting");
        // Items come from the local file list, so look them up offline
        match delete_single(session, &claim, true, target).await {
            Ok(_) => deleted += 1,
            Err(e) => {
                warn!(claim_id = %item.claim_id, error = %e, "Delete failed, continuing");
                continue;
            }
        }

        if !measure()?.above_limit() {
            info!(deleted, "Usage below limit, stop deleting");
            return Ok(CleanupOutcome::Cleared { deleted });
        }
    }

    warn!(deleted, "Went through all downloaded claims and failed to clear enough space");
    Ok(CleanupOutcome::Exhausted { deleted })
}
