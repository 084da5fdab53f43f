use crate::core::error::{Outcome, ToolError};
use crate::utils::time::{format_local, TFMT};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SECS_PER_DAY: f64 = 86400.0;

/// Rotated daemon logs, newest first
pub fn log_files(data_dir: &Path) -> Vec<PathBuf> {
    std::iter::once("lbrynet.log".to_string())
        .chain((1..10).map(|i| format!("lbrynet.log.{i}")))
        .map(|name| data_dir.join(name))
        .collect()
}

/// Blob transfers found in one log file. Times are in days relative to
/// `now`, so they are negative.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEstimate {
    pub log_file: PathBuf,
    pub now: i64,
    pub up_days: Vec<f64>,
    pub down_days: Vec<f64>,
}

impl LogEstimate {
    pub fn blobs_up(&self) -> usize {
        self.up_days.len()
    }

    pub fn blobs_down(&self) -> usize {
        self.down_days.len()
    }
}

fn ratio(up: usize, down: usize) -> f64 {
    if down == 0 {
        0.0
    } else {
        up as f64 / down as f64
    }
}

/// Newest and oldest event, 0 when there are none
fn span(days: &[f64]) -> (f64, f64) {
    if days.is_empty() {
        return (0.0, 0.0);
    }
    let newest = days.iter().copied().fold(f64::MIN, f64::max);
    let oldest = days.iter().copied().fold(f64::MAX, f64::min);
    (newest, oldest)
}

/// Time at the start of a log line, `2021-10-21 10:15:52,115 ...`,
/// in the local time zone
fn line_time(line: &str) -> Option<i64> {
    let mut parts = line.split_whitespace();
    let stamp = format!("{} {}", parts.next()?, parts.next()?).replace(',', ".");
    let naive = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Count uploaded and downloaded blobs in a log. A file that does not
/// exist gives an empty estimate.
pub fn count_updown_blobs(path: &Path, now: DateTime<Local>) -> Outcome<LogEstimate> {
    let now_ts = now.timestamp();
    let mut estimate = LogEstimate {
        log_file: path.to_path_buf(),
        now: now_ts,
        up_days: Vec::new(),
        down_days: Vec::new(),
    };

    if !path.exists() {
        return Ok(estimate);
    }

    let bytes = std::fs::read(path).map_err(|e| ToolError::io(path, e))?;
    let content = String::from_utf8_lossy(&bytes);
    let days = |line: &str| line_time(line).map(|t| (t - now_ts) as f64 / SECS_PER_DAY);

    for line in content.lines() {
        if line.contains("lbry.blob_exchange.server:") && line.contains("sent") {
            match days(line) {
                Some(d) => estimate.up_days.push(d),
                None => debug!(line, "Unparsable time"),
            }
        }
        if line.contains("lbry.blob_exchange.client:") && line.contains("downloaded") {
            match days(line) {
                Some(d) => estimate.down_days.push(d),
                None => debug!(line, "Unparsable time"),
            }
        }
    }

    Ok(estimate)
}

/// Upload/download estimate over every log file present
#[derive(Debug, Clone)]
pub struct RatioReport {
    pub data_dir: PathBuf,
    pub now: i64,
    pub estimates: Vec<LogEstimate>,
}

impl RatioReport {
    pub fn blobs_up(&self) -> usize {
        self.estimates.iter().map(LogEstimate::blobs_up).sum()
    }

    pub fn blobs_down(&self) -> usize {
        self.estimates.iter().map(LogEstimate::blobs_down).sum()
    }

    pub fn ratio(&self) -> f64 {
        ratio(self.blobs_up(), self.blobs_down())
    }

    pub fn lines(&self, sep: &str) -> Vec<String> {
        let up: Vec<f64> = self.estimates.iter().flat_map(|e| e.up_days.iter().copied()).collect();
        let down: Vec<f64> = self.estimates.iter().flat_map(|e| e.down_days.iter().copied()).collect();
        let (up_new, up_old) = span(&up);
        let (down_new, down_old) = span(&down);

        let mut lines = vec![
            format!("data_dir: {}", self.data_dir.display()),
            format!("Uploaded blobs: {}", self.blobs_up()),
            format!("Downloaded blobs: {}", self.blobs_down()),
            format!("Up/down ratio: {:8.4}", self.ratio()),
            format!("Now: {}", format_local(self.now, TFMT)),
            format!("Newest uploaded blob: {up_new:7.2} days ago"),
            format!("Oldest uploaded blob: {up_old:7.2} days ago"),
            format!("Newest downloaded blob: {down_new:7.2} days ago"),
            format!("Oldest downloaded blob: {down_old:7.2} days ago"),
            "-".repeat(40),
        ];

        for e in &self.estimates {
            let name = format!(
                "{}{sep}",
                e.log_file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            );
            let (up_new, up_old) = span(&e.up_days);
            let (down_new, down_old) = span(&e.down_days);

            lines.push(format!(
                "{name:15} up: {:6}{sep} down: {:6}{sep} ratio: {:8.4}{sep} \
                 up new: {up_new:7.2}{sep} up old: {up_old:7.2}{sep} \
                 down new: {down_new:7.2}{sep} down old: {down_old:7.2}{sep} {}",
                e.blobs_up(),
                e.blobs_down(),
                ratio(e.blobs_up(), e.blobs_down()),
                format_local(e.now, TFMT)
            ));
        }

        lines
    }
}

/// Estimate the upload/download ratio from the daemon logs in `data_dir`
pub fn blobs_ratio(data_dir: &Path, now: DateTime<Local>) -> Outcome<RatioReport> {
    let mut estimates = Vec::new();

    for path in log_files(data_dir) {
        if !path.exists() {
            debug!(path = %path.display(), "Log file does not exist");
            continue;
        }
        estimates.push(count_updown_blobs(&path, now)?);
    }

    if estimates.is_empty() {
        return Err(ToolError::NotFound(format!(
            "no lbrynet.log files in {}",
            data_dir.display()
        )));
    }

    let report = RatioReport {
        data_dir: data_dir.to_path_buf(),
        now: now.timestamp(),
        estimates,
    };
    info!(up = report.blobs_up(), down = report.blobs_down(), "Blob ratio estimated");
    Ok(report)
}
