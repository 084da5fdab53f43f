use crate::subscriptions::ops::{ChannelLatest, Subscription};
use crate::utils::text::sanitize_text;
use crate::utils::time::{format_utc, TFMT_SHORT};

const MIB: f64 = 1024.0 * 1024.0;

/// One line per followed channel
pub fn subs_lines(subs: &[Subscription], show_claim_id: bool, sep: &str) -> Vec<String> {
    let n = subs.len();

    subs.iter()
        .enumerate()
        .map(|(num, sub)| {
            let name = format!("\"{}\"", sub.followed.short_name());
            let mut line = format!("{:4}/{n:4}{sep} ", num + 1);
            if show_claim_id {
                line.push_str(&format!("{}{sep} ", sub.followed.name_and_id().1));
            }
            line.push_str(&format!(
                "{name:48}{sep} valid: {:5}{sep} notifications: {:5}",
                sub.is_valid().to_string(),
                sub.followed.notifications().to_string(),
            ));
            line
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct LatestOptions {
    pub claim_id: bool,
    /// Value type and stream type columns
    pub typ: bool,
    /// Show the title instead of the claim name
    pub title: bool,
    pub sanitize: bool,
    /// Channels numbered `start..=end`, 1-based, `end = 0` for the last
    pub start: usize,
    pub end: usize,
    pub sep: String,
}

impl Default for LatestOptions {
    fn default() -> Self {
        Self {
            claim_id: false,
            typ: true,
            title: false,
            sanitize: false,
            start: 1,
            end: 0,
            sep: ";".to_string(),
        }
    }
}

/// A heading per channel followed by one line per claim, channels
/// separated by a blank line
pub fn latest_lines(results: &[ChannelLatest], opts: &LatestOptions) -> Vec<String> {
    let n_channels = results.len();
    let sep = &opts.sep;
    let mut out = Vec::new();

    for (idx, result) in results.iter().enumerate() {
        let num = idx + 1;
        if num < opts.start {
            continue;
        }
        if opts.end != 0 && num > opts.end {
            break;
        }

        out.push(format!("Channel {num}/{n_channels}, {}, {}", result.channel, result.claim_id));

        match &result.claims {
            None => out.push("  - Invalid channel (removed?)".to_string()),
            Some(claims) => {
                let n_claims = claims.len();
                for (k, claim) in claims.iter().enumerate() {
                    let mut name = if opts.title {
                        claim.value.title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| claim.name.clone())
                    } else {
                        claim.name.clone()
                    };
                    if opts.sanitize {
                        name = sanitize_text(&name);
                    }

                    let seconds = claim.duration();
                    let mut line = format!(
                        " {:2}/{n_claims:2}{sep} {}{sep} ",
                        k + 1,
                        format_utc(claim.release_time(), TFMT_SHORT)
                    );
                    if opts.claim_id {
                        line.push_str(&format!("{}{sep} ", claim.claim_id));
                    }
                    if opts.typ {
                        line.push_str(&format!(
                            "{:10}{sep} {:9}{sep} ",
                            claim.value_type.as_deref().unwrap_or_default(),
                            claim.value.stream_type.as_deref().unwrap_or("________"),
                        ));
                    }
                    line.push_str(&format!(
                        "{:3}:{:02}{sep} {:9.4} MB{sep} \"{name}\"",
                        seconds / 60,
                        seconds % 60,
                        claim.size() as f64 / MIB,
                    ));
                    out.push(line);
                }
            }
        }

        if num < n_channels {
            out.push(String::new());
        }
    }

    out
}
