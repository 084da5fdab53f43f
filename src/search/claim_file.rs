use crate::api::client::DaemonClient;
use crate::core::error::{Outcome, ToolError};
use crate::search::sort::sort_items;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read claim ids from a separator-delimited file, one claim per line.
///
/// Each line may hold several fields; the first 40-character field without
/// URI symbols is taken as the claim id. Blank lines and lines starting
/// with `#` are skipped. `start` and `end` are 1-based line numbers, and
/// `end = 0` means the last line.
pub fn parse_claim_file(path: &Path, sep: &str, start: usize, end: usize) -> Outcome<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| ToolError::io(path, e))?;

    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Err(ToolError::InvalidInput(format!("empty file: {}", path.display())));
    }

    let mut claims = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let it = idx + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || it < start {
            continue;
        }
        if end != 0 && it > end {
            break;
        }

        let found = line
            .split(sep)
            .map(str::trim)
            .find(|part| part.chars().count() == 40 && !part.contains(['/', '@', '#', ':']));

        match found {
            Some(cid) => {
                debug!(line = it, claim_id = cid, "Claim id found");
                claims.push(cid.to_string());
            }
            None => warn!(line = it, "No 40-character claim id on line"),
        }
    }

    info!(path = %path.display(), claims = claims.len(), "Parsed claim file");
    Ok(claims)
}

/// Claims processed by a batch download or removal
#[derive(Debug, Clone)]
pub enum ClaimSource {
    /// Everything already downloaded, oldest first
    Local,
    /// Claim ids read from a separator-delimited file
    File { path: PathBuf, sep: String },
}

pub async fn load_claim_ids(daemon: &DaemonClient, source: &ClaimSource) -> Outcome<Vec<String>> {
    match source {
        ClaimSource::Local => Ok(sort_items(daemon, None, false)
            .await?
            .into_iter()
            .map(|item| item.claim_id)
            .collect()),
        ClaimSource::File { path, sep } => {
            let ids = parse_claim_file(path, sep, 1, 0)?;
            if ids.is_empty() {
                return Err(ToolError::InvalidInput(format!(
                    "no 40-character claim id in {}",
                    path.display()
                )));
            }
            Ok(ids)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_parse_summary_lines() {
        let f = write(
            "# saved list\n\
             1/3; 70dfefa510ca6eee7023a2a927e34d385b5a18bd;  5/ 5\n\
             \n\
             2/3; lbry://@some#1/video#4; nothing here\n\
             3/3; d30002fec25bff804f144655b3fe4495e00439de; 15/15\n",
        );

        let claims = parse_claim_file(f.path(), ";", 1, 0).unwrap();
        assert_eq!(
            claims,
            vec![
                "70dfefa510ca6eee7023a2a927e34d385b5a18bd",
                "d30002fec25bff804f144655b3fe4495e00439de"
            ]
        );
    }

    #[test]
    fn test_start_and_end() {
        let f = write(
            "70dfefa510ca6eee7023a2a927e34d385b5a18bd\n\
             0298c56e0593b140c231229a065cc1647d4fedae\n\
             d30002fec25bff804f144655b3fe4495e00439de\n",
        );

        let claims = parse_claim_file(f.path(), ";", 2, 2).unwrap();
        assert_eq!(claims, vec!["0298c56e0593b140c231229a065cc1647d4fedae"]);
    }

    #[test]
    fn test_missing_and_empty_file() {
        let err = parse_claim_file(Path::new("/no/such/file"), ";", 1, 0).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));

        let f = write("");
        assert!(matches!(
            parse_claim_file(f.path(), ";", 1, 0).unwrap_err(),
            ToolError::InvalidInput(_)
        ));
    }
}
