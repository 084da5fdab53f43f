use crate::core::error::{Outcome, ToolError};
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// How a claim is identified, in order of precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRef {
    /// Full or partial URI, `lbry://@chan#3/name#2` or `name`
    Uri(String),
    /// 40-character claim id
    ClaimId(String),
    /// Bare claim name
    Name(String),
}

impl ClaimRef {
    /// Pick one identifier: URI wins over claim id, claim id over name.
    /// Empty strings count as absent.
    pub fn select(uri: Option<&str>, claim_id: Option<&str>, name: Option<&str>) -> Outcome<Self> {
        let present = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(uri) = present(uri) {
            return Ok(ClaimRef::Uri(uri));
        }

        if let Some(cid) = present(claim_id) {
            validate_plain("claim id", &cid)?;
            return Ok(ClaimRef::ClaimId(cid));
        }

        if let Some(name) = present(name) {
            validate_plain("name", &name)?;
            return Ok(ClaimRef::Name(name));
        }

        Err(ToolError::InvalidInput(
            "a URI, a claim id or a name is required".to_string(),
        ))
    }

    /// Interpret free text from a list: 40 hex characters are a claim id,
    /// anything else a URI
    pub fn guess(text: &str) -> Self {
        let text = text.trim();
        if is_claim_id(text) {
            ClaimRef::ClaimId(text.to_string())
        } else {
            ClaimRef::Uri(text.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClaimRef::Uri(s) | ClaimRef::ClaimId(s) | ClaimRef::Name(s) => s,
        }
    }
}

impl fmt::Display for ClaimRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimRef::Uri(s) => write!(f, "uri={s}"),
            ClaimRef::ClaimId(s) => write!(f, "claim_id={s}"),
            ClaimRef::Name(s) => write!(f, "name={s}"),
        }
    }
}

fn validate_plain(what: &str, value: &str) -> Outcome<()> {
    if value.contains(['#', ':', '@']) {
        return Err(ToolError::InvalidInput(format!(
            "{what} cannot contain '#', ':' or '@': {value}"
        )));
    }
    Ok(())
}

pub fn is_claim_id(text: &str) -> bool {
    text.len() == 40 && hex::decode(text).is_ok()
}

pub fn is_blob_hash(text: &str) -> bool {
    text.len() == 96 && hex::decode(text).is_ok()
}

pub fn validate_blob_hash(text: &str) -> Outcome<()> {
    if !is_blob_hash(text) {
        return Err(ToolError::InvalidInput(format!(
            "blob hash must be 96 hexadecimal characters, got {} characters",
            text.len()
        )));
    }
    Ok(())
}

/// What `delete` removes from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CleanTarget {
    /// Only the media file, blobs stay and keep seeding
    Media,
    /// Only the blobs
    Blobs,
    Both,
}

/// Which local files a report shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ShowFilter {
    #[default]
    All,
    /// Media file present
    Media,
    /// Media file absent
    Missing,
    /// Blobs missing
    Incomplete,
    /// All blobs present
    Full,
}

/// What to do with a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BlobAction {
    #[default]
    Get,
    Announce,
    Both,
}

impl BlobAction {
    pub fn gets(self) -> bool {
        matches!(self, BlobAction::Get | BlobAction::Both)
    }

    pub fn announces(self) -> bool {
        matches!(self, BlobAction::Announce | BlobAction::Both)
    }
}

macro_rules! parse_choice {
    ($ty:ty, $label:expr, { $($text:expr => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ToolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(ToolError::InvalidInput(format!(
                        "{} must be one of {}, got '{}'",
                        $label,
                        [$($text),+].join(", "),
                        other
                    ))),
                }
            }
        }
    };
}

parse_choice!(CleanTarget, "target", {
    "media" => CleanTarget::Media,
    "blobs" => CleanTarget::Blobs,
    "both" => CleanTarget::Both,
});

parse_choice!(ShowFilter, "show", {
    "all" => ShowFilter::All,
    "media" => ShowFilter::Media,
    "missing" => ShowFilter::Missing,
    "incomplete" => ShowFilter::Incomplete,
    "full" => ShowFilter::Full,
});

parse_choice!(BlobAction, "action", {
    "get" => BlobAction::Get,
    "announce" => BlobAction::Announce,
    "both" => BlobAction::Both,
});

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

    #[test]
    fn test_uri_wins() {
        let r = ClaimRef::select(Some("lbry://x"), Some(CID), Some("name")).unwrap();
        assert_eq!(r, ClaimRef::Uri("lbry://x".to_string()));
    }

    #[test]
    fn test_claim_id_over_name() {
        let r = ClaimRef::select(None, Some(CID), Some("name")).unwrap();
        assert_eq!(r, ClaimRef::ClaimId(CID.to_string()));

        // Empty uri is treated as absent
        let r = ClaimRef::select(Some(""), Some(CID), None).unwrap();
        assert_eq!(r, ClaimRef::ClaimId(CID.to_string()));
    }

    #[test]
    fn test_name_only() {
        let r = ClaimRef::select(None, None, Some("some-video")).unwrap();
        assert_eq!(r, ClaimRef::Name("some-video".to_string()));
    }

    #[test]
    fn test_nothing_given() {
        let err = ClaimRef::select(None, Some("  "), None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_name_with_uri_characters() {
        assert!(ClaimRef::select(None, None, Some("@chan")).is_err());
        assert!(ClaimRef::select(None, Some("abc#1"), None).is_err());
        assert!(ClaimRef::select(None, None, Some("a:b")).is_err());
    }

    #[test]
    fn test_guess() {
        assert_eq!(ClaimRef::guess(CID), ClaimRef::ClaimId(CID.to_string()));
        assert_eq!(
            ClaimRef::guess("@chan#1/video#2"),
            ClaimRef::Uri("@chan#1/video#2".to_string())
        );
    }

    #[test]
    fn test_blob_hash() {
        assert!(validate_blob_hash(&"ab".repeat(48)).is_ok());
        assert!(validate_blob_hash(&"ab".repeat(20)).is_err());
        assert!(validate_blob_hash(&"zz".repeat(48)).is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("media".parse::<CleanTarget>().unwrap(), CleanTarget::Media);
        assert_eq!("BOTH".parse::<CleanTarget>().unwrap(), CleanTarget::Both);
        assert!("everything".parse::<CleanTarget>().is_err());

        assert_eq!("incomplete".parse::<ShowFilter>().unwrap(), ShowFilter::Incomplete);
        assert!("some".parse::<ShowFilter>().is_err());

        let action = "both".parse::<BlobAction>().unwrap();
        assert!(action.gets() && action.announces());
        assert!(!BlobAction::Announce.gets());
    }
}
