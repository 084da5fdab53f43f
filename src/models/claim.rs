use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A claim as returned by `resolve` and `claim_search`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Claim {
    pub claim_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub permanent_url: Option<String>,
    #[serde(default)]
    pub short_url: Option<String>,
    /// "stream", "channel", "repost", "collection"
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub value: ClaimValue,
    #[serde(default)]
    pub signing_channel: Option<Box<Claim>>,
    #[serde(default)]
    pub meta: ClaimMeta,
    /// Amount staked by the claim itself, in LBC
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub reposted_claim: Option<Box<Claim>>,
}

/// The `value` object of a claim, also used as `metadata` of local files
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClaimValue {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub release_time: Option<i64>,
    #[serde(default)]
    pub stream_type: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub video: Option<MediaInfo>,
    #[serde(default)]
    pub audio: Option<MediaInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Source {
    #[serde(default)]
    pub sd_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: Option<u64>,
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaInfo {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClaimMeta {
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub support_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub effective_amount: Option<f64>,
    #[serde(default)]
    pub trending_global: Option<f64>,
    #[serde(default)]
    pub trending_group: Option<f64>,
    #[serde(default)]
    pub trending_local: Option<f64>,
    #[serde(default)]
    pub trending_mixed: Option<f64>,
}

impl Claim {
    /// `canonical_url` without the `lbry://` scheme
    pub fn short_canonical(&self) -> String {
        strip_scheme(self.canonical_url.as_deref().unwrap_or(&self.name))
    }

    /// Canonical name of the signing channel, or `None` for anonymous claims
    pub fn channel_name(&self) -> Option<String> {
        self.signing_channel
            .as_ref()
            .and_then(|ch| ch.canonical_url.as_deref())
            .map(strip_scheme)
    }

    pub fn sd_hash(&self) -> Option<&str> {
        self.value.source.as_ref().and_then(|s| s.sd_hash.as_deref())
    }

    pub fn size(&self) -> u64 {
        self.value.size()
    }

    pub fn duration(&self) -> u64 {
        self.value.duration()
    }

    /// Release time, falling back to the claim timestamp
    pub fn release_time(&self) -> i64 {
        self.value
            .release_time
            .or(self.meta.creation_timestamp)
            .or(self.timestamp)
            .unwrap_or(0)
    }

    pub fn is_repost(&self) -> bool {
        self.value_type.as_deref() == Some("repost")
    }
}

impl ClaimValue {
    pub fn size(&self) -> u64 {
        self.source.as_ref().and_then(|s| s.size).unwrap_or(0)
    }

    /// Video duration wins over audio duration when both are present
    pub fn duration(&self) -> u64 {
        match (&self.video, &self.audio) {
            (Some(video), _) => video.duration.unwrap_or(0),
            (None, Some(audio)) => audio.duration.unwrap_or(0),
            (None, None) => 0,
        }
    }
}

pub fn strip_scheme(url: &str) -> String {
    url.strip_prefix("lbry://").unwrap_or(url).to_string()
}

// The daemon serializes many numbers as strings ("release_time": "1600000000")

fn lenient_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match lenient_value(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match lenient_value(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match lenient_value(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match lenient_value(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_numbers() {
        let claim: Claim = serde_json::from_value(json!({
            "claim_id": "abcdef",
            "name": "video",
            "canonical_url": "lbry://@chan#1/video#a",
            "amount": "0.5",
            "value": {
                "release_time": "1600000000",
                "source": {"sd_hash": "ff", "size": "2048"},
                "video": {"duration": 120}
            },
            "signing_channel": {"claim_id": "1234", "canonical_url": "lbry://@chan#1"}
        }))
        .unwrap();

        assert_eq!(claim.amount, Some(0.5));
        assert_eq!(claim.release_time(), 1600000000);
        assert_eq!(claim.size(), 2048);
        assert_eq!(claim.duration(), 120);
        assert_eq!(claim.sd_hash(), Some("ff"));
        assert_eq!(claim.channel_name().as_deref(), Some("@chan#1"));
        assert_eq!(claim.short_canonical(), "@chan#1/video#a");
    }

    #[test]
    fn test_missing_fields() {
        let claim: Claim = serde_json::from_value(json!({"claim_id": "x"})).unwrap();

        assert_eq!(claim.size(), 0);
        assert_eq!(claim.duration(), 0);
        assert_eq!(claim.release_time(), 0);
        assert!(claim.channel_name().is_none());
        assert!(claim.sd_hash().is_none());
    }

    #[test]
    fn test_release_time_fallback() {
        let claim: Claim = serde_json::from_value(json!({
            "claim_id": "x",
            "meta": {"creation_timestamp": 1500}
        }))
        .unwrap();
        assert_eq!(claim.release_time(), 1500);
    }
}
