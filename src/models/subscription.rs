use serde::{Deserialize, Serialize};

/// Result of `preference_get`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Preferences {
    /// Whether the wallet syncs its preferences online
    #[serde(rename = "enable-sync", default)]
    pub enable_sync: bool,
    #[serde(default)]
    pub local: Option<PreferenceStore>,
    /// Present only when the wallet was synced at least once
    #[serde(default)]
    pub shared: Option<PreferenceStore>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreferenceStore {
    #[serde(default)]
    pub value: PreferenceValue,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreferenceValue {
    #[serde(default)]
    pub following: Vec<Followed>,
}

/// A channel we follow
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Followed {
    /// Permanent URL of the channel, `lbry://@name#claim_id`
    pub uri: String,
    #[serde(rename = "notificationsDisabled", default)]
    pub notifications_disabled: Option<bool>,
}

impl Followed {
    /// Notifications count as off unless the wallet says otherwise
    pub fn notifications(&self) -> bool {
        self.notifications_disabled == Some(false)
    }

    /// Channel name and full claim id from the URI
    pub fn name_and_id(&self) -> (&str, &str) {
        let bare = self.uri.strip_prefix("lbry://").unwrap_or(&self.uri);
        bare.split_once('#').unwrap_or((bare, ""))
    }

    /// `@name#abc`, the name with three characters of the claim id
    pub fn short_name(&self) -> String {
        match self.name_and_id() {
            (name, "") => name.to_string(),
            (name, cid) => format!("{name}#{}", cid.get(..3).unwrap_or(cid)),
        }
    }
}
