use serde::{Deserialize, Serialize};

/// Track DTO reduced from the provider's catalog responses. Only the fields
/// the playback layer and the CLI actually consume are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    // Short provider-hosted clip; absent for region-locked or unlicensed tracks.
    pub preview_url: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl AudioTrack {
    /// Parse the preview clip URL, if any. Empty strings and garbage are
    /// treated the same as an absent URL.
    pub fn preview_url_parsed(&self) -> Option<url::Url> {
        self.preview_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| url::Url::parse(s).ok())
    }
}

/// Token endpoint response body, for both the authorization_code and
/// refresh_token grants. `refresh_token` is absent on most refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Credential as persisted in the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    // epoch seconds; None means "never exchanged", not "expired"
    pub expires_at: Option<i64>,
}
