use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    // Endpoint bases; normally left at the provider defaults, overridable
    // here or via STREAM_AUTH_BASE / STREAM_API_BASE env vars (tests).
    #[serde(default)]
    pub auth_base: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_sec: u64,

    // Playback
    #[serde(default = "default_preview_volume")]
    pub preview_volume: f32,

    // path to database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_redirect_uri() -> String { "http://127.0.0.1:8888/callback".into() }
fn default_http_timeout() -> u64 { 10 }
fn default_preview_volume() -> f32 { 0.05 }

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| "/var/lib/music-stream-client".into())
        .join("music-stream-client/client.db")
}

fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| "/var/log/music-stream-client".into())
        .join("music-stream-client")
}

fn default_scopes() -> Vec<String> {
    vec![
        "user-read-private",
        "user-read-email",
        "playlist-read-private",
        "playlist-modify-public",
        "playlist-modify-private",
        "user-follow-read",
        "user-library-read",
        "user-library-modify",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }
}
