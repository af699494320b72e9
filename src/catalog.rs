use crate::auth::TokenAuthority;
use crate::models::AudioTrack;
use anyhow::{anyhow, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::Value;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Thin wrappers over the provider Web API. Responses are navigated as JSON
/// and reduced to the small DTOs the UI layer needs; nothing mirrors the
/// remote schema. Every call fetches its bearer through the token authority.
pub struct CatalogClient {
    client: Client,
    auth: Arc<TokenAuthority>,
    api_base: Option<String>,
    http_timeout: Duration,
}

impl CatalogClient {
    pub fn new(auth: Arc<TokenAuthority>, api_base: Option<String>, http_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            auth,
            api_base,
            http_timeout,
        }
    }

    fn api_base(&self) -> String {
        self.api_base
            .clone()
            .or_else(|| env::var("STREAM_API_BASE").ok())
            .unwrap_or_else(|| "https://api.spotify.com/v1".into())
    }

    async fn bearer(&self) -> Result<String> {
        let token = self
            .auth
            .with_valid_token()
            .await
            .ok_or_else(|| anyhow!("not signed in"))?;
        Ok(format!("Bearer {}", token))
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let bearer = self.bearer().await?;
        let resp = self
            .client
            .get(url)
            .timeout(self.http_timeout)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("catalog request failed: {} => {}", status, txt));
        }
        Ok(resp.json().await?)
    }

    pub async fn current_user_profile(&self) -> Result<Value> {
        self.get_json(&format!("{}/me", self.api_base())).await
    }

    /// (id, name) pairs of the newest albums.
    pub async fn new_releases(&self, limit: usize) -> Result<Vec<(String, String)>> {
        let j = self
            .get_json(&format!(
                "{}/browse/new-releases?limit={}",
                self.api_base(),
                limit
            ))
            .await?;
        Ok(id_name_pairs(&j["albums"]["items"]))
    }

    /// (id, name) pairs of the featured playlists.
    pub async fn featured_playlists(&self, limit: usize) -> Result<Vec<(String, String)>> {
        let j = self
            .get_json(&format!(
                "{}/browse/featured-playlists?limit={}",
                self.api_base(),
                limit
            ))
            .await?;
        Ok(id_name_pairs(&j["playlists"]["items"]))
    }

    pub async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<AudioTrack>> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_base(),
            urlencoding::encode(query),
            limit
        );
        let j = self.get_json(&url).await?;
        Ok(tracks_from_items(&j["tracks"]["items"]))
    }

    /// Track list of an album, ready to feed into queue playback.
    pub async fn album_tracks(&self, album_id: &str) -> Result<Vec<AudioTrack>> {
        let j = self
            .get_json(&format!(
                "{}/albums/{}/tracks?limit=50",
                self.api_base(),
                album_id
            ))
            .await?;
        Ok(tracks_from_items(&j["items"]))
    }

    /// Track list of a playlist. Playlist entries wrap the track object.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<AudioTrack>> {
        let j = self
            .get_json(&format!(
                "{}/playlists/{}/tracks?limit=50",
                self.api_base(),
                playlist_id
            ))
            .await?;
        let tracks = j["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|it| track_from_value(&it["track"]))
                    .collect()
            })
            .unwrap_or_default();
        Ok(tracks)
    }
}

fn id_name_pairs(items: &Value) -> Vec<(String, String)> {
    items
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|it| {
                    (
                        it["id"].as_str().unwrap_or("").to_string(),
                        it["name"].as_str().unwrap_or("").to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn tracks_from_items(items: &Value) -> Vec<AudioTrack> {
    items
        .as_array()
        .map(|arr| arr.iter().filter_map(track_from_value).collect())
        .unwrap_or_default()
}

fn track_from_value(v: &Value) -> Option<AudioTrack> {
    let id = v["id"].as_str()?.to_string();
    let name = v["name"].as_str().unwrap_or("").to_string();
    let artist = v["artists"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(|a| a["name"].as_str())
        .unwrap_or("")
        .to_string();
    let album = v["album"]["name"].as_str().map(|s| s.to_string());
    let preview_url = v["preview_url"].as_str().map(|s| s.to_string());
    let duration_ms = v["duration_ms"].as_u64();
    Some(AudioTrack {
        id,
        name,
        artist,
        album,
        preview_url,
        duration_ms,
    })
}
