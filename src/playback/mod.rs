pub mod controller;
pub mod engine;
pub mod mock;

use crate::models::AudioTrack;
use anyhow::Result;
use url::Url;

/// One entry of a transport's item list: the resolved preview clip URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackItem {
    pub url: Url,
}

impl PlaybackItem {
    /// None when the track carries no usable preview URL; such tracks are
    /// dropped from item lists without surfacing an error.
    pub fn from_track(track: &AudioTrack) -> Option<Self> {
        track.preview_url_parsed().map(|url| Self { url })
    }
}

/// Media engine seam. The controller drives whichever transport is live
/// through these calls; implementations are the rodio-backed
/// [`engine::RodioTransport`] and the [`mock::MockTransport`] used in tests.
pub trait Transport: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;
    fn seek_to_start(&self);
    /// Drop the current item and move to the next queued one. Single-item
    /// transports have nothing to advance to.
    fn advance(&self);
    /// Replace the queued item list wholesale.
    fn replace_items(&self, items: Vec<PlaybackItem>);
    fn set_volume(&self, volume: f32);
}

/// Builds transports. Construction is async (clip data is fetched up front)
/// so that the transport controls themselves stay synchronous.
#[async_trait::async_trait]
pub trait TransportFactory: Send + Sync {
    async fn single(&self, item: PlaybackItem) -> Result<Box<dyn Transport>>;
    async fn queue(&self, items: Vec<PlaybackItem>) -> Result<Box<dyn Transport>>;
}

/// UI-side capability: put the player surface on screen for a track. The
/// surface pulls [`controller::PlaybackController::current_track`] when it
/// wants fresh title/artwork data; nothing is pushed at it.
pub trait PlayerPresenting: Send + Sync {
    fn present_player(&self, track: &AudioTrack);
}
