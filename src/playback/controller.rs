use super::{PlaybackItem, PlayerPresenting, Transport, TransportFactory};
use crate::models::AudioTrack;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// At most one transport is live at a time; the enum makes the
/// single-vs-queue split structural.
enum Session {
    Idle,
    Single {
        track: AudioTrack,
        transport: Box<dyn Transport>,
    },
    Queue {
        tracks: Vec<AudioTrack>,
        // Always indexes `tracks` (the original, unfiltered list), stepped
        // with wraparound in both directions.
        current: usize,
        transport: Box<dyn Transport>,
    },
}

/// Mediates between UI transport commands (play/pause, forward, backward,
/// volume) and the live transport, and keeps "what is playing now" queryable
/// for UI refresh. One controller per running app instance; inject it where
/// it is needed instead of reaching for a global.
pub struct PlaybackController {
    factory: Arc<dyn TransportFactory>,
    presenter: Arc<dyn PlayerPresenting>,
    start_volume: f32,
    session: Mutex<Session>,
}

impl PlaybackController {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        presenter: Arc<dyn PlayerPresenting>,
        start_volume: f32,
    ) -> Self {
        Self {
            factory,
            presenter,
            start_volume,
            session: Mutex::new(Session::Idle),
        }
    }

    /// Pause and release whatever is live. Safe to call when idle.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        match &*session {
            Session::Single { transport, .. } | Session::Queue { transport, .. } => {
                transport.pause()
            }
            Session::Idle => {}
        }
        // Dropping the old session releases its transport.
        *session = Session::Idle;
    }

    /// Start a single-track session and present the player surface. A track
    /// without a usable preview URL is ignored; the previous session stays
    /// untouched in that case.
    pub async fn start_single(&self, track: AudioTrack) {
        let item = match PlaybackItem::from_track(&track) {
            Some(item) => item,
            None => {
                debug!("track {} has no playable preview clip, ignoring", track.id);
                return;
            }
        };

        self.stop().await;
        let transport = match self.factory.single(item).await {
            Ok(t) => t,
            Err(e) => {
                warn!("single transport setup failed: {}", e);
                return;
            }
        };
        transport.set_volume(self.start_volume);
        transport.play();

        {
            let mut session = self.session.lock().await;
            *session = Session::Single {
                track: track.clone(),
                transport,
            };
        }
        self.presenter.present_player(&track);
    }

    /// Start a queue session over `tracks` and present the player surface.
    /// Entries without a usable preview URL are dropped from the transport's
    /// item list, but the session keeps the original list and indexes into it.
    pub async fn start_queue(&self, tracks: Vec<AudioTrack>) {
        let items: Vec<PlaybackItem> = tracks.iter().filter_map(PlaybackItem::from_track).collect();

        self.stop().await;
        let transport = match self.factory.queue(items).await {
            Ok(t) => t,
            Err(e) => {
                warn!("queue transport setup failed: {}", e);
                return;
            }
        };
        transport.set_volume(self.start_volume);
        transport.play();

        let first = tracks.first().cloned();
        {
            let mut session = self.session.lock().await;
            *session = Session::Queue {
                tracks,
                current: 0,
                transport,
            };
        }
        if let Some(track) = first {
            self.presenter.present_player(&track);
        }
    }

    /// The track the UI should be showing right now, if any.
    pub async fn current_track(&self) -> Option<AudioTrack> {
        let session = self.session.lock().await;
        match &*session {
            Session::Idle => None,
            Session::Single { track, .. } => Some(track.clone()),
            Session::Queue {
                tracks, current, ..
            } => tracks.get(*current).cloned(),
        }
    }

    pub async fn toggle_play_pause(&self) {
        let session = self.session.lock().await;
        let transport = match &*session {
            Session::Single { transport, .. } | Session::Queue { transport, .. } => transport,
            Session::Idle => return,
        };
        if transport.is_playing() {
            transport.pause();
        } else {
            transport.play();
        }
    }

    pub async fn skip_forward(&self) {
        let mut session = self.session.lock().await;
        match &mut *session {
            Session::Idle => {}
            Session::Single { transport, .. } => {
                // A lone preview has no next item; rewind and hold.
                transport.seek_to_start();
                transport.pause();
            }
            Session::Queue {
                tracks,
                current,
                transport,
            } => {
                if tracks.is_empty() {
                    return;
                }
                *current = (*current + 1) % tracks.len();
                transport.seek_to_start();
                transport.pause();
                transport.advance();
                transport.play();
            }
        }
    }

    pub async fn skip_backward(&self) {
        let mut session = self.session.lock().await;
        match &mut *session {
            Session::Idle => {}
            Session::Single { transport, .. } => {
                // Restart in place.
                transport.seek_to_start();
                transport.pause();
                transport.play();
            }
            Session::Queue {
                tracks,
                current,
                transport,
            } => {
                if tracks.is_empty() {
                    return;
                }
                transport.pause();
                *current = (*current + tracks.len() - 1) % tracks.len();
                // The transport has no native "previous item": rebuild its
                // list from the new position through the end of the original
                // list. Entries before `current` are not re-queued, so
                // repeated backward steps shrink the effective queue; kept
                // as shipped, see DESIGN.md.
                let items: Vec<PlaybackItem> = tracks[*current..]
                    .iter()
                    .filter_map(PlaybackItem::from_track)
                    .collect();
                transport.replace_items(items);
                transport.seek_to_start();
                transport.play();
            }
        }
    }

    /// Volume slider hookup. Only the single-track transport is wired up;
    /// queue sessions ignore it, matching the shipped control surface.
    pub async fn set_volume(&self, volume: f32) {
        let session = self.session.lock().await;
        if let Session::Single { transport, .. } = &*session {
            transport.set_volume(volume);
        }
    }
}
