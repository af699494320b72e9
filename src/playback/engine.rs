use super::{PlaybackItem, Transport, TransportFactory};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

enum Command {
    Play,
    Pause,
    SeekToStart,
    Advance,
    ReplaceItems(Vec<Url>),
    SetVolume(f32),
}

/// Preview clips fetched at transport construction, decoded on demand on the
/// audio thread. Backward-navigation rebuilds only ever reference a subset of
/// the original item list, so the store covers every replace.
struct ClipStore {
    clips: Vec<(Url, Vec<u8>)>,
}

impl ClipStore {
    fn bytes_for(&self, url: &Url) -> Option<&[u8]> {
        self.clips
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, b)| b.as_slice())
    }
}

/// rodio-backed transport. The audio device handle is not Send, so a
/// dedicated thread owns the `OutputStream` + `Sink` pair and executes
/// commands from a channel; dropping the transport closes the channel, which
/// ends the thread and releases the sink.
pub struct RodioTransport {
    tx: mpsc::UnboundedSender<Command>,
    playing: Arc<AtomicBool>,
}

impl RodioTransport {
    fn spawn(clips: Vec<(Url, Vec<u8>)>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let playing = Arc::new(AtomicBool::new(false));
        let initial: Vec<Url> = clips.iter().map(|(u, _)| u.clone()).collect();
        let builder = std::thread::Builder::new().name("audio-transport".into());
        if let Err(e) = builder.spawn(move || audio_thread(rx, ClipStore { clips }, initial)) {
            warn!("audio thread could not be spawned: {}", e);
        }
        Self { tx, playing }
    }
}

impl Transport for RodioTransport {
    fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Command::Play);
    }
    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
        let _ = self.tx.send(Command::Pause);
    }
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
    fn seek_to_start(&self) {
        let _ = self.tx.send(Command::SeekToStart);
    }
    fn advance(&self) {
        let _ = self.tx.send(Command::Advance);
    }
    fn replace_items(&self, items: Vec<PlaybackItem>) {
        let urls = items.into_iter().map(|i| i.url).collect();
        let _ = self.tx.send(Command::ReplaceItems(urls));
    }
    fn set_volume(&self, volume: f32) {
        let _ = self.tx.send(Command::SetVolume(volume));
    }
}

fn append_clip(sink: &Sink, store: &ClipStore, url: &Url) {
    let bytes = match store.bytes_for(url) {
        Some(b) => b.to_vec(),
        None => {
            debug!("no clip data cached for {}", url);
            return;
        }
    };
    match Decoder::new(Cursor::new(bytes)) {
        Ok(source) => sink.append(source),
        Err(e) => warn!("clip {} could not be decoded: {}", url, e),
    }
}

fn audio_thread(mut rx: mpsc::UnboundedReceiver<Command>, store: ClipStore, initial: Vec<Url>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            warn!("no audio output device: {}", e);
            return;
        }
    };
    let sink = match Sink::try_new(&handle) {
        Ok(s) => s,
        Err(e) => {
            warn!("audio sink setup failed: {}", e);
            return;
        }
    };

    for url in &initial {
        append_clip(&sink, &store, url);
    }
    sink.pause();

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            Command::Play => sink.play(),
            Command::Pause => sink.pause(),
            Command::SeekToStart => {
                if let Err(e) = sink.try_seek(Duration::ZERO) {
                    debug!("seek to start failed: {:?}", e);
                }
            }
            Command::Advance => sink.skip_one(),
            Command::ReplaceItems(urls) => {
                sink.clear();
                for url in &urls {
                    append_clip(&sink, &store, url);
                }
            }
            Command::SetVolume(v) => sink.set_volume(v),
        }
    }
    // Channel closed: the transport was dropped. The sink drops with this
    // frame and output stops.
}

/// Builds rodio transports, downloading each preview clip once up front.
pub struct RodioTransportFactory {
    client: Client,
    http_timeout: Duration,
}

impl RodioTransportFactory {
    pub fn new(client: Client, http_timeout: Duration) -> Self {
        Self {
            client,
            http_timeout,
        }
    }

    async fn fetch_clip(&self, url: &Url) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url.clone())
            .timeout(self.http_timeout)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("preview fetch failed: {}", status));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TransportFactory for RodioTransportFactory {
    async fn single(&self, item: PlaybackItem) -> Result<Box<dyn Transport>> {
        let bytes = self.fetch_clip(&item.url).await?;
        Ok(Box::new(RodioTransport::spawn(vec![(item.url, bytes)])))
    }

    async fn queue(&self, items: Vec<PlaybackItem>) -> Result<Box<dyn Transport>> {
        let mut clips = Vec::new();
        for item in items {
            match self.fetch_clip(&item.url).await {
                Ok(bytes) => clips.push((item.url, bytes)),
                // Unfetchable clips drop out of the queue, same as entries
                // with no preview URL at all.
                Err(e) => debug!("skipping clip {}: {}", item.url, e),
            }
        }
        Ok(Box::new(RodioTransport::spawn(clips)))
    }
}
