use super::{PlaybackItem, PlayerPresenting, Transport, TransportFactory};
use crate::models::AudioTrack;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// A simple mock transport layer used in tests. It records every command so
/// tests can assert on the exact sequence the controller issued.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOp {
    Play,
    Pause,
    SeekToStart,
    Advance,
    ReplaceItems(Vec<PlaybackItem>),
    SetVolume(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Single,
    Queue,
}

/// Shared view into one mock transport. The factory keeps a clone of every
/// handle it hands out, so tests can inspect transports after the controller
/// has taken ownership of the boxed half.
#[derive(Clone)]
pub struct MockTransportHandle {
    pub kind: TransportKind,
    ops: Arc<Mutex<Vec<TransportOp>>>,
    items: Arc<Mutex<Vec<PlaybackItem>>>,
    playing: Arc<AtomicBool>,
}

impl MockTransportHandle {
    fn new(kind: TransportKind, items: Vec<PlaybackItem>) -> Self {
        Self {
            kind,
            ops: Arc::new(Mutex::new(Vec::new())),
            items: Arc::new(Mutex::new(items)),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Current item list, after any `replace_items` calls.
    pub fn items(&self) -> Vec<PlaybackItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

pub struct MockTransport {
    handle: MockTransportHandle,
}

impl Transport for MockTransport {
    fn play(&self) {
        self.handle.playing.store(true, Ordering::SeqCst);
        self.handle.ops.lock().unwrap().push(TransportOp::Play);
    }
    fn pause(&self) {
        self.handle.playing.store(false, Ordering::SeqCst);
        self.handle.ops.lock().unwrap().push(TransportOp::Pause);
    }
    fn is_playing(&self) -> bool {
        self.handle.playing.load(Ordering::SeqCst)
    }
    fn seek_to_start(&self) {
        self.handle.ops.lock().unwrap().push(TransportOp::SeekToStart);
    }
    fn advance(&self) {
        self.handle.ops.lock().unwrap().push(TransportOp::Advance);
    }
    fn replace_items(&self, items: Vec<PlaybackItem>) {
        *self.handle.items.lock().unwrap() = items.clone();
        self.handle
            .ops
            .lock()
            .unwrap()
            .push(TransportOp::ReplaceItems(items));
    }
    fn set_volume(&self, volume: f32) {
        self.handle
            .ops
            .lock()
            .unwrap()
            .push(TransportOp::SetVolume(volume));
    }
}

/// Factory producing mock transports and remembering a handle to each.
#[derive(Default)]
pub struct MockTransportFactory {
    pub created: Mutex<Vec<MockTransportHandle>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the most recently built transport.
    pub fn last(&self) -> Option<MockTransportHandle> {
        self.created.lock().unwrap().last().cloned()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn single(&self, item: PlaybackItem) -> Result<Box<dyn Transport>> {
        info!("MockTransportFactory: single transport for {}", item.url);
        let handle = MockTransportHandle::new(TransportKind::Single, vec![item]);
        self.created.lock().unwrap().push(handle.clone());
        Ok(Box::new(MockTransport { handle }))
    }

    async fn queue(&self, items: Vec<PlaybackItem>) -> Result<Box<dyn Transport>> {
        info!("MockTransportFactory: queue transport, {} items", items.len());
        let handle = MockTransportHandle::new(TransportKind::Queue, items);
        self.created.lock().unwrap().push(handle.clone());
        Ok(Box::new(MockTransport { handle }))
    }
}

/// Presenter that just records what it was asked to show.
#[derive(Default)]
pub struct RecordingPresenter {
    pub presented: Mutex<Vec<AudioTrack>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Vec<AudioTrack> {
        self.presented.lock().unwrap().clone()
    }
}

impl PlayerPresenting for RecordingPresenter {
    fn present_player(&self, track: &AudioTrack) {
        self.presented.lock().unwrap().push(track.clone());
    }
}
