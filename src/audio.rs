//! Audio playback engine.
//!
//! `PlaybackEngine` is the capability surface the controller programs
//! against; `RodioEngine` is the real backend. The rodio output stream is
//! not sendable between threads, so a dedicated audio thread owns it for the
//! engine's whole lifetime and doubles as the completion watcher. Engine
//! notifications travel through an event channel consumed by a single
//! controller-owned task, never as direct callbacks.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use lofty::file::AudioFile;
use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How often the audio thread samples playback position and checks for
/// end of track.
const WATCH_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    #[default]
    Idle = 0,
    Loaded = 1,
    Playing = 2,
    Paused = 3,
    Error = 4,
}

impl From<EngineState> for u8 {
    fn from(state: EngineState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for EngineState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(EngineState::Idle),
            1 => Ok(EngineState::Loaded),
            2 => Ok(EngineState::Playing),
            3 => Ok(EngineState::Paused),
            4 => Ok(EngineState::Error),
            _ => Err(()),
        }
    }
}

/// One engine notification: the state it entered and where playback stood.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineEvent {
    pub state: EngineState,
    pub position_ms: u64,
}

/// Capability trait for the audio backend, fakeable in controller tests.
pub trait PlaybackEngine: Send {
    fn initialize(&mut self) -> Result<()>;
    fn shutdown(&mut self);

    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position_ms: u64);

    fn set_volume(&mut self, volume: u8);
    fn volume(&self) -> u8;

    fn state(&self) -> EngineState;
    fn position_ms(&self) -> u64;
    fn duration_ms(&self) -> u64;

    fn is_loaded(&self) -> bool {
        matches!(
            self.state(),
            EngineState::Loaded | EngineState::Playing | EngineState::Paused
        )
    }

    fn is_playing(&self) -> bool {
        self.state() == EngineState::Playing
    }
}

/// State shared with the audio thread.
struct EngineShared {
    state: AtomicU8,
    position_ms: AtomicU64,
    running: AtomicBool,
    events: UnboundedSender<EngineEvent>,
}

impl EngineShared {
    fn state(&self) -> EngineState {
        EngineState::try_from(self.state.load(Ordering::SeqCst)).unwrap_or(EngineState::Idle)
    }

    fn enter(&self, state: EngineState, position_ms: u64) {
        self.state.store(state.into(), Ordering::SeqCst);
        self.position_ms.store(position_ms, Ordering::SeqCst);
        let _ = self.events.send(EngineEvent { state, position_ms });
    }
}

/// rodio-backed playback engine.
pub struct RodioEngine {
    shared: Arc<EngineShared>,
    sink: Option<Arc<Sink>>,
    audio_thread: Option<JoinHandle<()>>,
    current_path: Option<PathBuf>,
    duration_ms: u64,
    volume: u8,
}

impl RodioEngine {
    /// Creates the engine plus the event receiver the controller will
    /// consume. The engine is inert until `initialize`.
    pub fn new() -> (Self, UnboundedReceiver<EngineEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let engine = Self {
            shared: Arc::new(EngineShared {
                state: AtomicU8::new(EngineState::Idle.into()),
                position_ms: AtomicU64::new(0),
                running: AtomicBool::new(false),
                events,
            }),
            sink: None,
            audio_thread: None,
            current_path: None,
            duration_ms: 0,
            volume: crate::model::DEFAULT_VOLUME,
        };
        (engine, events_rx)
    }

    /// Owns the output stream for the engine's lifetime and watches the sink
    /// for playback position and end of track.
    fn audio_thread_main(
        shared: Arc<EngineShared>,
        sink_tx: std::sync::mpsc::Sender<Result<Arc<Sink>>>,
    ) {
        let stream_and_sink = OutputStream::try_default()
            .map_err(|err| anyhow!("opening audio output: {err}"))
            .and_then(|(stream, handle)| {
                Sink::try_new(&handle)
                    .map(|sink| (stream, Arc::new(sink)))
                    .map_err(|err| anyhow!("creating audio sink: {err}"))
            });

        let (_stream, sink) = match stream_and_sink {
            Ok(pair) => pair,
            Err(err) => {
                let _ = sink_tx.send(Err(err));
                return;
            }
        };
        if sink_tx.send(Ok(sink.clone())).is_err() {
            return;
        }

        while shared.running.load(Ordering::SeqCst) {
            std::thread::sleep(WATCH_INTERVAL);

            if shared.state() != EngineState::Playing {
                continue;
            }
            if sink.empty() {
                // Track drained: report completion.
                tracing::debug!("Playback reached end of track");
                shared.enter(EngineState::Idle, 0);
            } else {
                shared
                    .position_ms
                    .store(sink.get_pos().as_millis() as u64, Ordering::SeqCst);
            }
        }
    }

    fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
        let file = File::open(path)?;
        Ok(Decoder::new(BufReader::new(file))?)
    }

    /// Best-effort duration from the file's own metadata; 0 when unknown.
    fn probe_duration_ms(path: &Path) -> u64 {
        lofty::read_from_path(path)
            .map(|tagged| tagged.properties().duration().as_millis() as u64)
            .unwrap_or(0)
    }
}

impl PlaybackEngine for RodioEngine {
    fn initialize(&mut self) -> Result<()> {
        if self.audio_thread.is_some() {
            return Ok(());
        }

        let (sink_tx, sink_rx) = std::sync::mpsc::channel();
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || Self::audio_thread_main(shared, sink_tx))
            .map_err(|err| anyhow!("spawning audio thread: {err}"))?;

        match sink_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(sink)) => {
                sink.set_volume(f32::from(self.volume) / 100.0);
                self.sink = Some(sink);
                self.audio_thread = Some(handle);
                tracing::info!("Audio engine initialized");
                Ok(())
            }
            Ok(Err(err)) => {
                self.shared.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                self.shared.enter(EngineState::Error, 0);
                Err(err)
            }
            Err(_) => {
                self.shared.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                self.shared.enter(EngineState::Error, 0);
                Err(anyhow!("audio output did not come up"))
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
        self.sink = None;
        self.current_path = None;
        self.duration_ms = 0;
        self.shared.state.store(EngineState::Idle.into(), Ordering::SeqCst);
        tracing::info!("Audio engine shut down");
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let Some(sink) = &self.sink else {
            bail!("audio engine is not initialized");
        };

        let source = match Self::decode(path) {
            Ok(source) => source,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "Failed to load track");
                self.shared.enter(EngineState::Error, 0);
                return Err(err);
            }
        };

        sink.stop();
        sink.append(source);
        sink.pause();

        self.current_path = Some(path.to_path_buf());
        self.duration_ms = Self::probe_duration_ms(path);
        self.shared.enter(EngineState::Loaded, 0);
        tracing::info!(path = %path.display(), duration_ms = self.duration_ms, "Track loaded");
        Ok(())
    }

    fn play(&mut self) {
        let Some(sink) = &self.sink else { return };
        if self.current_path.is_none() {
            return;
        }

        // After stop (or end of track) the sink is drained; start the
        // current track over from the top.
        if sink.empty() {
            let Some(path) = self.current_path.clone() else {
                return;
            };
            match Self::decode(&path) {
                Ok(source) => sink.append(source),
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "Failed to restart track");
                    self.shared.enter(EngineState::Error, 0);
                    return;
                }
            }
        }

        sink.play();
        self.shared
            .enter(EngineState::Playing, self.shared.position_ms.load(Ordering::SeqCst));
    }

    fn pause(&mut self) {
        let Some(sink) = &self.sink else { return };
        if self.shared.state() != EngineState::Playing {
            return;
        }
        sink.pause();
        self.shared
            .enter(EngineState::Paused, sink.get_pos().as_millis() as u64);
    }

    fn stop(&mut self) {
        let Some(sink) = &self.sink else { return };
        if !self.is_loaded() {
            return;
        }
        sink.stop();
        // The track stays current: play() restarts it from the beginning.
        self.shared.enter(EngineState::Loaded, 0);
    }

    fn seek(&mut self, position_ms: u64) {
        let Some(sink) = &self.sink else { return };
        if let Err(err) = sink.try_seek(Duration::from_millis(position_ms)) {
            tracing::warn!(position_ms, error = %err, "Seek not supported for current source");
            return;
        }
        self.shared.position_ms.store(position_ms, Ordering::SeqCst);
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(crate::model::MAX_VOLUME);
        if let Some(sink) = &self.sink {
            sink.set_volume(f32::from(self.volume) / 100.0);
        }
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn state(&self) -> EngineState {
        self.shared.state()
    }

    fn position_ms(&self) -> u64 {
        self.shared.position_ms.load(Ordering::SeqCst)
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
