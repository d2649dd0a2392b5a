//! Shared playback state record.
//!
//! Every field is an independent atomic cell: the UI loop, the serial
//! listener task, and the engine watcher all read and write this record
//! concurrently, and no reader may ever observe a torn value. Compound
//! sequences that span fields (mute then restore volume) are ordered by the
//! controller, not here.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU32, Ordering};

use super::types::{PlaybackMode, RepeatMode};

pub const MIN_VOLUME: u8 = 0;
pub const MAX_VOLUME: u8 = 100;
pub const DEFAULT_VOLUME: u8 = 50;

/// Index value meaning "no track selected".
pub const NO_TRACK: i32 = -1;

pub struct PlayerState {
    mode: AtomicU8,
    volume: AtomicU8,
    muted: AtomicBool,
    position_secs: AtomicU32,
    current_track_index: AtomicI32,
    repeat_mode: AtomicU8,
    shuffle_enabled: AtomicBool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(PlaybackMode::Stopped.into()),
            volume: AtomicU8::new(DEFAULT_VOLUME),
            muted: AtomicBool::new(false),
            position_secs: AtomicU32::new(0),
            current_track_index: AtomicI32::new(NO_TRACK),
            repeat_mode: AtomicU8::new(RepeatMode::None.into()),
            shuffle_enabled: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Playback mode
    // ========================================================================

    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode::try_from(self.mode.load(Ordering::SeqCst))
            .unwrap_or(PlaybackMode::Stopped)
    }

    pub fn set_mode(&self, mode: PlaybackMode) {
        self.mode.store(mode.into(), Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.mode() == PlaybackMode::Playing
    }

    // ========================================================================
    // Volume / mute
    // ========================================================================

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    /// Stores the volume, clamped to [0, 100]. Muting does not go through
    /// here: the remembered level survives a mute/unmute cycle untouched.
    pub fn set_volume(&self, volume: u8) {
        self.volume
            .store(volume.clamp(MIN_VOLUME, MAX_VOLUME), Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    // ========================================================================
    // Track position
    // ========================================================================

    pub fn position_secs(&self) -> u32 {
        self.position_secs.load(Ordering::SeqCst)
    }

    pub fn set_position_secs(&self, position: u32) {
        self.position_secs.store(position, Ordering::SeqCst);
    }

    // ========================================================================
    // Playlist navigation
    // ========================================================================

    /// Returns the selected playlist index, or `NO_TRACK`. The playlist may
    /// have shrunk since this was set; readers treat an out-of-range index
    /// as "no track".
    pub fn current_track_index(&self) -> i32 {
        self.current_track_index.load(Ordering::SeqCst)
    }

    pub fn set_current_track_index(&self, index: i32) {
        self.current_track_index.store(index, Ordering::SeqCst);
    }

    // ========================================================================
    // Playback modes
    // ========================================================================

    pub fn repeat_mode(&self) -> RepeatMode {
        RepeatMode::try_from(self.repeat_mode.load(Ordering::SeqCst))
            .unwrap_or(RepeatMode::None)
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        self.repeat_mode.store(mode.into(), Ordering::SeqCst);
    }

    pub fn is_shuffle_enabled(&self) -> bool {
        self.shuffle_enabled.load(Ordering::SeqCst)
    }

    pub fn set_shuffle_enabled(&self, enabled: bool) {
        self.shuffle_enabled.store(enabled, Ordering::SeqCst);
    }

    // ========================================================================
    // Compound toggles (each still a single-field swap)
    // ========================================================================

    pub fn reset(&self) {
        self.set_mode(PlaybackMode::Stopped);
        self.set_volume(DEFAULT_VOLUME);
        self.set_muted(false);
        self.set_position_secs(0);
        self.set_current_track_index(NO_TRACK);
        self.set_repeat_mode(RepeatMode::None);
        self.set_shuffle_enabled(false);
    }

    pub fn toggle_play_pause(&self) -> PlaybackMode {
        let next = match self.mode() {
            PlaybackMode::Playing => PlaybackMode::Paused,
            PlaybackMode::Paused | PlaybackMode::Stopped => PlaybackMode::Playing,
        };
        self.set_mode(next);
        next
    }

    pub fn toggle_mute(&self) -> bool {
        let next = !self.muted.load(Ordering::SeqCst);
        self.muted.store(next, Ordering::SeqCst);
        next
    }

    pub fn cycle_repeat_mode(&self) -> RepeatMode {
        let next = self.repeat_mode().next();
        self.set_repeat_mode(next);
        next
    }

    pub fn toggle_shuffle(&self) -> bool {
        let next = !self.shuffle_enabled.load(Ordering::SeqCst);
        self.shuffle_enabled.store(next, Ordering::SeqCst);
        next
    }
}
