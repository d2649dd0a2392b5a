//! Model module - Application state and data types
//!
//! This module contains all the data structures and state management for the
//! application. It is organized into submodules by responsibility:
//!
//! - `types`: Core type definitions (playback/repeat/app state enums, UI state)
//! - `player_state`: The concurrently-mutated playback state record
//! - `library`: The media catalog (playlist of track descriptors)
//! - `app_model`: Main application model aggregating the above

mod app_model;
mod library;
mod player_state;
mod types;

// Re-export all public types for convenient access
pub use types::{AppState, PlaybackMode, RepeatMode, UiState};

pub use player_state::{DEFAULT_VOLUME, MAX_VOLUME, NO_TRACK, PlayerState};

pub use library::{AUDIO_EXTENSIONS, MediaLibrary, TrackInfo, is_supported_audio_file};

pub use app_model::AppModel;
