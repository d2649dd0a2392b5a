//! Media catalog: the ordered playlist of track descriptors.
//!
//! The track list and everything derived from it (length, index lookups,
//! wrap-around navigation targets) are guarded as a unit by one mutex, so a
//! scan can never interleave with an append or a clear.

use std::path::{Path, PathBuf};

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use tokio::sync::Mutex;

/// File extensions accepted by the directory scanner.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "flac"];

/// Metadata for one playlist entry.
#[derive(Clone, Debug, Default)]
pub struct TrackInfo {
    pub filename: String,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub artist: String,
    pub album: String,
}

impl TrackInfo {
    /// Builds a descriptor from a file path, reading tags and duration where
    /// possible. Unreadable tags degrade to empty fields, never to an error:
    /// a file with broken metadata is still playable.
    pub fn from_path(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut track = Self {
            filename,
            path: path.to_path_buf(),
            ..Self::default()
        };

        if let Ok(tagged_file) = read_from_path(path) {
            track.duration_ms = tagged_file.properties().duration().as_millis() as u64;
            if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
                track.artist = tag.artist().map(|value| value.into_owned()).unwrap_or_default();
                track.album = tag.album().map(|value| value.into_owned()).unwrap_or_default();
            }
        }

        track
    }
}

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Ordered playlist guarded as a unit.
#[derive(Default)]
pub struct MediaLibrary {
    tracks: Mutex<Vec<TrackInfo>>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track and returns the new playlist length.
    pub async fn add(&self, track: TrackInfo) -> usize {
        let mut tracks = self.tracks.lock().await;
        tracks.push(track);
        tracks.len()
    }

    pub async fn clear(&self) {
        self.tracks.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.tracks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tracks.lock().await.is_empty()
    }

    /// Returns the descriptor at `index`, tolerating stale out-of-range
    /// indices by answering `None`.
    pub async fn track(&self, index: usize) -> Option<TrackInfo> {
        self.tracks.lock().await.get(index).cloned()
    }

    pub async fn track_path(&self, index: usize) -> Option<PathBuf> {
        self.tracks
            .lock()
            .await
            .get(index)
            .map(|track| track.path.clone())
    }

    pub async fn find_index_of_path(&self, path: &Path) -> Option<usize> {
        self.tracks
            .lock()
            .await
            .iter()
            .position(|track| track.path == path)
    }

    /// Snapshot for rendering; the UI never iterates the live list.
    pub async fn snapshot(&self) -> Vec<TrackInfo> {
        self.tracks.lock().await.clone()
    }

    /// Computes the wrap-around successor of `current` against the playlist
    /// length under one lock acquisition. `None` when the playlist is empty.
    /// A stale or unset `current` counts as "no track", so the successor is
    /// the head of the list.
    pub async fn wrapped_next(&self, current: i32) -> Option<(usize, PathBuf)> {
        let tracks = self.tracks.lock().await;
        if tracks.is_empty() {
            return None;
        }
        let len = tracks.len() as i32;
        let current = if (0..len).contains(&current) { current } else { -1 };
        let next = ((current + 1) % len) as usize;
        Some((next, tracks[next].path.clone()))
    }

    /// Wrap-around predecessor of `current`; `None` when the playlist is
    /// empty. From "no track" or index 0 this wraps to the tail.
    pub async fn wrapped_previous(&self, current: i32) -> Option<(usize, PathBuf)> {
        let tracks = self.tracks.lock().await;
        if tracks.is_empty() {
            return None;
        }
        let len = tracks.len() as i32;
        let current = if (0..len).contains(&current) { current } else { -1 };
        let prev = if current <= 0 { len - 1 } else { current - 1 } as usize;
        Some((prev, tracks[prev].path.clone()))
    }

    /// Scans one directory level for audio files and appends them in path
    /// order. Returns how many tracks were added; unreadable directories add
    /// nothing.
    pub async fn scan_directory(&self, dir: &Path) -> usize {
        let mut found: Vec<PathBuf> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_supported_audio_file(path))
                .collect(),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "Directory scan failed");
                return 0;
            }
        };
        found.sort_unstable();

        let mut tracks = self.tracks.lock().await;
        let mut added = 0;
        for path in found {
            tracks.push(TrackInfo::from_path(&path));
            added += 1;
        }
        added
    }
}
