//! Core type definitions for the application

/// Playback mode as observed by the board and the UI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaybackMode {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl From<PlaybackMode> for u8 {
    fn from(mode: PlaybackMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for PlaybackMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlaybackMode::Stopped),
            1 => Ok(PlaybackMode::Playing),
            2 => Ok(PlaybackMode::Paused),
            _ => Err(()),
        }
    }
}

/// Repeat mode state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RepeatMode {
    None = 0,
    One = 1,
    All = 2,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::One,
            RepeatMode::One => RepeatMode::All,
            RepeatMode::All => RepeatMode::None,
        }
    }
}

impl From<RepeatMode> for u8 {
    fn from(mode: RepeatMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for RepeatMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RepeatMode::None),
            1 => Ok(RepeatMode::One),
            2 => Ok(RepeatMode::All),
            _ => Err(()),
        }
    }
}

/// Application lifecycle state.
///
/// `Running` means a board is connected over serial; `Ready` means the app
/// is usable locally but offline. Losing the link never touches playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AppState {
    Uninitialized = 0,
    Ready = 1,
    Running = 2,
    Error = 3,
}

impl From<AppState> for u8 {
    fn from(state: AppState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for AppState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(AppState::Uninitialized),
            1 => Ok(AppState::Ready),
            2 => Ok(AppState::Running),
            3 => Ok(AppState::Error),
            _ => Err(()),
        }
    }
}

/// UI state for the application
#[derive(Clone, Default)]
pub struct UiState {
    pub selected_track: usize,
    pub status_message: Option<String>,
    pub show_help_popup: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_cycles_through_all_states() {
        assert_eq!(RepeatMode::None.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::None);
    }

    #[test]
    fn playback_mode_round_trips_through_u8() {
        for mode in [
            PlaybackMode::Stopped,
            PlaybackMode::Playing,
            PlaybackMode::Paused,
        ] {
            assert_eq!(PlaybackMode::try_from(u8::from(mode)), Ok(mode));
        }
        assert!(PlaybackMode::try_from(7).is_err());
    }
}
