//! Main application model shared by the controller and the view.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::Mutex;

use super::library::MediaLibrary;
use super::player_state::PlayerState;
use super::types::{AppState, UiState};

pub struct AppModel {
    pub player: PlayerState,
    pub library: MediaLibrary,
    app_state: AtomicU8,
    ui_state: Mutex<UiState>,
    should_quit: AtomicBool,
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AppModel {
    pub fn new() -> Self {
        Self {
            player: PlayerState::new(),
            library: MediaLibrary::new(),
            app_state: AtomicU8::new(AppState::Uninitialized.into()),
            ui_state: Mutex::new(UiState::default()),
            should_quit: AtomicBool::new(false),
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::try_from(self.app_state.load(Ordering::SeqCst))
            .unwrap_or(AppState::Uninitialized)
    }

    pub fn set_app_state(&self, state: AppState) {
        self.app_state.store(state.into(), Ordering::SeqCst);
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }

    pub fn set_should_quit(&self, quit: bool) {
        self.should_quit.store(quit, Ordering::SeqCst);
    }

    pub async fn ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn set_status_message(&self, message: impl Into<String>) {
        self.ui_state.lock().await.status_message = Some(message.into());
    }

    pub async fn clear_status_message(&self) {
        self.ui_state.lock().await.status_message = None;
    }

    pub async fn toggle_help_popup(&self) {
        let mut state = self.ui_state.lock().await;
        state.show_help_popup = !state.show_help_popup;
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        state.selected_track = state.selected_track.saturating_sub(1);
    }

    pub async fn move_selection_down(&self) {
        let track_count = self.library.len().await;
        let mut state = self.ui_state.lock().await;
        if state.selected_track + 1 < track_count {
            state.selected_track += 1;
        }
    }

    pub async fn selected_track(&self) -> usize {
        self.ui_state.lock().await.selected_track
    }

    pub async fn reset_selection(&self) {
        self.ui_state.lock().await.selected_track = 0;
    }
}
