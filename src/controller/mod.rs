//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that turns external
//! stimuli (serial lines from the board, key events from the UI) into
//! playback-engine operations and player-state mutations, and that mirrors
//! the player state back to the board as status lines. It is organized into
//! submodules by responsibility:
//!
//! - `commands`: board command grammar and status line rendering
//! - `playback`: playback/volume/playlist operations
//! - `link_events`: serial link event listener and command dispatch
//! - `player_events`: audio engine event listener
//! - `input`: key event handling

mod commands;
mod input;
mod link_events;
mod playback;
mod player_events;

pub use commands::{BoardCommand, parse_command, status_line};

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::audio::PlaybackEngine;
use crate::model::{AppModel, AppState, NO_TRACK};
use crate::serial::{BoardLink, LinkState};

/// Serial endpoint given on the command line, reused by the reconnect key.
#[derive(Clone, Debug)]
pub struct BoardAddress {
    pub port: String,
    pub baud: u32,
}

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    pub(crate) engine: Arc<Mutex<Box<dyn PlaybackEngine>>>,
    pub(crate) link: Arc<dyn BoardLink>,
    pub(crate) board_address: Option<BoardAddress>,
}

impl AppController {
    pub fn new(
        model: Arc<AppModel>,
        engine: Arc<Mutex<Box<dyn PlaybackEngine>>>,
        link: Arc<dyn BoardLink>,
        board_address: Option<BoardAddress>,
    ) -> Self {
        Self {
            model,
            engine,
            link,
            board_address,
        }
    }

    /// Brings up the audio engine and pushes the initial volume to it.
    /// Listener tasks are spawned separately so tests can drive events by
    /// hand.
    pub async fn initialize(&self) -> Result<()> {
        if self.model.app_state() != AppState::Uninitialized {
            return Ok(());
        }

        let mut engine = self.engine.lock().await;
        if let Err(err) = engine.initialize() {
            self.model.set_app_state(AppState::Error);
            return Err(err);
        }
        engine.set_volume(self.model.player.volume());
        drop(engine);

        self.model.set_app_state(AppState::Ready);
        tracing::info!("Controller initialized");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.disconnect_from_board();
        self.engine.lock().await.shutdown();
        self.clear_playlist().await;
        self.model.set_app_state(AppState::Uninitialized);
        tracing::info!("Controller shut down");
    }

    // ========================================================================
    // Serial connection
    // ========================================================================

    pub fn connect_to_board(&self, port: &str, baud: u32) -> Result<()> {
        self.link.connect(port, baud)
    }

    pub fn disconnect_from_board(&self) {
        self.link.disconnect();
    }

    pub fn is_connected_to_board(&self) -> bool {
        self.link.is_connected()
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn link_port_name(&self) -> String {
        self.link.port_name()
    }

    /// Mirrors the player state to the board. Dropped silently while the
    /// link is down; the peer gets a fresh snapshot on the next connect.
    pub(crate) fn send_status(&self) {
        if !self.link.is_connected() {
            return;
        }
        let line = status_line(&self.model.player);
        if let Err(err) = self.link.send(&line) {
            tracing::debug!(error = %err, "Status broadcast failed");
        }
    }

    // ========================================================================
    // Engine queries for rendering
    // ========================================================================

    pub async fn engine_position_ms(&self) -> u64 {
        self.engine.lock().await.position_ms()
    }

    pub async fn engine_duration_ms(&self) -> u64 {
        self.engine.lock().await.duration_ms()
    }

    // ========================================================================
    // Playlist bookkeeping
    // ========================================================================

    pub async fn clear_playlist(&self) {
        self.model.library.clear().await;
        self.model.player.set_current_track_index(NO_TRACK);
        self.model.reset_selection().await;
    }
}
