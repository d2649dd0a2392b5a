//! Serial link event listener and command dispatch.
//!
//! The transport's reader thread never calls into application code; its
//! events land on a channel and this single task applies them in order.

use std::path::Path;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::model::AppState;
use crate::serial::{LinkEvent, LinkState};

use super::{AppController, BoardCommand, parse_command};

impl AppController {
    pub fn start_link_event_listener(&self, mut events: UnboundedReceiver<LinkEvent>) {
        let controller = self.clone();
        tracing::info!("Starting serial link event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if controller.model.should_quit() {
                    tracing::debug!("Link event listener shutting down");
                    break;
                }
                controller.handle_link_event(event).await;
            }
        });
    }

    pub(crate) async fn handle_link_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::StateChanged(LinkState::Connected) => {
                tracing::info!("Board connected, sending state snapshot");
                self.model.set_app_state(AppState::Running);
                // The peer gets the full picture right after handshake.
                self.send_status();
            }
            LinkEvent::StateChanged(LinkState::Disconnected | LinkState::Error) => {
                // Back to "ready but offline"; local playback keeps going.
                if self.model.app_state() == AppState::Running {
                    self.model.set_app_state(AppState::Ready);
                }
            }
            LinkEvent::StateChanged(LinkState::Connecting) => {}
            LinkEvent::LineReceived(line) => self.process_command(&line).await,
        }
    }

    /// Applies one received line. Unparseable lines are dropped without a
    /// reply or a state change.
    pub(crate) async fn process_command(&self, line: &str) {
        let Some(command) = parse_command(line) else {
            tracing::debug!(line, "Ignoring unrecognized command");
            return;
        };
        tracing::debug!(?command, "Executing board command");

        match command {
            BoardCommand::Play => self.play().await,
            BoardCommand::Pause => self.pause().await,
            BoardCommand::Stop => self.stop().await,
            BoardCommand::Next => self.next().await,
            BoardCommand::Previous => self.previous().await,
            BoardCommand::ToggleMute => self.toggle_mute().await,
            BoardCommand::SetVolume(volume) => self.set_volume(volume).await,
            BoardCommand::Load(path) => {
                if let Err(err) = self.load_track(Path::new(&path)).await {
                    tracing::warn!(path, error = %err, "Board-requested load failed");
                }
            }
            BoardCommand::Status => self.send_status(),
        }
    }
}
