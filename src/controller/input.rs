//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use super::AppController;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Help popup swallows everything except its own dismissal
        if self.model.ui_state().await.show_help_popup {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?')) {
                self.model.toggle_help_popup().await;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.model.set_should_quit(true);
            }
            KeyCode::Char('h') | KeyCode::Char('?') => {
                self.model.toggle_help_popup().await;
            }

            // Playback
            KeyCode::Char(' ') => self.toggle_playback().await,
            KeyCode::Char('x') => self.stop().await,
            KeyCode::Char('n') => self.next().await,
            KeyCode::Char('p') => self.previous().await,
            KeyCode::Left => self.seek_by(-10).await,
            KeyCode::Right => self.seek_by(10).await,

            // Volume
            KeyCode::Char('+') | KeyCode::Char('=') => self.volume_up().await,
            KeyCode::Char('-') => self.volume_down().await,
            KeyCode::Char('m') => self.toggle_mute().await,

            // Advisory modes
            KeyCode::Char('r') => self.cycle_repeat(),
            KeyCode::Char('s') => self.toggle_shuffle(),

            // Playlist
            KeyCode::Up => self.model.move_selection_up().await,
            KeyCode::Down => self.model.move_selection_down().await,
            KeyCode::Enter => self.play_selected().await,

            // Serial link
            KeyCode::Char('c') => self.reconnect_board().await,
            KeyCode::Char('d') => {
                self.disconnect_from_board();
                self.model.set_status_message("Board disconnected").await;
            }

            _ => {}
        }

        Ok(())
    }

    /// Re-dials the port given on the command line, if any.
    async fn reconnect_board(&self) {
        let Some(address) = self.board_address.clone() else {
            self.model
                .set_status_message("No serial port configured (pass one on the command line)")
                .await;
            return;
        };

        match self.connect_to_board(&address.port, address.baud) {
            Ok(()) => {
                self.model
                    .set_status_message(format!("Connected to {} @ {}", address.port, address.baud))
                    .await;
            }
            Err(err) => {
                tracing::error!(port = %address.port, error = %err, "Board connect failed");
                self.model
                    .set_status_message(format!("Connect failed: {err}"))
                    .await;
            }
        }
    }
}
