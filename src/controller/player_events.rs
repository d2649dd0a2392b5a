//! Audio engine event listener.

use tokio::sync::mpsc::UnboundedReceiver;

use crate::audio::{EngineEvent, EngineState};
use crate::model::PlaybackMode;

use super::AppController;

impl AppController {
    pub fn start_engine_event_listener(&self, mut events: UnboundedReceiver<EngineEvent>) {
        let controller = self.clone();
        tracing::info!("Starting audio engine event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if controller.model.should_quit() {
                    tracing::debug!("Engine event listener shutting down");
                    break;
                }
                controller.handle_engine_event(event);
            }
        });
    }

    /// Folds the engine's five states onto the three the board observes and
    /// re-broadcasts status.
    pub(crate) fn handle_engine_event(&self, event: EngineEvent) {
        let mode = match event.state {
            EngineState::Playing => PlaybackMode::Playing,
            EngineState::Paused => PlaybackMode::Paused,
            EngineState::Idle | EngineState::Loaded | EngineState::Error => PlaybackMode::Stopped,
        };
        tracing::debug!(engine_state = ?event.state, ?mode, position_ms = event.position_ms, "Engine event");

        self.model.player.set_mode(mode);
        self.model
            .player
            .set_position_secs((event.position_ms / 1000) as u32);
        self.send_status();
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::{EngineEvent, EngineState};
    use crate::controller::playback::tests::harness;
    use crate::model::PlaybackMode;
    use crate::serial::LinkState;

    fn event(state: EngineState, position_ms: u64) -> EngineEvent {
        EngineEvent { state, position_ms }
    }

    #[tokio::test]
    async fn engine_states_fold_onto_three_modes() {
        let h = harness(LinkState::Disconnected);

        for (engine_state, expected) in [
            (EngineState::Playing, PlaybackMode::Playing),
            (EngineState::Paused, PlaybackMode::Paused),
            (EngineState::Loaded, PlaybackMode::Stopped),
            (EngineState::Idle, PlaybackMode::Stopped),
            (EngineState::Error, PlaybackMode::Stopped),
        ] {
            h.controller.handle_engine_event(event(engine_state, 0));
            assert_eq!(h.model.player.mode(), expected);
        }
    }

    #[tokio::test]
    async fn engine_events_update_position_and_broadcast() {
        let h = harness(LinkState::Connected);
        h.controller
            .handle_engine_event(event(EngineState::Playing, 12_500));

        assert_eq!(h.model.player.position_secs(), 12);
        assert_eq!(
            h.link.sent_lines(),
            vec!["STATUS:PLAYING,VOL:50,MUTE:0,TRACK:-1\n".to_string()]
        );
    }
}
