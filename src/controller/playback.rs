//! Playback control methods

use std::path::Path;

use anyhow::Result;

use crate::model::{NO_TRACK, TrackInfo};

use super::AppController;

impl AppController {
    // ========================================================================
    // Transport-style controls
    // ========================================================================

    /// Starts or resumes playback. Unmuting comes first so the listener
    /// never perceives "play while still silenced".
    pub async fn play(&self) {
        let mut engine = self.engine.lock().await;
        if self.model.player.is_muted() {
            self.model.player.set_muted(false);
            engine.set_volume(self.model.player.volume());
        }
        engine.play();
    }

    pub async fn pause(&self) {
        self.engine.lock().await.pause();
    }

    pub async fn stop(&self) {
        self.engine.lock().await.stop();
    }

    /// UI convenience: one key flips between play and pause.
    pub async fn toggle_playback(&self) {
        let is_playing = self.engine.lock().await.is_playing();
        if is_playing {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    pub async fn next(&self) {
        let current = self.model.player.current_track_index();
        let Some((_, path)) = self.model.library.wrapped_next(current).await else {
            return;
        };
        tracing::debug!(path = %path.display(), "Advancing to next track");
        if self.load_track(&path).await.is_ok() {
            self.play().await;
        }
    }

    pub async fn previous(&self) {
        let current = self.model.player.current_track_index();
        let Some((_, path)) = self.model.library.wrapped_previous(current).await else {
            return;
        };
        tracing::debug!(path = %path.display(), "Moving to previous track");
        if self.load_track(&path).await.is_ok() {
            self.play().await;
        }
    }

    pub async fn seek_by(&self, delta_secs: i64) {
        let mut engine = self.engine.lock().await;
        if !engine.is_loaded() {
            return;
        }
        let position = engine.position_ms() as i64 + delta_secs * 1000;
        engine.seek(position.max(0) as u64);
    }

    // ========================================================================
    // Volume control
    // ========================================================================

    pub async fn set_volume(&self, volume: u8) {
        self.model.player.set_volume(volume);
        if !self.model.player.is_muted() {
            self.engine.lock().await.set_volume(self.model.player.volume());
        }
        self.send_status();
    }

    pub async fn volume_up(&self) {
        let volume = self.model.player.volume().saturating_add(5).min(100);
        self.set_volume(volume).await;
    }

    pub async fn volume_down(&self) {
        let volume = self.model.player.volume().saturating_sub(5);
        self.set_volume(volume).await;
    }

    /// Mute pushes volume 0 to the engine and leaves the remembered level
    /// untouched; unmute reapplies it.
    pub async fn toggle_mute(&self) {
        let mut engine = self.engine.lock().await;
        if self.model.player.is_muted() {
            self.model.player.set_muted(false);
            engine.set_volume(self.model.player.volume());
        } else {
            self.model.player.set_muted(true);
            engine.set_volume(0);
        }
        drop(engine);
        self.send_status();
    }

    // ========================================================================
    // Track loading and playlist
    // ========================================================================

    /// Loads a file into the engine. When the path is a playlist entry the
    /// current index follows it; a direct load from outside the playlist
    /// leaves the index alone.
    pub async fn load_track(&self, path: &Path) -> Result<()> {
        self.engine.lock().await.load(path)?;

        if let Some(index) = self.model.library.find_index_of_path(path).await {
            self.model.player.set_current_track_index(index as i32);
        }
        Ok(())
    }

    pub async fn add_to_playlist(&self, path: &Path) {
        let track = TrackInfo::from_path(path);
        let len = self.model.library.add(track).await;
        // The first entry of a fresh playlist becomes the selection.
        if len == 1 {
            self.model.player.set_current_track_index(0);
        }
    }

    pub async fn load_directory(&self, dir: &Path) -> usize {
        let added = self.model.library.scan_directory(dir).await;
        if added > 0
            && self.model.player.current_track_index() == NO_TRACK
            && !self.model.library.is_empty().await
        {
            self.model.player.set_current_track_index(0);
        }
        tracing::info!(dir = %dir.display(), added, "Directory loaded into playlist");
        added
    }

    /// UI: load and play the highlighted playlist row.
    pub async fn play_selected(&self) {
        let selected = self.model.selected_track().await;
        let Some(path) = self.model.library.track_path(selected).await else {
            return;
        };
        if self.load_track(&path).await.is_ok() {
            self.play().await;
        }
    }

    // ========================================================================
    // Advisory playback modes (UI only; not exposed on the serial grammar)
    // ========================================================================

    pub fn cycle_repeat(&self) {
        let mode = self.model.player.cycle_repeat_mode();
        tracing::debug!(?mode, "Repeat mode changed");
    }

    pub fn toggle_shuffle(&self) {
        let enabled = self.model.player.toggle_shuffle();
        tracing::debug!(enabled, "Shuffle toggled");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use anyhow::{Result, bail};
    use tokio::sync::Mutex;

    use crate::audio::{EngineEvent, EngineState, PlaybackEngine};
    use crate::controller::{AppController, BoardCommand, parse_command};
    use crate::model::{AppModel, AppState, PlaybackMode, TrackInfo};
    use crate::serial::{BoardLink, LinkState};

    // ========================================================================
    // Fakes
    // ========================================================================

    /// Everything the fake engine records; the harness keeps a second handle
    /// so tests can inspect and tweak it while the controller owns the
    /// engine. The `set_volume` history is what the mute tests assert on.
    #[derive(Default)]
    pub(crate) struct EngineLog {
        pub state: EngineState,
        pub volume: u8,
        pub volume_calls: Vec<u8>,
        pub loaded: Vec<PathBuf>,
        pub play_calls: usize,
        pub pause_calls: usize,
        pub stop_calls: usize,
        pub fail_loads: bool,
    }

    pub(crate) struct FakeEngine {
        log: Arc<StdMutex<EngineLog>>,
    }

    impl FakeEngine {
        pub fn new() -> (Self, Arc<StdMutex<EngineLog>>) {
            let log = Arc::new(StdMutex::new(EngineLog::default()));
            (Self { log: log.clone() }, log)
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        fn shutdown(&mut self) {
            self.log.lock().unwrap().state = EngineState::Idle;
        }

        fn load(&mut self, path: &std::path::Path) -> Result<()> {
            let mut log = self.log.lock().unwrap();
            if log.fail_loads {
                log.state = EngineState::Error;
                bail!("decode failed");
            }
            log.loaded.push(path.to_path_buf());
            log.state = EngineState::Loaded;
            Ok(())
        }

        fn play(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.play_calls += 1;
            log.state = EngineState::Playing;
        }

        fn pause(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.pause_calls += 1;
            log.state = EngineState::Paused;
        }

        fn stop(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.stop_calls += 1;
            log.state = EngineState::Loaded;
        }

        fn seek(&mut self, _position_ms: u64) {}

        fn set_volume(&mut self, volume: u8) {
            let mut log = self.log.lock().unwrap();
            log.volume = volume;
            log.volume_calls.push(volume);
        }

        fn volume(&self) -> u8 {
            self.log.lock().unwrap().volume
        }

        fn state(&self) -> EngineState {
            self.log.lock().unwrap().state
        }

        fn position_ms(&self) -> u64 {
            0
        }

        fn duration_ms(&self) -> u64 {
            0
        }
    }

    /// Fake serial link that records every sent line.
    pub(crate) struct FakeLink {
        pub state: StdMutex<LinkState>,
        pub sent: StdMutex<Vec<String>>,
    }

    impl FakeLink {
        pub fn new(state: LinkState) -> Self {
            Self {
                state: StdMutex::new(state),
                sent: StdMutex::new(Vec::new()),
            }
        }

        pub fn sent_lines(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl BoardLink for FakeLink {
        fn connect(&self, _port: &str, _baud: u32) -> Result<()> {
            *self.state.lock().unwrap() = LinkState::Connected;
            Ok(())
        }

        fn disconnect(&self) {
            *self.state.lock().unwrap() = LinkState::Disconnected;
        }

        fn state(&self) -> LinkState {
            *self.state.lock().unwrap()
        }

        fn port_name(&self) -> String {
            String::new()
        }

        fn baud_rate(&self) -> u32 {
            0
        }

        fn send(&self, data: &str) -> Result<usize> {
            if *self.state.lock().unwrap() != LinkState::Connected {
                bail!("not connected");
            }
            self.sent.lock().unwrap().push(data.to_string());
            Ok(data.len())
        }
    }

    pub(crate) struct Harness {
        pub controller: AppController,
        pub engine_log: Arc<StdMutex<EngineLog>>,
        pub link: Arc<FakeLink>,
        pub model: Arc<AppModel>,
    }

    pub(crate) fn harness(link_state: LinkState) -> Harness {
        let model = Arc::new(AppModel::new());
        let (fake_engine, engine_log) = FakeEngine::new();
        let engine: Arc<Mutex<Box<dyn PlaybackEngine>>> =
            Arc::new(Mutex::new(Box::new(fake_engine)));
        let link = Arc::new(FakeLink::new(link_state));
        let controller =
            AppController::new(model.clone(), engine.clone(), link.clone(), None);
        Harness {
            controller,
            engine_log,
            link,
            model,
        }
    }

    impl Harness {
        fn engine<R>(&self, inspect: impl FnOnce(&EngineLog) -> R) -> R {
            inspect(&self.engine_log.lock().unwrap())
        }
    }

    async fn add_tracks(h: &Harness, paths: &[&str]) {
        for path in paths {
            h.model
                .library
                .add(TrackInfo {
                    filename: path.rsplit('/').next().unwrap_or(path).to_string(),
                    path: PathBuf::from(path),
                    ..TrackInfo::default()
                })
                .await;
        }
    }

    // ========================================================================
    // Volume and mute
    // ========================================================================

    #[tokio::test]
    async fn set_volume_clamps_and_reaches_the_engine() {
        let h = harness(LinkState::Disconnected);
        h.controller.set_volume(250).await;
        assert_eq!(h.model.player.volume(), 100);
        assert_eq!(h.engine(|fake| fake.volume), 100);
    }

    #[tokio::test]
    async fn mute_then_unmute_restores_exact_volume_to_engine() {
        let h = harness(LinkState::Disconnected);
        h.controller.set_volume(65).await;

        h.controller.toggle_mute().await;
        assert!(h.model.player.is_muted());
        assert_eq!(h.model.player.volume(), 65);

        h.controller.toggle_mute().await;
        assert!(!h.model.player.is_muted());

        assert_eq!(h.engine(|fake| fake.volume_calls.clone()), vec![65, 0, 65]);
    }

    #[tokio::test]
    async fn set_volume_while_muted_is_stored_but_not_applied() {
        let h = harness(LinkState::Disconnected);
        h.controller.toggle_mute().await;
        h.controller.set_volume(80).await;

        assert_eq!(h.model.player.volume(), 80);
        assert_eq!(h.engine(|fake| fake.volume), 0);

        // Unmute applies the level stored while muted.
        h.controller.toggle_mute().await;
        assert_eq!(h.engine(|fake| fake.volume), 80);
    }

    #[tokio::test]
    async fn play_while_muted_unmutes_before_the_engine_plays() {
        let h = harness(LinkState::Disconnected);
        h.controller.set_volume(42).await;
        h.controller.toggle_mute().await;

        h.controller.play().await;

        assert!(!h.model.player.is_muted());
        let (calls, plays) = h.engine(|fake| (fake.volume_calls.clone(), fake.play_calls));
        assert_eq!(plays, 1);
        assert_eq!(calls.last(), Some(&42));
    }

    // ========================================================================
    // Playlist navigation
    // ========================================================================

    #[tokio::test]
    async fn next_then_previous_returns_to_the_original_index() {
        let h = harness(LinkState::Disconnected);
        add_tracks(&h, &["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]).await;
        h.model.player.set_current_track_index(1);

        h.controller.next().await;
        assert_eq!(h.model.player.current_track_index(), 2);
        h.controller.previous().await;
        assert_eq!(h.model.player.current_track_index(), 1);
    }

    #[tokio::test]
    async fn next_wraps_past_the_end_and_previous_wraps_past_the_start() {
        let h = harness(LinkState::Disconnected);
        add_tracks(&h, &["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]).await;

        h.model.player.set_current_track_index(2);
        h.controller.next().await;
        assert_eq!(h.model.player.current_track_index(), 0);

        h.controller.previous().await;
        assert_eq!(h.model.player.current_track_index(), 2);
    }

    #[tokio::test]
    async fn navigation_loads_and_plays_the_target() {
        let h = harness(LinkState::Disconnected);
        add_tracks(&h, &["/m/a.mp3", "/m/b.mp3"]).await;
        h.model.player.set_current_track_index(0);

        h.controller.next().await;

        let (loaded, plays) = h.engine(|fake| (fake.loaded.clone(), fake.play_calls));
        assert_eq!(loaded, vec![PathBuf::from("/m/b.mp3")]);
        assert_eq!(plays, 1);
    }

    #[tokio::test]
    async fn navigation_on_empty_playlist_is_a_no_op() {
        let h = harness(LinkState::Disconnected);
        h.controller.next().await;
        h.controller.previous().await;

        let (loaded, plays) = h.engine(|fake| (fake.loaded.clone(), fake.play_calls));
        assert!(loaded.is_empty());
        assert_eq!(plays, 0);
        assert_eq!(h.model.player.current_track_index(), crate::model::NO_TRACK);
    }

    #[tokio::test]
    async fn failed_load_does_not_move_the_index_or_play() {
        let h = harness(LinkState::Disconnected);
        add_tracks(&h, &["/m/a.mp3", "/m/b.mp3"]).await;
        h.model.player.set_current_track_index(0);
        h.engine_log.lock().unwrap().fail_loads = true;

        h.controller.next().await;

        assert_eq!(h.model.player.current_track_index(), 0);
        assert_eq!(h.engine(|fake| fake.play_calls), 0);
    }

    // ========================================================================
    // Track loading and playlist bookkeeping
    // ========================================================================

    #[tokio::test]
    async fn load_track_follows_playlist_membership() {
        let h = harness(LinkState::Disconnected);
        add_tracks(&h, &["/m/a.mp3", "/m/b.mp3"]).await;

        h.controller
            .load_track(std::path::Path::new("/m/b.mp3"))
            .await
            .unwrap();
        assert_eq!(h.model.player.current_track_index(), 1);

        // A direct load from outside the playlist leaves the index alone.
        h.controller
            .load_track(std::path::Path::new("/elsewhere/x.mp3"))
            .await
            .unwrap();
        assert_eq!(h.model.player.current_track_index(), 1);
    }

    #[tokio::test]
    async fn first_track_added_becomes_the_selection() {
        let h = harness(LinkState::Disconnected);
        assert_eq!(h.model.player.current_track_index(), crate::model::NO_TRACK);

        h.controller
            .add_to_playlist(std::path::Path::new("/m/a.mp3"))
            .await;
        assert_eq!(h.model.player.current_track_index(), 0);

        h.controller
            .add_to_playlist(std::path::Path::new("/m/b.mp3"))
            .await;
        assert_eq!(h.model.player.current_track_index(), 0);

        h.controller.clear_playlist().await;
        assert_eq!(h.model.player.current_track_index(), crate::model::NO_TRACK);
    }

    // ========================================================================
    // Status broadcasts
    // ========================================================================

    #[tokio::test]
    async fn volume_and_mute_changes_broadcast_status_in_order() {
        let h = harness(LinkState::Connected);
        h.controller.set_volume(65).await;
        h.controller.toggle_mute().await;

        assert_eq!(
            h.link.sent_lines(),
            vec![
                "STATUS:STOPPED,VOL:65,MUTE:0,TRACK:-1\n".to_string(),
                "STATUS:STOPPED,VOL:65,MUTE:1,TRACK:-1\n".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn no_status_is_attempted_while_disconnected() {
        let h = harness(LinkState::Disconnected);
        h.controller.set_volume(65).await;
        h.controller.toggle_mute().await;
        assert!(h.link.sent_lines().is_empty());
    }

    // ========================================================================
    // Serial command dispatch end to end
    // ========================================================================

    #[tokio::test]
    async fn volume_command_line_updates_state_case_insensitively() {
        let h = harness(LinkState::Connected);
        h.controller.process_command("VOL:65").await;
        assert_eq!(h.model.player.volume(), 65);

        h.controller.process_command("vol:40").await;
        assert_eq!(h.model.player.volume(), 40);

        h.controller.process_command("VOL:abc").await;
        assert_eq!(h.model.player.volume(), 40);
    }

    #[tokio::test]
    async fn play_then_pause_lines_end_in_paused_mode() {
        let h = harness(LinkState::Connected);
        add_tracks(&h, &["/m/a.mp3"]).await;
        h.controller
            .load_track(std::path::Path::new("/m/a.mp3"))
            .await
            .unwrap();

        for line in ["PLAY", "PAUSE"] {
            h.controller.process_command(line).await;
        }

        let (plays, pauses) = h.engine(|fake| (fake.play_calls, fake.pause_calls));
        assert_eq!((plays, pauses), (1, 1));

        // The engine's resulting state folds back onto the player mode.
        let final_state = h.engine(|fake| fake.state);
        h.controller.handle_engine_event(EngineEvent {
            state: final_state,
            position_ms: 0,
        });
        assert_eq!(h.model.player.mode(), PlaybackMode::Paused);
    }

    #[tokio::test]
    async fn unknown_command_changes_nothing() {
        let h = harness(LinkState::Connected);
        h.controller.process_command("REWIND").await;
        h.controller.process_command("").await;

        assert!(h.link.sent_lines().is_empty());
        assert_eq!(h.engine(|fake| fake.play_calls), 0);
    }

    #[tokio::test]
    async fn status_command_forces_an_immediate_broadcast() {
        let h = harness(LinkState::Connected);
        h.controller.process_command("STATUS").await;
        assert_eq!(
            h.link.sent_lines(),
            vec!["STATUS:STOPPED,VOL:50,MUTE:0,TRACK:-1\n".to_string()]
        );
    }

    #[tokio::test]
    async fn stop_and_load_commands_reach_the_engine() {
        let h = harness(LinkState::Connected);
        h.controller.process_command("STOP").await;
        assert_eq!(h.engine(|fake| fake.stop_calls), 1);

        h.controller.process_command("LOAD:/m/Direct.mp3").await;
        assert_eq!(
            h.engine(|fake| fake.loaded.clone()),
            vec![PathBuf::from("/m/Direct.mp3")]
        );
    }

    #[test]
    fn parse_is_reexported_for_the_dispatcher() {
        assert_eq!(parse_command("NEXT"), Some(BoardCommand::Next));
    }

    // ========================================================================
    // App lifecycle around link loss
    // ========================================================================

    #[tokio::test]
    async fn connect_broadcast_reflects_state_held_at_connection_time() {
        let h = harness(LinkState::Connected);
        h.model.set_app_state(AppState::Ready);

        h.controller
            .handle_link_event(crate::serial::LinkEvent::StateChanged(LinkState::Connected))
            .await;

        assert_eq!(h.model.app_state(), AppState::Running);
        assert_eq!(
            h.link.sent_lines().first().map(String::as_str),
            Some("STATUS:STOPPED,VOL:50,MUTE:0,TRACK:-1\n")
        );
    }

    #[tokio::test]
    async fn link_loss_demotes_running_to_ready_without_touching_playback() {
        let h = harness(LinkState::Connected);
        h.model.set_app_state(AppState::Running);
        h.model.player.set_mode(PlaybackMode::Playing);

        h.link.disconnect();
        h.controller
            .handle_link_event(crate::serial::LinkEvent::StateChanged(
                LinkState::Disconnected,
            ))
            .await;

        assert_eq!(h.model.app_state(), AppState::Ready);
        assert_eq!(h.model.player.mode(), PlaybackMode::Playing);
    }
}
