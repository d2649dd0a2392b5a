mod audio;
mod controller;
mod logging;
mod model;
mod serial;
mod view;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::Mutex;

use audio::{PlaybackEngine, RodioEngine};
use controller::{AppController, BoardAddress};
use model::AppModel;
use serial::{BoardLink, SerialLink};
use view::{AppView, ViewModel};

const DEFAULT_BAUD_RATE: u32 = 115200;

/// `boardtune [PORT [BAUD [MUSIC_DIR]]]`
struct CliArgs {
    board: Option<BoardAddress>,
    music_dir: Option<PathBuf>,
}

fn parse_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);

    let board = match args.next() {
        Some(port) => {
            let baud = match args.next() {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| anyhow::anyhow!("invalid baud rate: {raw}"))?,
                None => DEFAULT_BAUD_RATE,
            };
            Some(BoardAddress { port, baud })
        }
        None => None,
    };

    Ok(CliArgs {
        board,
        music_dir: args.next().map(PathBuf::from),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== boardtune starting ===");
    let cli = parse_args()?;

    // Shared components
    let model = Arc::new(AppModel::new());
    let (rodio_engine, engine_events) = RodioEngine::new();
    let engine: Arc<Mutex<Box<dyn PlaybackEngine>>> =
        Arc::new(Mutex::new(Box::new(rodio_engine)));
    let (serial_link, link_events) = SerialLink::new();
    let link: Arc<dyn BoardLink> = Arc::new(serial_link);

    let controller = AppController::new(model.clone(), engine, link, cli.board);

    controller.initialize().await?;
    controller.start_engine_event_listener(engine_events);
    controller.start_link_event_listener(link_events);

    if let Some(dir) = &cli.music_dir {
        let added = controller.load_directory(dir).await;
        tracing::info!(dir = %dir.display(), added, "Initial music directory scanned");
    }

    // Auto-connect when a port was given; failure leaves the app usable
    // offline and the 'c' key re-attempts.
    if let Some(address) = controller.board_address.clone() {
        if let Err(err) = controller.connect_to_board(&address.port, address.baud) {
            tracing::warn!(port = %address.port, error = %err, "Initial board connect failed");
            model
                .set_status_message(format!("Connect failed: {err} (press 'c' to retry)"))
                .await;
        }
    }

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model.clone(), controller.clone()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    controller.shutdown().await;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("boardtune shutting down");
    Ok(())
}

async fn build_view_model(model: &AppModel, controller: &AppController) -> ViewModel {
    ViewModel {
        mode: model.player.mode(),
        volume: model.player.volume(),
        muted: model.player.is_muted(),
        repeat: model.player.repeat_mode(),
        shuffle: model.player.is_shuffle_enabled(),
        track_index: model.player.current_track_index(),
        position_ms: controller.engine_position_ms().await,
        duration_ms: controller.engine_duration_ms().await,
        tracks: model.library.snapshot().await,
        link_state: controller.link_state(),
        port_name: controller.link_port_name(),
        app_state: model.app_state(),
        ui: model.ui_state().await,
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        let vm = build_view_model(&model, &controller).await;
        terminal.draw(|f| AppView::render(f, &vm))?;

        // Short poll keeps the progress bar and link status fresh
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                let _ = controller.handle_key_event(key).await;
            }
        }

        if model.should_quit() {
            break;
        }
    }

    Ok(())
}
