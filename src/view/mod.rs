//! View module - UI rendering
//!
//! Read-only rendering of the player state, playlist, and serial link
//! status using ratatui. The view issues no operations itself; every key
//! press goes through the controller.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph},
};

use crate::model::{AppState, PlaybackMode, RepeatMode, TrackInfo, UiState};
use crate::serial::LinkState;

/// Everything one frame needs, snapshotted before drawing.
pub struct ViewModel {
    pub mode: PlaybackMode,
    pub volume: u8,
    pub muted: bool,
    pub repeat: RepeatMode,
    pub shuffle: bool,
    pub track_index: i32,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub tracks: Vec<TrackInfo>,
    pub link_state: LinkState,
    pub port_name: String,
    pub app_state: AppState,
    pub ui: UiState,
}

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, vm: &ViewModel) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title + link status
                Constraint::Min(0),    // Playlist
                Constraint::Length(3), // Progress bar with playback info
            ])
            .split(frame.area());

        render_top_bar(frame, chunks[0], vm);
        render_playlist(frame, chunks[1], vm);
        render_progress_bar(frame, chunks[2], vm);

        if vm.ui.show_help_popup {
            render_help_popup(frame);
        }
    }
}

fn link_label(vm: &ViewModel) -> (String, Color) {
    match vm.link_state {
        LinkState::Connected => (format!("Board: {} ✓", vm.port_name), Color::Green),
        LinkState::Connecting => ("Board: connecting...".to_string(), Color::Yellow),
        LinkState::Error => ("Board: link error".to_string(), Color::Red),
        LinkState::Disconnected => ("Board: offline".to_string(), Color::DarkGray),
    }
}

fn render_top_bar(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let app_state = match vm.app_state {
        AppState::Uninitialized => "starting",
        AppState::Ready => "ready",
        AppState::Running => "remote",
        AppState::Error => "error",
    };
    let title = Paragraph::new(format!(" boardtune [{}]", app_state))
        .block(Block::default().borders(Borders::ALL).title(" Player "));
    frame.render_widget(title, halves[0]);

    let (label, color) = link_label(vm);
    let text = match &vm.ui.status_message {
        Some(message) => format!(" {} — {}", label, message),
        None => format!(" {}", label),
    };
    let link = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title(" Serial "));
    frame.render_widget(link, halves[1]);
}

fn render_playlist(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let items: Vec<ListItem> = vm
        .tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let marker = if vm.track_index == index as i32 { "▶ " } else { "  " };
            let meta = if track.artist.is_empty() {
                track.filename.clone()
            } else {
                format!("{} — {}", track.artist, track.filename)
            };
            ListItem::new(format!("{marker}{meta}"))
        })
        .collect();

    let count = vm.tracks.len();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Playlist ({count} tracks) ")),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !vm.tracks.is_empty() {
        state.select(Some(vm.ui.selected_track.min(vm.tracks.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn current_track_label(vm: &ViewModel) -> String {
    let track = usize::try_from(vm.track_index)
        .ok()
        .and_then(|index| vm.tracks.get(index));
    match track {
        Some(track) => {
            let symbol = match vm.mode {
                PlaybackMode::Playing => "▶",
                PlaybackMode::Paused => "⏸",
                PlaybackMode::Stopped => "⏹",
            };
            if track.artist.is_empty() {
                format!(" {} {}", symbol, track.filename)
            } else {
                format!(" {} {} | {} ({})", symbol, track.filename, track.artist, track.album)
            }
        }
        None => " No track selected".to_string(),
    }
}

fn render_progress_bar(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let repeat_text = match vm.repeat {
        RepeatMode::None => "Repeat: Off",
        RepeatMode::One => "Repeat: One",
        RepeatMode::All => "Repeat: All",
    };
    let shuffle_text = if vm.shuffle { "Shuffle: On" } else { "Shuffle: Off" };
    let volume_text = if vm.muted {
        "Vol: muted".to_string()
    } else {
        format!("Vol: {}%", vm.volume)
    };

    let time_str = format!(
        "{} / {}",
        format_duration(vm.position_ms),
        format_duration(vm.duration_ms)
    );
    let progress_ratio = if vm.duration_ms > 0 {
        (vm.position_ms as f64 / vm.duration_ms as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let controls_info = format!(" {} | {} | {} ", shuffle_text, repeat_text, volume_text);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(current_track_label(vm))
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(progress_ratio)
        .label(time_str);

    frame.render_widget(gauge, area);
}

fn render_help_popup(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());
    let lines = [
        "space  play / pause",
        "x      stop",
        "n / p  next / previous track",
        "← / →  seek 10s",
        "+ / -  volume",
        "m      mute",
        "r      repeat mode",
        "s      shuffle",
        "↑ / ↓  select track",
        "enter  play selection",
        "c / d  connect / disconnect board",
        "q      quit",
    ];
    let text: Vec<Line> = lines.iter().map(|line| Line::from(*line)).collect();

    frame.render_widget(Clear, area);
    let popup = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(" Keys (h to close) "));
    frame.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
