//! Board command grammar and status line rendering.
//!
//! One line in, at most one command out. Keywords match case-insensitively;
//! a LOAD payload keeps its original case because paths are case-sensitive.
//! Anything that does not parse is dropped by the caller without a reply.

use crate::model::{PlaybackMode, PlayerState};

/// A command received from the board over the serial link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    ToggleMute,
    SetVolume(u8),
    Load(String),
    Status,
}

/// Parses one received line. `None` means the line is not a valid command
/// (unknown keyword or malformed argument) and must be ignored silently.
pub fn parse_command(line: &str) -> Option<BoardCommand> {
    let upper = line.to_ascii_uppercase();

    match upper.as_str() {
        "PLAY" => return Some(BoardCommand::Play),
        "PAUSE" => return Some(BoardCommand::Pause),
        "STOP" => return Some(BoardCommand::Stop),
        "NEXT" => return Some(BoardCommand::Next),
        "PREV" | "PREVIOUS" => return Some(BoardCommand::Previous),
        "MUTE" => return Some(BoardCommand::ToggleMute),
        "STATUS" => return Some(BoardCommand::Status),
        _ => {}
    }

    if let Some(value) = upper.strip_prefix("VOL:") {
        // Over-range values clamp; anything non-numeric is malformed.
        return value
            .parse::<u32>()
            .ok()
            .map(|volume| BoardCommand::SetVolume(volume.min(100) as u8));
    }

    if upper.starts_with("LOAD:") {
        // Path taken verbatim from the original line.
        return Some(BoardCommand::Load(line["LOAD:".len()..].to_string()));
    }

    None
}

/// Renders the outbound status line, newline-terminated:
/// `STATUS:<STATE>,VOL:<0-100>,MUTE:<0|1>,TRACK:<index>\n`
pub fn status_line(player: &PlayerState) -> String {
    let mode = match player.mode() {
        PlaybackMode::Playing => "PLAYING",
        PlaybackMode::Paused => "PAUSED",
        PlaybackMode::Stopped => "STOPPED",
    };

    format!(
        "STATUS:{},VOL:{},MUTE:{},TRACK:{}\n",
        mode,
        player.volume(),
        u8::from(player.is_muted()),
        player.current_track_index()
    )
}
