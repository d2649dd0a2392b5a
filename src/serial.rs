//! Serial transport to the control board.
//!
//! Owns exactly one serial connection and turns its byte stream into
//! discrete line events, and vice versa. A dedicated reader thread blocks on
//! the device with a short timeout and pushes framed lines into an event
//! channel; nothing on the reader thread ever calls back into consumer code.
//! The receiving half of the channel is taken once at wiring time and
//! consumed by a single controller-owned task.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Baud rates the board side supports. Anything else is rejected before the
/// device is touched.
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];

/// Device read timeout; doubles as the reader loop's bounded wait.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Pause after a zero-byte read so an idle line does not spin the loop.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Error = 3,
}

impl From<LinkState> for u8 {
    fn from(state: LinkState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for LinkState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(LinkState::Disconnected),
            1 => Ok(LinkState::Connecting),
            2 => Ok(LinkState::Connected),
            3 => Ok(LinkState::Error),
            _ => Err(()),
        }
    }
}

/// Everything the transport reports, multiplexed onto one channel so the
/// consumer sees state changes and lines in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    StateChanged(LinkState),
    LineReceived(String),
}

/// Capability surface the dispatcher programs against; lets controller tests
/// run against a fake without a real device.
pub trait BoardLink: Send + Sync {
    fn connect(&self, port_name: &str, baud_rate: u32) -> Result<()>;
    fn disconnect(&self);
    fn state(&self) -> LinkState;
    fn port_name(&self) -> String;
    fn baud_rate(&self) -> u32;
    fn send(&self, data: &str) -> Result<usize>;

    fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }
}

/// Accumulates raw bytes and yields complete lines.
///
/// A line is everything up to `\n`, with one trailing `\r` stripped. Partial
/// lines persist across pushes indefinitely; empty lines are swallowed.
#[derive(Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }
}

/// State shared with the reader thread.
struct LinkShared {
    state: AtomicU8,
    running: AtomicBool,
    events: UnboundedSender<LinkEvent>,
}

impl LinkShared {
    fn set_state(&self, state: LinkState) {
        self.state.store(state.into(), Ordering::SeqCst);
    }

    fn transition(&self, state: LinkState) {
        self.set_state(state);
        // Receiver may already be gone during shutdown.
        let _ = self.events.send(LinkEvent::StateChanged(state));
    }
}

#[derive(Default)]
struct ConnectionInfo {
    port_name: String,
    baud_rate: u32,
}

/// The one serial connection of the process.
pub struct SerialLink {
    shared: Arc<LinkShared>,
    info: Mutex<ConnectionInfo>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SerialLink {
    /// Creates the link plus the event receiver the controller will consume.
    pub fn new() -> (Self, UnboundedReceiver<LinkEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let link = Self {
            shared: Arc::new(LinkShared {
                state: AtomicU8::new(LinkState::Disconnected.into()),
                running: AtomicBool::new(false),
                events,
            }),
            info: Mutex::new(ConnectionInfo::default()),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        };
        (link, events_rx)
    }

    /// Stops the reader thread and drops the device handles without emitting
    /// any notification. Used from `connect` to clear stale `Error`
    /// leftovers, and from the drop path.
    fn teardown(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self.reader.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        if let Ok(mut writer) = self.writer.lock() {
            *writer = None;
        }
        if let Ok(mut info) = self.info.lock() {
            *info = ConnectionInfo::default();
        }
    }

    fn reader_loop(mut port: Box<dyn SerialPort>, shared: Arc<LinkShared>) {
        let mut framer = LineFramer::new();
        let mut buf = [0u8; 256];

        while shared.running.load(Ordering::SeqCst) {
            match port.read(&mut buf) {
                Ok(0) => std::thread::sleep(IDLE_SLEEP),
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        tracing::trace!(line = %line, "Serial line received");
                        let _ = shared.events.send(LinkEvent::LineReceived(line));
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Serial read failed, dropping link");
                    shared.transition(LinkState::Error);
                    break;
                }
            }
        }
    }
}

impl BoardLink for SerialLink {
    fn connect(&self, port_name: &str, baud_rate: u32) -> Result<()> {
        if self.is_connected() {
            self.disconnect();
        }
        // Clears reader/handle leftovers after an Error transition.
        self.teardown();

        if !SUPPORTED_BAUD_RATES.contains(&baud_rate) {
            self.shared.transition(LinkState::Error);
            bail!("unsupported baud rate: {baud_rate}");
        }

        self.shared.transition(LinkState::Connecting);
        tracing::info!(port = port_name, baud = baud_rate, "Opening serial port");

        let device = match serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
        {
            Ok(device) => device,
            Err(err) => {
                tracing::error!(port = port_name, error = %err, "Failed to open serial port");
                self.shared.transition(LinkState::Error);
                return Err(err).with_context(|| format!("opening {port_name}"));
            }
        };

        let reader_port = match device.try_clone() {
            Ok(port) => port,
            Err(err) => {
                self.shared.transition(LinkState::Error);
                return Err(err).context("cloning port handle for reader");
            }
        };

        if let Ok(mut writer) = self.writer.lock() {
            *writer = Some(device);
        }
        if let Ok(mut info) = self.info.lock() {
            info.port_name = port_name.to_string();
            info.baud_rate = baud_rate;
        }

        self.shared.set_state(LinkState::Connected);
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || Self::reader_loop(reader_port, shared))
            .map_err(|err| {
                self.shared.transition(LinkState::Error);
                anyhow!("spawning serial reader: {err}")
            })?;
        if let Ok(mut reader) = self.reader.lock() {
            *reader = Some(handle);
        }

        // The Connected notification is on the channel before we return.
        let _ = self
            .shared
            .events
            .send(LinkEvent::StateChanged(LinkState::Connected));
        tracing::info!(port = port_name, "Serial link connected");
        Ok(())
    }

    fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        // Join before touching the device so no event fires after we return.
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self.reader.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        if let Ok(mut writer) = self.writer.lock() {
            *writer = None;
        }
        if let Ok(mut info) = self.info.lock() {
            *info = ConnectionInfo::default();
        }

        self.shared.transition(LinkState::Disconnected);
        tracing::info!("Serial link disconnected");
    }

    fn state(&self) -> LinkState {
        LinkState::try_from(self.shared.state.load(Ordering::SeqCst))
            .unwrap_or(LinkState::Disconnected)
    }

    fn port_name(&self) -> String {
        self.info
            .lock()
            .map(|info| info.port_name.clone())
            .unwrap_or_default()
    }

    fn baud_rate(&self) -> u32 {
        self.info.lock().map(|info| info.baud_rate).unwrap_or(0)
    }

    fn send(&self, data: &str) -> Result<usize> {
        if !self.is_connected() {
            bail!("serial link is not connected");
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("serial writer lock poisoned"))?;
        let port = writer
            .as_mut()
            .ok_or_else(|| anyhow!("serial link is not connected"))?;

        match port.write(data.as_bytes()) {
            Ok(written) => Ok(written),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                Err(err).context("serial write timed out")
            }
            Err(err) => {
                // A hard write failure means the device is gone.
                self.shared.transition(LinkState::Error);
                Err(err).context("serial write failed")
            }
        }
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.teardown();
    }
}
