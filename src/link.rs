/// Collector connection with crash-only fault handling.
///
/// The supervisor owns the one stream to the collector. Any failure while
/// connecting, sending or receiving moves it to `Faulted` for good: the
/// connection is never repaired in place. The caller hands the error to
/// [`LinkSupervisor::fault`], which closes the stream, puts the error on
/// screen, waits long enough for a person to read it and restarts the
/// device.
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::error::{KioskError, Result};
use crate::frame::{self, Frame};
use crate::peripherals::{DeviceControl, Display};
use crate::protocol::OutboundMessage;

/// A bidirectional byte stream that can be torn down.
pub trait Transport: Read + Write {
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Opens the collector connection.
pub trait NetworkLink {
    type Stream: Transport;

    fn connect(&mut self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Plain TCP, no delay, optional idle bound on reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpLink {
    pub read_timeout: Option<Duration>,
}

impl TcpLink {
    pub fn new(read_timeout: Option<Duration>) -> Self {
        Self { read_timeout }
    }
}

impl NetworkLink for TcpLink {
    type Stream = TcpStream;

    fn connect(&mut self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.read_timeout)?;
        Ok(stream)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Terminal. Only a device restart leaves this state.
    Faulted,
}

pub struct LinkSupervisor<S> {
    stream: Option<S>,
    state: ConnectionState,
    error_pause_ms: u32,
}

impl<S: Transport> LinkSupervisor<S> {
    pub fn new(error_pause_ms: u32) -> Self {
        Self {
            stream: None,
            state: ConnectionState::Disconnected,
            error_pause_ms,
        }
    }

    /// Wrap an already-open stream.
    pub fn from_stream(stream: S, error_pause_ms: u32) -> Self {
        Self {
            stream: Some(stream),
            state: ConnectionState::Connected,
            error_pause_ms,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connect<N>(&mut self, network: &mut N, host: &str, port: u16) -> Result<()>
    where
        N: NetworkLink<Stream = S>,
    {
        if self.state != ConnectionState::Disconnected {
            return Err(not_connected(self.state));
        }
        match network.connect(host, port) {
            Ok(stream) => {
                log::info!("Connected to collector at {}:{}", host, port);
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                log::error!("Collector {}:{} unreachable: {}", host, port, e);
                self.state = ConnectionState::Faulted;
                Err(e.into())
            }
        }
    }

    pub fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        log::debug!(
            "-> {} {:?}",
            message.kind.as_str(),
            message.text.as_str()
        );
        self.send_raw(message.payload(), message.code())
    }

    fn send_raw(&mut self, payload: &[u8], kind: u8) -> Result<()> {
        self.guarded(|stream| frame::write_frame(stream, payload, kind))
    }

    /// Block until the collector's next frame has arrived in full.
    pub fn receive(&mut self) -> Result<Frame> {
        let frame = self.guarded(|stream| frame::decode(stream))?;
        log::debug!("<- type {} ({} bytes)", frame.kind, frame.len());
        Ok(frame)
    }

    fn guarded<T>(&mut self, op: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        let stream = match (self.state, self.stream.as_mut()) {
            (ConnectionState::Connected, Some(stream)) => stream,
            (state, _) => return Err(not_connected(state)),
        };
        op(stream).map_err(|err| {
            self.state = ConnectionState::Faulted;
            err
        })
    }

    /// Best-effort close. The supervisor is unusable afterwards.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close() {
                log::debug!("Ignoring close error: {}", e);
            }
        }
        self.state = ConnectionState::Faulted;
    }

    /// Everything the fault path does short of the restart.
    pub fn shutdown<I>(
        &mut self,
        err: &KioskError,
        display: &mut dyn Display<I>,
        delay: &mut dyn DelayNs,
    ) {
        log::error!("Fault ({}): {}", err.kind(), err);
        self.close();
        display.show_error(&format!("ERROR: {err}"));
        delay.delay_ms(self.error_pause_ms);
    }

    /// Close, report, pause, restart. Never returns.
    pub fn fault<I>(
        &mut self,
        err: &KioskError,
        display: &mut dyn Display<I>,
        delay: &mut dyn DelayNs,
        device: &mut dyn DeviceControl,
    ) -> ! {
        self.shutdown(err, display, delay);
        log::warn!("Restarting device");
        device.reset()
    }
}

fn not_connected(state: ConnectionState) -> KioskError {
    KioskError::Transport(io::Error::new(
        io::ErrorKind::NotConnected,
        format!("collector link is {state:?}"),
    ))
}
