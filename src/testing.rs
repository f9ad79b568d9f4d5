//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;

use crate::classify::{Classification, MaskClass};
use crate::error::{KioskError, Result};
use crate::frame::{self, Frame};
use crate::link::{NetworkLink, Transport};
use crate::peripherals::{
    AlertActuator, DeviceControl, Display, DurableLog, ImageClassifier, RangeProbe, ThermalProbe,
};

/// Hands out at most `chunk` bytes per read.
pub struct ChunkedReader {
    data: Cursor<Vec<u8>>,
    chunk: usize,
}

impl ChunkedReader {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data: Cursor::new(data),
            chunk,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.data.read(&mut buf[..n])
    }
}

/// Accepts at most `per_write` bytes per write; zero simulates a stalled peer.
pub struct TrickleWriter {
    pub written: Vec<u8>,
    per_write: usize,
}

impl TrickleWriter {
    pub fn new(per_write: usize) -> Self {
        Self {
            written: Vec::new(),
            per_write,
        }
    }
}

impl Write for TrickleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.per_write);
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Observable state behind a [`MockStream`].
#[derive(Default)]
pub struct StreamState {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub read_chunk: usize,
    pub write_chunk: usize,
    pub fail_writes: bool,
    pub closed: bool,
}

impl StreamState {
    /// Decode everything the device wrote so far.
    pub fn sent_frames(&self) -> Vec<Frame> {
        let mut cursor = Cursor::new(self.outbound.clone());
        let mut frames = Vec::new();
        while (cursor.position() as usize) < self.outbound.len() {
            frames.push(frame::decode(&mut cursor).unwrap());
        }
        frames
    }
}

/// In-memory collector connection. Clones share state.
#[derive(Clone)]
pub struct MockStream {
    pub state: Rc<RefCell<StreamState>>,
}

impl MockStream {
    pub fn new() -> Self {
        let state = StreamState {
            read_chunk: usize::MAX,
            write_chunk: usize::MAX,
            ..StreamState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Queue a frame the "collector" will answer with.
    pub fn push_response(&self, payload: &[u8], kind: u8) {
        let bytes = frame::encode(payload, kind).unwrap();
        self.state.borrow_mut().inbound.extend(bytes);
    }

    pub fn push_raw(&self, bytes: &[u8]) {
        self.state.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    pub fn sent_frames(&self) -> Vec<Frame> {
        self.state.borrow().sent_frames()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        let n = buf.len().min(state.read_chunk).min(state.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "collector went away"));
        }
        let n = buf.len().min(state.write_chunk);
        state.outbound.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockStream {
    fn close(&mut self) -> io::Result<()> {
        self.state.borrow_mut().closed = true;
        Ok(())
    }
}

/// Hands out one prepared stream, or refuses.
pub struct MockNetwork {
    pub stream: Option<MockStream>,
    pub connects: Vec<(String, u16)>,
}

impl MockNetwork {
    pub fn new(stream: MockStream) -> Self {
        Self {
            stream: Some(stream),
            connects: Vec::new(),
        }
    }

    pub fn refusing() -> Self {
        Self {
            stream: None,
            connects: Vec::new(),
        }
    }
}

impl NetworkLink for MockNetwork {
    type Stream = MockStream;

    fn connect(&mut self, host: &str, port: u16) -> io::Result<MockStream> {
        self.connects.push((host.to_string(), port));
        self.stream
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "server is off"))
    }
}

/// Replays distances; running dry looks like a stuck echo line.
pub struct ScriptedProbe {
    readings: VecDeque<f32>,
    pub measured: usize,
}

impl ScriptedProbe {
    pub fn new(readings: &[f32]) -> Self {
        Self {
            readings: readings.iter().copied().collect(),
            measured: 0,
        }
    }
}

impl RangeProbe for ScriptedProbe {
    fn measure(&mut self) -> Result<f32> {
        self.measured += 1;
        self.readings
            .pop_front()
            .ok_or(KioskError::HardwareTimeout("scripted probe"))
    }
}

pub struct FixedThermal {
    pub celsius: f32,
    pub reads: usize,
}

impl FixedThermal {
    pub fn new(celsius: f32) -> Self {
        Self { celsius, reads: 0 }
    }
}

impl ThermalProbe for FixedThermal {
    fn read_celsius(&mut self) -> Result<f32> {
        self.reads += 1;
        Ok(self.celsius)
    }
}

/// Frames are sequence numbers; classification is fixed.
pub struct FakeCamera {
    pub result: Option<Classification>,
    pub captures: u32,
    pub classified: Vec<u32>,
}

impl FakeCamera {
    pub fn new(label: MaskClass, confidence: f32) -> Self {
        Self {
            result: Some(Classification { label, confidence }),
            captures: 0,
            classified: Vec::new(),
        }
    }

    pub fn broken() -> Self {
        Self {
            result: None,
            captures: 0,
            classified: Vec::new(),
        }
    }
}

impl ImageClassifier for FakeCamera {
    type Image = u32;

    fn capture(&mut self) -> Result<u32> {
        self.captures += 1;
        Ok(self.captures)
    }

    fn classify(&mut self, image: &u32) -> Result<Classification> {
        self.classified.push(*image);
        self.result
            .ok_or_else(|| KioskError::Peripheral("classifier returned no scores".into()))
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub shown: Vec<u32>,
    pub errors: Vec<String>,
}

impl Display<u32> for RecordingDisplay {
    fn show(&mut self, image: &u32) -> Result<()> {
        self.shown.push(*image);
        Ok(())
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

#[derive(Default)]
pub struct CountingAlert {
    pub pulses: Vec<u32>,
}

impl AlertActuator for CountingAlert {
    fn pulse(&mut self, duration_ms: u32) -> Result<()> {
        self.pulses.push(duration_ms);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLog {
    pub lines: Vec<String>,
}

impl MemoryLog {
    /// Contents as they would appear in the file.
    pub fn contents(&self) -> String {
        self.lines.iter().map(|l| format!("{l}\n")).collect()
    }
}

impl DurableLog for MemoryLog {
    fn append(&mut self, line: &str) -> Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Records requested sleeps instead of sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub ms: Vec<u32>,
    pub us: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.us.push(ns / 1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.us.push(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}

/// Restart stand-in: unwinds so the test can inspect the aftermath.
pub struct PanicReset;

pub const RESET_MARKER: &str = "device reset";

impl DeviceControl for PanicReset {
    fn reset(&mut self) -> ! {
        panic!("{}", RESET_MARKER)
    }
}
