/// Camera and mask classifier on a UART-attached co-processor.
///
/// The co-processor owns the image sensor and runs the model. The kiosk
/// asks for a snapshot with a `snap` line and gets one NDJSON line back:
///
/// ```text
/// {"seq":12,"scores":[0.97,0.01,0.01,0.005,0.005]}
/// ```
///
/// Scores are in [`MaskClass::ALL`](crate::classify::MaskClass::ALL) order.
use std::io::{ErrorKind, Read, Write};

use serde::Deserialize;

use crate::classify::{self, Classification};
use crate::error::{KioskError, Result};
use crate::peripherals::ImageClassifier;

pub const MAX_LINE_LEN: usize = 256;

/// Upper bound on scores per snapshot; more than the model emits.
pub const MAX_SCORES: usize = 8;

pub const SNAPSHOT_REQUEST: &[u8] = b"snap\n";

/// NDJSON line accumulator.
/// Bytes collect until a newline; the line is then handed out without it.
/// An overlong line is dropped whole, up to its newline.
pub struct LineReader {
    buf: [u8; MAX_LINE_LEN],
    pos: usize,
    discarding: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_LINE_LEN],
            pos: 0,
            discarding: false,
        }
    }

    /// Feed one byte. Returns a complete line when one ends here.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if self.discarding {
            if byte == b'\n' || byte == b'\r' {
                self.discarding = false;
            }
            return None;
        }
        if byte == b'\n' || byte == b'\r' {
            if self.pos > 0 {
                let line = &self.buf[..self.pos];
                self.pos = 0;
                Some(line)
            } else {
                None
            }
        } else if self.pos < self.buf.len() {
            self.buf[self.pos] = byte;
            self.pos += 1;
            None
        } else {
            log::warn!("Co-processor line over {} bytes dropped", MAX_LINE_LEN);
            self.pos = 0;
            self.discarding = true;
            None
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

/// One captured frame as reported by the co-processor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snapshot {
    pub seq: u32,
    pub scores: heapless::Vec<f32, MAX_SCORES>,
}

impl Snapshot {
    pub fn parse(line: &[u8]) -> Result<Self> {
        serde_json_core::from_slice::<Snapshot>(line)
            .map(|(snapshot, _)| snapshot)
            .map_err(|e| KioskError::peripheral("co-processor reply", e))
    }
}

pub struct VisionCoprocessor<P> {
    port: P,
    reader: LineReader,
}

impl<P: Read + Write> VisionCoprocessor<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            reader: LineReader::new(),
        }
    }

    fn read_line(&mut self) -> Result<Snapshot> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(KioskError::HardwareTimeout("camera")),
                Ok(_) => {
                    if let Some(line) = self.reader.feed(byte[0]) {
                        return Snapshot::parse(line);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(KioskError::peripheral("camera", e)),
            }
        }
    }
}

impl<P: Read + Write> ImageClassifier for VisionCoprocessor<P> {
    type Image = Snapshot;

    fn capture(&mut self) -> Result<Snapshot> {
        self.port
            .write_all(SNAPSHOT_REQUEST)
            .and_then(|_| self.port.flush())
            .map_err(|e| KioskError::peripheral("camera", e))?;
        let snapshot = self.read_line()?;
        log::debug!("Snapshot {} ({} scores)", snapshot.seq, snapshot.scores.len());
        Ok(snapshot)
    }

    fn classify(&mut self, image: &Snapshot) -> Result<Classification> {
        classify::arg_max(&image.scores)
    }
}
