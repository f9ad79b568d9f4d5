/// Length-prefixed framing for the collector link.
///
/// Every unit on the wire is a 7-byte ASCII decimal length (left-justified,
/// space-padded), a single ASCII digit type code, then exactly `length`
/// payload bytes. No terminator, no checksum. The decoder consumes the
/// stream strictly in header → type → payload order and never assumes a
/// single `read` call returns everything it asked for.
use std::io::{self, ErrorKind, Read, Write};

use crate::error::{KioskError, Result};

/// Width of the length header in bytes.
pub const HEADER_WIDTH: usize = 7;

/// Width of the type field in bytes.
pub const TYPE_WIDTH: usize = 1;

/// Largest payload whose length still fits the header.
pub const MAX_PAYLOAD_LEN: usize = 9_999_999;

/// One decoded wire unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(kind: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Payload length as announced by the header.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Encode `payload` with type code `kind` into wire bytes.
pub fn encode(payload: &[u8], kind: u8) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_WIDTH + TYPE_WIDTH + payload.len());
    encode_into(payload, kind, &mut out)?;
    Ok(out)
}

/// Encode into an existing buffer. Nothing is appended on error.
pub fn encode_into(payload: &[u8], kind: u8, out: &mut Vec<u8>) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(KioskError::Encoding { len: payload.len() });
    }
    if kind > 9 {
        return Err(KioskError::TypeCode(kind));
    }
    let header = format!("{:<width$}", payload.len(), width = HEADER_WIDTH);
    debug_assert_eq!(header.len(), HEADER_WIDTH);
    out.extend_from_slice(header.as_bytes());
    out.push(b'0' + kind);
    out.extend_from_slice(payload);
    Ok(())
}

/// Encode and push the whole frame through `writer`.
///
/// Partial writes are continued until every byte is accepted. A write that
/// accepts zero bytes while data remains is reported as `WriteZero`.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8], kind: u8) -> Result<()> {
    let bytes = encode(payload, kind)?;
    write_all_chunked(writer, &bytes)?;
    writer.flush()?;
    Ok(())
}

fn write_all_chunked<W: Write + ?Sized>(writer: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match writer.write(bytes) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "transport accepted no bytes",
                ))
            }
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Read one frame from `reader`, blocking until it is complete.
pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Frame> {
    let mut header = [0u8; HEADER_WIDTH];
    read_exact_chunked(reader, &mut header)?;
    let length = parse_length(&header)?;

    let mut kind = [0u8; TYPE_WIDTH];
    read_exact_chunked(reader, &mut kind)?;
    let kind = parse_kind(kind[0])?;

    let payload = read_payload(reader, length)?;

    Ok(Frame { kind, payload })
}

/// Read size for payload bytes. The payload buffer only grows as data
/// actually arrives, so a large announced length costs nothing up front.
const PAYLOAD_CHUNK: usize = 512;

fn read_payload<R: Read + ?Sized>(reader: &mut R, length: usize) -> io::Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(length.min(PAYLOAD_CHUNK));
    let mut chunk = [0u8; PAYLOAD_CHUNK];
    while payload.len() < length {
        let want = (length - payload.len()).min(PAYLOAD_CHUNK);
        match reader.read(&mut chunk[..want]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream closed after {} of {length} payload bytes", payload.len()),
                ))
            }
            Ok(n) => payload.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(payload)
}

/// Fill `buf` completely, accumulating as many short reads as it takes.
fn read_exact_chunked<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream closed after {filled} of {} bytes", buf.len()),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn parse_length(header: &[u8; HEADER_WIDTH]) -> Result<usize> {
    let text = core::str::from_utf8(header)
        .map_err(|_| KioskError::Framing(format!("length header is not ASCII: {header:?}")))?;
    let digits = text.trim_matches(' ');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KioskError::Framing(format!(
            "length header is not numeric: {text:?}"
        )));
    }
    digits
        .parse::<usize>()
        .map_err(|_| KioskError::Framing(format!("length header out of range: {text:?}")))
}

fn parse_kind(byte: u8) -> Result<u8> {
    if byte.is_ascii_digit() {
        Ok(byte - b'0')
    } else {
        Err(KioskError::Framing(format!(
            "type field is not a digit: 0x{byte:02x}"
        )))
    }
}
