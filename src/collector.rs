/// Collector side of the kiosk link.
///
/// Keeps the queue of user records waiting to be stored on the kiosk and
/// answers each poll with the oldest one, or with a bare keep-alive when
/// the queue is empty. Readings coming the other way are decoded into
/// [`KioskEvent`]s for whatever front end is attached. Only one kiosk is
/// served at a time.
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};

use crate::error::{KioskError, Result};
use crate::frame::{self, Frame};
use crate::protocol::MessageKind;

/// A reading reported by the kiosk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskEvent {
    Temperature(String),
    Label(String),
    Confidence(String),
}

impl KioskEvent {
    fn from_frame(frame: &Frame) -> Option<Self> {
        let text = String::from_utf8_lossy(&frame.payload).into_owned();
        match MessageKind::from_code(frame.kind)? {
            MessageKind::Temperature => Some(KioskEvent::Temperature(text)),
            MessageKind::Label => Some(KioskEvent::Label(text)),
            MessageKind::Confidence => Some(KioskEvent::Confidence(text)),
            MessageKind::Poll | MessageKind::Record => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Collector {
    /// Wire-ready record payloads, oldest first
    queue: VecDeque<Vec<u8>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a CSV row. It travels as a JSON string literal, quotes included;
    /// the kiosk strips them before logging.
    pub fn enqueue_record(&mut self, row: &str) -> Result<()> {
        // Worst case every char becomes a \uXXXX escape.
        let mut buf = vec![0u8; row.len() * 6 + 2];
        let len = serde_json_core::to_slice(row, &mut buf)
            .map_err(|_| KioskError::Encoding { len: row.len() })?;
        buf.truncate(len);
        if buf.len() > frame::MAX_PAYLOAD_LEN {
            return Err(KioskError::Encoding { len: buf.len() });
        }
        self.queue.push_back(buf);
        Ok(())
    }

    /// Join form fields into a CSV row and queue it.
    pub fn enqueue_user_fields(&mut self, fields: &[&str]) -> Result<()> {
        self.enqueue_record(&fields.join(","))
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Answer one frame from the kiosk.
    ///
    /// Polls get a reply frame; readings become events. Unknown types are
    /// logged and ignored.
    pub fn handle(&mut self, frame: &Frame) -> (Option<KioskEvent>, Option<Frame>) {
        if frame.kind == MessageKind::Poll.code() {
            let reply = match self.queue.pop_front() {
                Some(record) => Frame::new(MessageKind::Record.code(), record),
                None => Frame::new(MessageKind::Poll.code(), Vec::<u8>::new()),
            };
            return (None, Some(reply));
        }
        match KioskEvent::from_frame(frame) {
            Some(event) => {
                log::info!("Kiosk reported {:?}", event);
                (Some(event), None)
            }
            None => {
                log::warn!("Ignoring frame type {} from kiosk", frame.kind);
                (None, None)
            }
        }
    }

    /// Serve one kiosk connection until it closes.
    pub fn serve_connection<S, F>(&mut self, stream: &mut S, mut on_event: F) -> Result<()>
    where
        S: Read + Write,
        F: FnMut(KioskEvent),
    {
        loop {
            let frame = match frame::decode(stream) {
                Ok(frame) => frame,
                Err(KioskError::Transport(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    log::info!("Kiosk disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            let (event, reply) = self.handle(&frame);
            if let Some(event) = event {
                on_event(event);
            }
            if let Some(reply) = reply {
                frame::write_frame(stream, &reply.payload, reply.kind)?;
            }
        }
    }
}
