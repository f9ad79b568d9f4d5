/// Application messages carried by the collector link.
///
/// The kiosk speaks in single-digit type codes: poll, temperature, label and
/// confidence go out; records (or a bare keep-alive) come back in answer to
/// each poll.
use core::fmt::Write as _;

use heapless::String;

use crate::classify::Classification;
use crate::error::{KioskError, Result};
use crate::frame::Frame;

/// Capacity of an outbound text payload. Labels, temperatures and
/// percentages are all short.
pub const MAX_TEXT_LEN: usize = 32;

/// Outbound payload text
pub type MsgText = String<MAX_TEXT_LEN>;

/// Wire type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Request any pending record; inbound it is a keep-alive
    Poll,
    /// Calibrated body temperature, degrees Celsius
    Temperature,
    /// Classification label
    Label,
    /// User record pushed by the collector
    Record,
    /// Classification confidence, percent
    Confidence,
}

impl MessageKind {
    pub const fn code(self) -> u8 {
        match self {
            MessageKind::Poll => 0,
            MessageKind::Temperature => 1,
            MessageKind::Label => 2,
            MessageKind::Record => 3,
            MessageKind::Confidence => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MessageKind::Poll),
            1 => Some(MessageKind::Temperature),
            2 => Some(MessageKind::Label),
            3 => Some(MessageKind::Record),
            4 => Some(MessageKind::Confidence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Poll => "poll",
            MessageKind::Temperature => "temperature",
            MessageKind::Label => "label",
            MessageKind::Record => "record",
            MessageKind::Confidence => "confidence",
        }
    }
}

/// A value the kiosk sends, converted 1:1 into a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub text: MsgText,
}

impl OutboundMessage {
    /// Empty poll asking the collector for a pending record.
    pub fn poll() -> Self {
        Self {
            kind: MessageKind::Poll,
            text: MsgText::new(),
        }
    }

    /// Temperature with two decimal places, e.g. `36.52`.
    pub fn temperature(celsius: f32) -> Result<Self> {
        Self::formatted(MessageKind::Temperature, format_args!("{celsius:.2}"))
    }

    /// Confidence scaled to percent with one decimal place, e.g. `97.0`.
    pub fn confidence(score: f32) -> Result<Self> {
        Self::formatted(MessageKind::Confidence, format_args!("{:.1}", score * 100.0))
    }

    pub fn label(classification: &Classification) -> Result<Self> {
        Self::formatted(
            MessageKind::Label,
            format_args!("{}", classification.label.as_str()),
        )
    }

    /// Render `args` into the payload. Text that does not fit is an
    /// encoding error, never a truncated payload.
    fn formatted(kind: MessageKind, args: core::fmt::Arguments<'_>) -> Result<Self> {
        let mut text = MsgText::new();
        if text.write_fmt(args).is_err() {
            let len = std::fmt::format(args).len();
            return Err(KioskError::Encoding { len });
        }
        Ok(Self { kind, text })
    }

    pub fn code(&self) -> u8 {
        self.kind.code()
    }

    pub fn payload(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

/// A record pushed by the collector, ready for the durable log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    /// Type code as received (non-zero)
    pub kind: u8,
    /// Payload text with every `"` removed
    pub line: std::string::String,
}

impl InboundRecord {
    /// Interpret a poll response. Type 0 is an acknowledgement and yields
    /// `None`; any other type must carry UTF-8 text.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>> {
        if frame.kind == MessageKind::Poll.code() {
            return Ok(None);
        }
        let text = core::str::from_utf8(&frame.payload).map_err(|e| {
            KioskError::Framing(format!("type {} record is not UTF-8: {e}", frame.kind))
        })?;
        Ok(Some(Self {
            kind: frame.kind,
            line: strip_quotes(text),
        }))
    }
}

/// Remove every double-quote character.
pub fn strip_quotes(text: &str) -> std::string::String {
    text.chars().filter(|&c| c != '"').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MaskClass;

    #[test]
    fn type_codes_match_wire_protocol() {
        assert_eq!(MessageKind::Poll.code(), 0);
        assert_eq!(MessageKind::Temperature.code(), 1);
        assert_eq!(MessageKind::Label.code(), 2);
        assert_eq!(MessageKind::Record.code(), 3);
        assert_eq!(MessageKind::Confidence.code(), 4);
        for code in 0..=4 {
            assert_eq!(MessageKind::from_code(code).unwrap().code(), code);
        }
        assert_eq!(MessageKind::from_code(7), None);
    }

    #[test]
    fn poll_is_empty() {
        let poll = OutboundMessage::poll();
        assert_eq!(poll.code(), 0);
        assert!(poll.payload().is_empty());
    }

    #[test]
    fn temperature_has_two_decimals() {
        assert_eq!(
            OutboundMessage::temperature(36.518).unwrap().text.as_str(),
            "36.52"
        );
    }

    #[test]
    fn oversized_readings_are_rejected_not_truncated() {
        for celsius in [1.0e31, f32::MAX] {
            let err = OutboundMessage::temperature(celsius).unwrap_err();
            assert_eq!(err.kind(), "encoding");
            assert!(matches!(err, KioskError::Encoding { len } if len > MAX_TEXT_LEN));
        }
        assert!(OutboundMessage::confidence(1.0e31).is_err());
        assert!(OutboundMessage::temperature(-40.0).is_ok());
    }

    #[test]
    fn confidence_is_percent_with_one_decimal() {
        let msg = OutboundMessage::confidence(0.97).unwrap();
        assert_eq!(msg.code(), 4);
        assert_eq!(msg.text.as_str(), "97.0");
        assert_eq!(OutboundMessage::confidence(1.0).unwrap().text.as_str(), "100.0");
        assert_eq!(OutboundMessage::confidence(0.0).unwrap().text.as_str(), "0.0");
    }

    #[test]
    fn label_uses_class_text() {
        let c = Classification {
            label: MaskClass::FaceMaskAndShield,
            confidence: 0.5,
        };
        let msg = OutboundMessage::label(&c).unwrap();
        assert_eq!(msg.code(), 2);
        assert_eq!(msg.text.as_str(), "face mask and face shield");
    }

    #[test]
    fn record_strips_quotes() {
        let frame = Frame::new(3, &b"\"John,555-1234,john@example.com\"\n"[..]);
        let record = InboundRecord::from_frame(&frame).unwrap().unwrap();
        assert_eq!(record.kind, 3);
        assert_eq!(record.line, "John,555-1234,john@example.com\n");
    }

    #[test]
    fn keep_alive_is_not_a_record() {
        let frame = Frame::new(0, &b""[..]);
        assert_eq!(InboundRecord::from_frame(&frame).unwrap(), None);
    }

    #[test]
    fn non_utf8_record_is_a_framing_error() {
        let frame = Frame::new(3, vec![0xff, 0xfe]);
        let err = InboundRecord::from_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), "framing");
    }
}
