//! Fault taxonomy for the kiosk.
//!
//! Every error the controller can hit ends in the same place: the main loop
//! closes the link, shows the message, pauses, and restarts the device. The
//! variants only exist so the operator screen and the log can say *what*
//! went wrong.

use thiserror::Error;

/// Convenience alias for results using the kiosk error type.
pub type Result<T> = core::result::Result<T, KioskError>;

#[derive(Debug, Error)]
pub enum KioskError {
    /// Malformed frame header or type field, or a record that is not UTF-8.
    #[error("framing error: {0}")]
    Framing(String),

    /// Connection refused/reset, truncated stream, read or write failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A probe line never transitioned within the configured bound.
    #[error("{0} timed out")]
    HardwareTimeout(&'static str),

    /// Payload length does not fit the fixed-width header.
    #[error("payload of {len} bytes does not fit the length header")]
    Encoding { len: usize },

    /// Type codes travel as a single ASCII digit.
    #[error("type code {0} is not a single decimal digit")]
    TypeCode(u8),

    /// Sensor, camera, display or log collaborator failure.
    #[error("peripheral error: {0}")]
    Peripheral(String),

    /// Configuration overlay rejected.
    #[error("configuration error: {0}")]
    Config(&'static str),
}

impl KioskError {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            KioskError::Framing(_) => "framing",
            KioskError::Transport(_) => "transport",
            KioskError::HardwareTimeout(_) => "hardware-timeout",
            KioskError::Encoding { .. } | KioskError::TypeCode(_) => "encoding",
            KioskError::Peripheral(_) => "peripheral",
            KioskError::Config(_) => "config",
        }
    }

    pub(crate) fn peripheral(what: &str, err: impl core::fmt::Debug) -> Self {
        KioskError::Peripheral(format!("{what}: {err:?}"))
    }
}
