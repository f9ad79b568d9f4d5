/// Kiosk configuration.
///
/// Compiled-in defaults match the deployed kiosk. A JSON overlay (embedded
/// by the firmware at build time) may replace any subset of fields; missing
/// fields keep their defaults. The configuration is read once at boot and
/// never changes afterwards.
use core::time::Duration;

use heapless::String;
use serde::Deserialize;

use crate::error::{KioskError, Result};

/// Column header written when the user log is first created.
pub const USER_LOG_HEADER: &str = "name,contact_number,email,address,date_time,temperature,classification,confidence_level,cough_others,fever_others,headache_others,difficulty_breathing_others,cough,fever,headache,difficulty_breathing";

pub type HostString = String<64>;
pub type SsidString = String<33>;
pub type PasswordString = String<65>;
pub type PathString = String<64>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Temperature probe fires at or below this distance (cm)
    pub temp_threshold_cm: f32,
    /// Camera classification fires at or below this distance (cm)
    pub cam_threshold_cm: f32,
    /// Base cycle sleep after an action (ms); the temperature step sleeps half
    pub sleep_ms: u32,
    /// How long the error screen stays up before the restart (ms)
    pub error_sleep_ms: u32,
    /// Minimum spacing between cycles so the probes can re-trigger (ms)
    pub cycle_interval_ms: u32,
    /// Pause between the camera trigger and the capture (ms)
    pub settle_ms: u32,
    /// Alert pulse length (ms)
    pub buzz_ms: u32,
    /// Multiplicative calibration for the thermometer
    pub temp_multiplier: f32,
    /// Optional bound on each echo wait (µs). `None` waits forever.
    pub echo_timeout_us: Option<u32>,
    /// Optional idle bound on collector reads (ms). `None` blocks forever.
    pub read_timeout_ms: Option<u32>,
    pub server_host: HostString,
    pub server_port: u16,
    pub wifi_ssid: SsidString,
    pub wifi_password: PasswordString,
    pub log_path: PathString,
}

impl KioskConfig {
    pub fn new() -> Self {
        Self {
            temp_threshold_cm: 3.0,
            cam_threshold_cm: 27.0,
            sleep_ms: 500,
            error_sleep_ms: 4000,
            cycle_interval_ms: 60,
            settle_ms: 100,
            buzz_ms: 100,
            temp_multiplier: 1.13,
            echo_timeout_us: None,
            read_timeout_ms: None,
            server_host: String::new(),
            server_port: 3000,
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            log_path: String::try_from("user_info.csv").unwrap_or_default(),
        }
    }

    /// Parse a JSON overlay on top of the defaults and validate it.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let (config, _) = serde_json_core::from_slice::<KioskConfig>(data)
            .map_err(|_| KioskError::Config("malformed JSON overlay"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.temp_threshold_cm >= 0.0) || !(self.cam_threshold_cm >= 0.0) {
            return Err(KioskError::Config("distance thresholds must be non-negative"));
        }
        if !(self.temp_multiplier > 0.0) {
            return Err(KioskError::Config("temperature multiplier must be positive"));
        }
        if self.log_path.is_empty() {
            return Err(KioskError::Config("log path must not be empty"));
        }
        Ok(())
    }

    pub fn half_sleep(&self) -> u32 {
        self.sleep_ms / 2
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self::new()
    }
}
