/// Capabilities the kiosk consumes from hardware and the surrounding system.
///
/// The controller only ever talks to these traits. Reference
/// implementations live in `ultrasonic`, `thermal`, `vision`, `userlog` and
/// `link`; the firmware crate supplies the display, alert and reset.
use crate::classify::Classification;
use crate::error::Result;

/// Ultrasonic distance measurement.
pub trait RangeProbe {
    /// Distance to the nearest object in centimeters.
    fn measure(&mut self) -> Result<f32>;
}

/// Contactless thermometer.
pub trait ThermalProbe {
    /// Calibrated object temperature in degrees Celsius.
    fn read_celsius(&mut self) -> Result<f32>;
}

/// Camera plus mask classifier.
pub trait ImageClassifier {
    type Image;

    fn capture(&mut self) -> Result<Self::Image>;

    fn classify(&mut self, image: &Self::Image) -> Result<Classification>;
}

/// Operator-facing screen.
pub trait Display<I> {
    /// Show a captured frame.
    fn show(&mut self, image: &I) -> Result<()>;

    /// Show an error state. Best-effort: the device is about to restart.
    fn show_error(&mut self, message: &str);
}

/// Buzzer or light signalling a completed reading.
pub trait AlertActuator {
    fn pulse(&mut self, duration_ms: u32) -> Result<()>;
}

/// Append-only record store.
pub trait DurableLog {
    /// Append `line` followed by a newline.
    fn append(&mut self, line: &str) -> Result<()>;
}

/// Whole-device restart.
pub trait DeviceControl {
    fn reset(&mut self) -> !;
}
