/// HC-SR04 ultrasonic range finder.
///
/// A 10 µs trigger pulse starts a ping; the echo line then stays high for
/// as long as the sound took to come back. Both edges are busy-polled.
use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{KioskError, Result};
use crate::peripherals::RangeProbe;

/// Microseconds of echo per centimeter of distance (round trip at ~343 m/s).
pub const US_PER_CM: f32 = 58.0;

/// Trigger pulse width in microseconds.
pub const TRIGGER_US: u32 = 10;

/// Free-running microsecond counter used to time the echo pulse.
pub trait MicrosClock {
    fn now_us(&mut self) -> u64;
}

/// Monotonic clock backed by `std::time::Instant`.
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrosClock for StdClock {
    fn now_us(&mut self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

pub fn pulse_to_cm(pulse_us: u64) -> f32 {
    pulse_us as f32 / US_PER_CM
}

pub struct Hcsr04<T, E, D, C> {
    trigger: T,
    echo: E,
    delay: D,
    clock: C,
    /// Bound on each edge wait. `None` polls forever.
    timeout_us: Option<u32>,
    name: &'static str,
}

impl<T, E, D, C> Hcsr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MicrosClock,
{
    pub fn new(name: &'static str, trigger: T, echo: E, delay: D, clock: C) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            timeout_us: None,
            name,
        }
    }

    pub fn with_timeout(mut self, timeout_us: Option<u32>) -> Self {
        self.timeout_us = timeout_us;
        self
    }

    fn ping(&mut self) -> Result<()> {
        self.trigger
            .set_low()
            .map_err(|e| KioskError::peripheral(self.name, e))?;
        self.delay.delay_us(2);
        self.trigger
            .set_high()
            .map_err(|e| KioskError::peripheral(self.name, e))?;
        self.delay.delay_us(TRIGGER_US);
        self.trigger
            .set_low()
            .map_err(|e| KioskError::peripheral(self.name, e))
    }

    /// Spin until the echo line reads `level`; returns the clock at that edge.
    fn wait_for(&mut self, level: bool, since: u64) -> Result<u64> {
        loop {
            let high = self
                .echo
                .is_high()
                .map_err(|e| KioskError::peripheral(self.name, e))?;
            let now = self.clock.now_us();
            if high == level {
                return Ok(now);
            }
            if let Some(limit) = self.timeout_us {
                if now.saturating_sub(since) > u64::from(limit) {
                    return Err(KioskError::HardwareTimeout(self.name));
                }
            }
        }
    }
}

impl<T, E, D, C> RangeProbe for Hcsr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MicrosClock,
{
    fn measure(&mut self) -> Result<f32> {
        self.ping()?;
        let armed = self.clock.now_us();
        let rise = self.wait_for(true, armed)?;
        let fall = self.wait_for(false, rise)?;
        let distance = pulse_to_cm(fall.saturating_sub(rise));
        log::trace!("{}: {:.1} cm", self.name, distance);
        Ok(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDelay;
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeTrigger {
        edges: Vec<bool>,
    }

    impl ErrorType for FakeTrigger {
        type Error = ErrorKind;
    }

    impl OutputPin for FakeTrigger {
        fn set_low(&mut self) -> core::result::Result<(), ErrorKind> {
            self.edges.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), ErrorKind> {
            self.edges.push(true);
            Ok(())
        }
    }

    /// Replays a level per poll; holds the last one when exhausted.
    struct FakeEcho {
        levels: VecDeque<bool>,
        last: bool,
    }

    impl FakeEcho {
        fn new(levels: &[bool]) -> Self {
            Self {
                levels: levels.iter().copied().collect(),
                last: false,
            }
        }
    }

    impl ErrorType for FakeEcho {
        type Error = ErrorKind;
    }

    impl InputPin for FakeEcho {
        fn is_high(&mut self) -> core::result::Result<bool, ErrorKind> {
            if let Some(level) = self.levels.pop_front() {
                self.last = level;
            }
            Ok(self.last)
        }

        fn is_low(&mut self) -> core::result::Result<bool, ErrorKind> {
            self.is_high().map(|h| !h)
        }
    }

    struct BrokenEcho;

    impl ErrorType for BrokenEcho {
        type Error = ErrorKind;
    }

    impl InputPin for BrokenEcho {
        fn is_high(&mut self) -> core::result::Result<bool, ErrorKind> {
            Err(ErrorKind::Other)
        }

        fn is_low(&mut self) -> core::result::Result<bool, ErrorKind> {
            Err(ErrorKind::Other)
        }
    }

    /// Advances a fixed step on every read.
    struct SteppingClock {
        now: u64,
        step: u64,
    }

    impl MicrosClock for SteppingClock {
        fn now_us(&mut self) -> u64 {
            self.now += self.step;
            self.now
        }
    }

    /// Runs backwards, as a clock source that was reset mid-pulse would.
    struct RewindingClock {
        now: u64,
    }

    impl MicrosClock for RewindingClock {
        fn now_us(&mut self) -> u64 {
            self.now -= 1_000;
            self.now
        }
    }

    fn probe<E: InputPin>(
        echo: E,
        step: u64,
    ) -> Hcsr04<FakeTrigger, E, RecordingDelay, SteppingClock> {
        Hcsr04::new(
            "camera probe",
            FakeTrigger::default(),
            echo,
            RecordingDelay::default(),
            SteppingClock { now: 0, step },
        )
    }

    #[test]
    fn pulse_width_converts_to_centimeters() {
        assert_eq!(pulse_to_cm(0), 0.0);
        assert_eq!(pulse_to_cm(580), 10.0);
        assert_eq!(pulse_to_cm(1566), 27.0);
    }

    #[test]
    fn measure_times_the_high_pulse() {
        // low, low, rise, high, fall: edges 580 µs apart
        let mut sensor = probe(FakeEcho::new(&[false, false, true, true, false]), 580);
        let cm = sensor.measure().unwrap();
        assert!((cm - 20.0).abs() < 1e-4, "got {cm}");
    }

    #[test]
    fn trigger_pulse_is_ten_microseconds() {
        let mut sensor = probe(FakeEcho::new(&[true, false]), 58);
        sensor.measure().unwrap();
        assert_eq!(sensor.trigger.edges, vec![false, true, false]);
        assert_eq!(sensor.delay.us, vec![2, TRIGGER_US]);
    }

    #[test]
    fn stuck_low_echo_times_out_when_bounded() {
        let mut sensor = probe(FakeEcho::new(&[]), 1_000).with_timeout(Some(30_000));
        let err = sensor.measure().unwrap_err();
        assert_eq!(err.kind(), "hardware-timeout");
        assert_eq!(err.to_string(), "camera probe timed out");
    }

    #[test]
    fn stuck_high_echo_times_out_when_bounded() {
        let mut sensor = probe(FakeEcho::new(&[true]), 1_000).with_timeout(Some(30_000));
        assert!(matches!(
            sensor.measure(),
            Err(KioskError::HardwareTimeout("camera probe"))
        ));
    }

    #[test]
    fn long_echo_within_bound_succeeds() {
        let mut levels = vec![true; 10];
        levels.push(false);
        let mut sensor = probe(FakeEcho::new(&levels), 100).with_timeout(Some(30_000));
        let cm = sensor.measure().unwrap();
        assert!((cm - 1000.0 / 58.0).abs() < 1e-3, "got {cm}");
    }

    #[test]
    fn clock_going_backwards_reads_as_zero_distance() {
        let mut sensor = Hcsr04::new(
            "temperature probe",
            FakeTrigger::default(),
            FakeEcho::new(&[true, false]),
            RecordingDelay::default(),
            RewindingClock { now: 10_000 },
        );
        assert_eq!(sensor.measure().unwrap(), 0.0);
    }

    #[test]
    fn pin_errors_are_peripheral_faults() {
        let mut sensor = probe(BrokenEcho, 1);
        assert_eq!(sensor.measure().unwrap_err().kind(), "peripheral");
    }

    #[test]
    fn std_clock_is_monotonic() {
        let mut clock = StdClock::new();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }
}
