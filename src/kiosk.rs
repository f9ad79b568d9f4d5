/// Per-visitor trigger cycle.
///
/// One pass: range the thermometer side, maybe take a temperature; range
/// the camera side, maybe classify (always refresh the preview); poll the
/// collector and persist whatever record it hands back; then wait out the
/// probes' re-trigger spacing. Nothing carries over between passes except
/// the cycle counter.
use embedded_hal::delay::DelayNs;

use crate::classify::Classification;
use crate::config::KioskConfig;
use crate::error::Result;
use crate::link::{LinkSupervisor, Transport};
use crate::peripherals::{
    AlertActuator, Display, DurableLog, ImageClassifier, RangeProbe, ThermalProbe,
};
use crate::protocol::{InboundRecord, OutboundMessage};

/// Collaborators the cycle drives. Borrowed for the life of the controller.
pub struct Devices<'a, I> {
    pub temp_probe: &'a mut dyn RangeProbe,
    pub cam_probe: &'a mut dyn RangeProbe,
    pub thermometer: &'a mut dyn ThermalProbe,
    pub camera: &'a mut dyn ImageClassifier<Image = I>,
    pub display: &'a mut dyn Display<I>,
    pub alert: &'a mut dyn AlertActuator,
    pub log: &'a mut dyn DurableLog,
    pub delay: &'a mut dyn DelayNs,
}

/// Where in the cycle the controller is. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ProbeTemperature,
    ProbeCamera,
    Poll,
    Persist,
    Sleep,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::ProbeTemperature => "probe-temperature",
            Phase::ProbeCamera => "probe-camera",
            Phase::Poll => "poll",
            Phase::Persist => "persist",
            Phase::Sleep => "sleep",
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub temp_distance_cm: f32,
    pub cam_distance_cm: f32,
    /// Temperature sent to the collector, if the thermometer fired
    pub temperature: Option<f32>,
    /// Classification sent to the collector, if the camera fired
    pub classification: Option<Classification>,
    /// Record appended to the log, if the collector pushed one
    pub record: Option<InboundRecord>,
}

pub struct TriggerStateMachine<'a, I> {
    config: &'a KioskConfig,
    devices: Devices<'a, I>,
    phase: Phase,
    cycles: u64,
}

impl<'a, I> TriggerStateMachine<'a, I> {
    pub fn new(config: &'a KioskConfig, devices: Devices<'a, I>) -> Self {
        Self {
            config,
            devices,
            phase: Phase::Idle,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed cycles since boot.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one full pass. Any error leaves the phase at the failing step.
    pub fn run_cycle<S: Transport>(&mut self, link: &mut LinkSupervisor<S>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.phase = Phase::ProbeTemperature;
        report.temp_distance_cm = self.devices.temp_probe.measure()?;
        if report.temp_distance_cm <= self.config.temp_threshold_cm {
            report.temperature = Some(self.take_temperature(link)?);
        }

        self.phase = Phase::ProbeCamera;
        report.cam_distance_cm = self.devices.cam_probe.measure()?;
        if report.cam_distance_cm <= self.config.cam_threshold_cm {
            report.classification = Some(self.classify_visitor(link)?);
        } else {
            let image = self.devices.camera.capture()?;
            self.devices.display.show(&image)?;
        }

        self.phase = Phase::Poll;
        link.send(&OutboundMessage::poll())?;
        let response = link.receive()?;

        self.phase = Phase::Persist;
        if let Some(record) = InboundRecord::from_frame(&response)? {
            log::info!("Persisting type {} record ({} bytes)", record.kind, record.line.len());
            self.devices.log.append(&record.line)?;
            report.record = Some(record);
        }

        self.phase = Phase::Sleep;
        self.devices.delay.delay_ms(self.config.cycle_interval_ms);

        self.phase = Phase::Idle;
        self.cycles += 1;
        Ok(report)
    }

    fn take_temperature<S: Transport>(&mut self, link: &mut LinkSupervisor<S>) -> Result<f32> {
        let celsius = self.devices.thermometer.read_celsius()?;
        log::info!("Temperature {:.2} C", celsius);
        link.send(&OutboundMessage::temperature(celsius)?)?;
        self.devices.alert.pulse(self.config.buzz_ms)?;
        self.devices.delay.delay_ms(self.config.half_sleep());
        Ok(celsius)
    }

    fn classify_visitor<S: Transport>(
        &mut self,
        link: &mut LinkSupervisor<S>,
    ) -> Result<Classification> {
        self.devices.delay.delay_ms(self.config.settle_ms);
        let image = self.devices.camera.capture()?;
        self.devices.display.show(&image)?;
        let classification = self.devices.camera.classify(&image)?;
        log::info!(
            "Classified {:?} at {:.1}%",
            classification.label.as_str(),
            classification.confidence * 100.0
        );
        // Confidence always goes first.
        link.send(&OutboundMessage::confidence(classification.confidence)?)?;
        link.send(&OutboundMessage::label(&classification)?)?;
        self.devices.alert.pulse(self.config.buzz_ms)?;
        self.devices.delay.delay_ms(self.config.sleep_ms);
        Ok(classification)
    }

    /// Screen and delay for the fault path.
    pub fn fault_panel(&mut self) -> (&mut (dyn Display<I> + 'a), &mut (dyn DelayNs + 'a)) {
        (&mut *self.devices.display, &mut *self.devices.delay)
    }
}
