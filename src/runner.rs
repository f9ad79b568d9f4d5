/// Top-level control loop.
///
/// Boots the collector link, then runs the trigger cycle forever. There is
/// exactly one error branch: whatever failed, and wherever in the cycle it
/// failed, the link is closed, the error is shown and the device restarts.
use crate::config::KioskConfig;
use crate::error::{KioskError, Result};
use crate::kiosk::{CycleReport, Devices, TriggerStateMachine};
use crate::link::{LinkSupervisor, NetworkLink, Transport};
use crate::peripherals::DeviceControl;

pub struct MainLoop<'a, I, S> {
    machine: TriggerStateMachine<'a, I>,
    link: LinkSupervisor<S>,
    device: &'a mut dyn DeviceControl,
}

impl<'a, I, S: Transport> MainLoop<'a, I, S> {
    /// Connect to the collector. A failed connect restarts the device.
    pub fn boot<N>(
        config: &'a KioskConfig,
        devices: Devices<'a, I>,
        network: &mut N,
        device: &'a mut dyn DeviceControl,
    ) -> Self
    where
        N: NetworkLink<Stream = S>,
    {
        let mut machine = TriggerStateMachine::new(config, devices);
        let mut link = LinkSupervisor::new(config.error_sleep_ms);
        if let Err(err) = link.connect(network, &config.server_host, config.server_port) {
            let (display, delay) = machine.fault_panel();
            link.fault(&err, display, delay, device);
        }
        Self {
            machine,
            link,
            device,
        }
    }

    /// Assemble around a link that is already up.
    pub fn with_link(
        machine: TriggerStateMachine<'a, I>,
        link: LinkSupervisor<S>,
        device: &'a mut dyn DeviceControl,
    ) -> Self {
        Self {
            machine,
            link,
            device,
        }
    }

    pub fn link(&self) -> &LinkSupervisor<S> {
        &self.link
    }

    /// One trigger cycle. Errors are returned, not handled.
    pub fn step(&mut self) -> Result<CycleReport> {
        self.machine.run_cycle(&mut self.link)
    }

    pub fn run(mut self) -> ! {
        log::info!("Kiosk loop running");
        loop {
            match self.step() {
                Ok(report) => {
                    if report.temperature.is_some()
                        || report.classification.is_some()
                        || report.record.is_some()
                    {
                        log::debug!("Cycle {}: {:?}", self.machine.cycles(), report);
                    }
                }
                Err(err) => self.crash(err),
            }
        }
    }

    fn crash(&mut self, err: KioskError) -> ! {
        log::warn!(
            "Cycle {} failed during {}",
            self.machine.cycles(),
            self.machine.phase().as_str()
        );
        let (display, delay) = self.machine.fault_panel();
        self.link.fault(&err, display, delay, &mut *self.device)
    }
}
