//! Active buzzer on a plain GPIO: high for the pulse, then low.

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{Output, OutputPin, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::sys::EspError;

use maskwatch::board;
use maskwatch::error::{KioskError, Result};
use maskwatch::peripherals::AlertActuator;

pub struct Buzzer<'d, P: OutputPin> {
    pin: PinDriver<'d, P, Output>,
}

impl<'d, P: OutputPin> Buzzer<'d, P> {
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> core::result::Result<Self, EspError> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        log::info!("Buzzer ready on GPIO{}", board::BUZZER_PIN);
        Ok(Self { pin })
    }
}

impl<P: OutputPin> AlertActuator for Buzzer<'_, P> {
    fn pulse(&mut self, duration_ms: u32) -> Result<()> {
        self.pin
            .set_high()
            .map_err(|e| KioskError::Peripheral(format!("buzzer: {e:?}")))?;
        FreeRtos::delay_ms(duration_ms);
        self.pin
            .set_low()
            .map_err(|e| KioskError::Peripheral(format!("buzzer: {e:?}")))
    }
}
