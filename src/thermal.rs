/// MLX90614 contactless infrared thermometer over SMBus.
use embedded_hal::i2c::I2c;

use crate::error::{KioskError, Result};
use crate::peripherals::ThermalProbe;

/// Factory default SMBus address.
pub const DEFAULT_ADDRESS: u8 = 0x5A;

/// RAM register holding the object temperature (Tobj1).
pub const REG_OBJECT_TEMP: u8 = 0x07;

/// Kelvin per raw count.
const RESOLUTION: f32 = 0.02;
const KELVIN_OFFSET: f32 = 273.15;

/// Set by the sensor when the reading is invalid.
const ERROR_FLAG: u16 = 0x8000;

pub fn raw_to_celsius(raw: u16) -> f32 {
    f32::from(raw) * RESOLUTION - KELVIN_OFFSET
}

pub struct Mlx90614<I2C> {
    i2c: I2C,
    address: u8,
    multiplier: f32,
}

impl<I2C: I2c> Mlx90614<I2C> {
    pub fn new(i2c: I2C, multiplier: f32) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            multiplier,
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Raw register word. The trailing PEC byte is read but not checked.
    pub fn read_raw(&mut self) -> Result<u16> {
        let mut buf = [0u8; 3];
        self.i2c
            .write_read(self.address, &[REG_OBJECT_TEMP], &mut buf)
            .map_err(|e| KioskError::peripheral("thermometer", e))?;
        let raw = u16::from_le_bytes([buf[0], buf[1]]);
        if raw & ERROR_FLAG != 0 {
            return Err(KioskError::Peripheral(format!(
                "thermometer: error flag set (0x{raw:04x})"
            )));
        }
        Ok(raw)
    }
}

impl<I2C: I2c> ThermalProbe for Mlx90614<I2C> {
    fn read_celsius(&mut self) -> Result<f32> {
        let celsius = raw_to_celsius(self.read_raw()?) * self.multiplier;
        log::debug!("Object temperature {:.2} C", celsius);
        Ok(celsius)
    }
}
