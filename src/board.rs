/// Hardware abstraction for supported boards.
///
/// Each board module defines pin assignments and capabilities
/// selected at compile time via feature flags.

#[cfg(feature = "board-tdisplay")]
mod hw {
    // ST7789 on the board's own SPI pins
    pub const DISPLAY_MOSI_PIN: u8 = 19;
    pub const DISPLAY_SCLK_PIN: u8 = 18;
    pub const DISPLAY_CS_PIN: u8 = 5;
    pub const DISPLAY_DC_PIN: u8 = 16;
    pub const DISPLAY_RST_PIN: u8 = 23;
    pub const DISPLAY_BL_PIN: u8 = 4;
    pub const DISPLAY_WIDTH: u16 = 135;
    pub const DISPLAY_HEIGHT: u16 = 240;
    /// ST7789 RAM offset for the 135-wide panel
    pub const DISPLAY_OFFSET_X: u16 = 52;
    pub const DISPLAY_OFFSET_Y: u16 = 40;
    pub const DISPLAY_SPI_FREQ_MHZ: u32 = 40;

    // MLX90614
    pub const I2C_SDA_PIN: u8 = 21;
    pub const I2C_SCL_PIN: u8 = 22;

    // HC-SR04 pair; echo lines go through a 5V -> 3V3 divider
    pub const TEMP_TRIG_PIN: u8 = 25;
    pub const TEMP_ECHO_PIN: u8 = 26;
    pub const CAM_TRIG_PIN: u8 = 32;
    pub const CAM_ECHO_PIN: u8 = 33;

    pub const BUZZER_PIN: u8 = 27;

    // Vision co-processor on UART1
    pub const VISION_TX_PIN: u8 = 17;
    pub const VISION_RX_PIN: u8 = 12;
    pub const VISION_BAUD: u32 = 115_200;

    pub const HAS_DISPLAY: bool = true;
    pub const HAS_BUZZER: bool = true;
    pub const BOARD_NAME: &str = "lilygo_t_display";
}

#[cfg(not(feature = "board-tdisplay"))]
mod hw {
    pub const HAS_DISPLAY: bool = false;
    pub const HAS_BUZZER: bool = false;
    pub const BOARD_NAME: &str = "host";
}

pub use hw::*;
