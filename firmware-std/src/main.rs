//! maskwatch ESP-IDF std firmware
//!
//! Single-threaded: the trigger loop runs on the main task and owns every
//! peripheral. Once the screen is up, whatever fails, at boot or later, ends
//! with the error on the screen and a restart. Errors during display
//! bring-up return from `main`.

mod buzzer;
mod display;

use std::ffi::CString;
use std::io;

use anyhow::anyhow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Delay, FreeRtos, TickType, BLOCK};
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::spi::config::Config as SpiConfig;
use esp_idf_svc::hal::spi::config::DriverConfig as SpiDriverConfig;
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver};
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, TickType_t};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, ColorOrder, Orientation, Rotation};
use mipidsi::Builder;

use maskwatch::board;
use maskwatch::config::KioskConfig;
use maskwatch::kiosk::Devices;
use maskwatch::link::TcpLink;
use maskwatch::peripherals::{DeviceControl, Display};
use maskwatch::runner::MainLoop;
use maskwatch::thermal::Mlx90614;
use maskwatch::ultrasonic::{Hcsr04, StdClock};
use maskwatch::userlog::CsvLog;
use maskwatch::vision::{Snapshot, VisionCoprocessor};

use buzzer::Buzzer;
use display::KioskScreen;

/// Deployment overlay, baked in at build time
const KIOSK_JSON: &[u8] = include_bytes!("../kiosk.json");

const SPIFFS_BASE: &str = "/spiffs";

/// A co-processor silent for this long counts as a hung camera
const VISION_TIMEOUT_MS: u64 = 2_000;

// ── Platform glue ────────────────────────────────────────────────────

/// `std::io` view of the co-processor UART. A read that times out
/// returns 0 bytes.
struct UartPort<'d> {
    uart: UartDriver<'d>,
    timeout: TickType_t,
}

impl io::Read for UartPort<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.uart.read(buf, self.timeout).map_err(io::Error::other)
    }
}

impl io::Write for UartPort<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.uart.write(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.uart.wait_tx_done(BLOCK).map_err(io::Error::other)
    }
}

struct EspRestart;

impl DeviceControl for EspRestart {
    fn reset(&mut self) -> ! {
        esp_idf_svc::hal::reset::restart()
    }
}

/// Boot-time counterpart of the link fault path.
fn halt(screen: &mut impl Display<Snapshot>, config: &KioskConfig, err: &anyhow::Error) -> ! {
    log::error!("Boot failed: {:?}", err);
    screen.show_error(&format!("ERROR: {err}"));
    FreeRtos::delay_ms(config.error_sleep_ms);
    EspRestart.reset()
}

fn or_halt<T, E: Into<anyhow::Error>>(
    result: Result<T, E>,
    screen: &mut impl Display<Snapshot>,
    config: &KioskConfig,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => halt(screen, config, &err.into()),
    }
}

fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    config: &KioskConfig,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: config
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID too long"))?,
        password: config
            .wifi_password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("Wi-Fi password too long"))?,
        auth_method: if config.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    log::info!("Wi-Fi up on {} as {}", config.wifi_ssid, ip.ip);
    Ok(wifi)
}

fn mount_spiffs() -> anyhow::Result<()> {
    let base = CString::new(SPIFFS_BASE)?;
    let conf = esp_vfs_spiffs_conf_t {
        base_path: base.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    // The VFS layer copies base_path during registration
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;
    log::info!("SPIFFS mounted at {}", SPIFFS_BASE);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!(
        "maskwatch v{} starting on {} (std)",
        env!("CARGO_PKG_VERSION"),
        board::BOARD_NAME
    );

    let config = match KioskConfig::from_json(KIOSK_JSON) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring kiosk.json ({}), using defaults", e);
            KioskConfig::new()
        }
    };

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let pins = peripherals.pins;

    // ── Display ──────────────────────────────────────────────────────

    // Manual hardware reset
    let mut rst = PinDriver::output(pins.gpio23)?;
    rst.set_low()?;
    FreeRtos::delay_ms(20);
    rst.set_high()?;
    FreeRtos::delay_ms(120);

    let spi_driver = SpiDriver::new(
        peripherals.spi2,
        pins.gpio18,
        pins.gpio19,
        None::<AnyIOPin>,
        &SpiDriverConfig::new(),
    )?;
    let spi_config = SpiConfig::new()
        .baudrate(Hertz(board::DISPLAY_SPI_FREQ_MHZ * 1_000_000))
        .data_mode(embedded_hal::spi::MODE_0);
    let spi_device = SpiDeviceDriver::new(spi_driver, Some(pins.gpio5), &spi_config)?;

    let dc = PinDriver::output(pins.gpio16)?;
    let mut buffer = [0u8; 512];
    let di = SpiInterface::new(spi_device, dc, &mut buffer);

    let mut panel_delay = Delay::new_default();
    let panel = Builder::new(ST7789, di)
        .display_size(board::DISPLAY_WIDTH, board::DISPLAY_HEIGHT)
        .display_offset(board::DISPLAY_OFFSET_X, board::DISPLAY_OFFSET_Y)
        .invert_colors(ColorInversion::Inverted)
        .color_order(ColorOrder::Rgb)
        .orientation(Orientation::new().rotate(Rotation::Deg90))
        .init(&mut panel_delay)
        .map_err(|e| anyhow!("display init failed: {:?}", e))?;

    let mut backlight = PinDriver::output(pins.gpio4)?;
    backlight.set_high()?;

    let mut screen = KioskScreen::new(panel);
    screen.splash(board::BOARD_NAME);

    // ── Network and storage ──────────────────────────────────────────

    screen.status("joining Wi-Fi...");
    let _wifi = or_halt(
        connect_wifi(peripherals.modem, sys_loop, nvs, &config),
        &mut screen,
        &config,
    );

    or_halt(mount_spiffs(), &mut screen, &config);
    let log_path = format!("{}/{}", SPIFFS_BASE, config.log_path);
    let mut user_log = or_halt(CsvLog::open(&log_path), &mut screen, &config);

    // ── Sensors and actuators ────────────────────────────────────────

    let temp_trig = or_halt(PinDriver::output(pins.gpio25), &mut screen, &config);
    let temp_echo = or_halt(PinDriver::input(pins.gpio26), &mut screen, &config);
    let mut temp_probe = Hcsr04::new(
        "temperature probe",
        temp_trig,
        temp_echo,
        Delay::new_default(),
        StdClock::new(),
    )
    .with_timeout(config.echo_timeout_us);

    let cam_trig = or_halt(PinDriver::output(pins.gpio32), &mut screen, &config);
    let cam_echo = or_halt(PinDriver::input(pins.gpio33), &mut screen, &config);
    let mut cam_probe = Hcsr04::new(
        "camera probe",
        cam_trig,
        cam_echo,
        Delay::new_default(),
        StdClock::new(),
    )
    .with_timeout(config.echo_timeout_us);

    let i2c = or_halt(
        I2cDriver::new(
            peripherals.i2c0,
            pins.gpio21,
            pins.gpio22,
            &I2cConfig::new().baudrate(Hertz(100_000)),
        ),
        &mut screen,
        &config,
    );
    let mut thermometer = Mlx90614::new(i2c, config.temp_multiplier);

    let uart = or_halt(
        UartDriver::new(
            peripherals.uart1,
            pins.gpio17,
            pins.gpio12,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart::config::Config::new().baudrate(Hertz(board::VISION_BAUD)),
        ),
        &mut screen,
        &config,
    );
    let mut camera = VisionCoprocessor::new(UartPort {
        uart,
        timeout: TickType::new_millis(VISION_TIMEOUT_MS).ticks(),
    });

    let mut alert = or_halt(Buzzer::new(pins.gpio27), &mut screen, &config);
    let mut delay = FreeRtos;
    let mut device = EspRestart;

    // ── Run ──────────────────────────────────────────────────────────

    screen.status("connecting to collector...");
    log::info!(
        "Collector {}:{}, log {}",
        config.server_host,
        config.server_port,
        log_path
    );

    let devices = Devices {
        temp_probe: &mut temp_probe,
        cam_probe: &mut cam_probe,
        thermometer: &mut thermometer,
        camera: &mut camera,
        display: &mut screen,
        alert: &mut alert,
        log: &mut user_log,
        delay: &mut delay,
    };
    let mut network = TcpLink::new(config.read_timeout());
    MainLoop::boot(&config, devices, &mut network, &mut device).run()
}
