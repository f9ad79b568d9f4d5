//! Operator screen for the T-Display (ST7789, 135x240, SPI, landscape).
//!
//! The vision co-processor keeps the pixels, so the "preview" is the latest
//! snapshot's scores drawn as bars. The error screen is what stays up for
//! the pause before a restart.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;

use maskwatch::classify::MaskClass;
use maskwatch::error::{KioskError, Result};
use maskwatch::peripherals::Display;
use maskwatch::vision::Snapshot;

// ── Display geometry ─────────────────────────────────────────────────

const W: i32 = 240;
const H: i32 = 135;
const ROW_H: i32 = 14;
const LINE_W: usize = (W / 6) as usize;
/// Bars start right of the longest label
const BAR_X: i32 = 6 * 16;
const BAR_MAX_W: i32 = W - BAR_X - 6 * 6;

// ── Color palette ────────────────────────────────────────────────────

const BG: Rgb565 = Rgb565::BLACK;
const HEADER_BG: Rgb565 = Rgb565::new(2, 4, 12);
const FG: Rgb565 = Rgb565::WHITE;
const ACCENT: Rgb565 = Rgb565::new(0, 50, 0);
const DIM: Rgb565 = Rgb565::new(12, 24, 12);
const ALARM_BG: Rgb565 = Rgb565::new(16, 0, 0);

macro_rules! row {
    ($s:expr, $color:expr, $($arg:tt)*) => {
        $s.row($color, format_args!($($arg)*))
    };
}

macro_rules! centered {
    ($s:expr, $color:expr, $($arg:tt)*) => {
        $s.centered($color, format_args!($($arg)*))
    };
}

// ── Screen renderer ──────────────────────────────────────────────────

struct Screen<'a, D> {
    display: &'a mut D,
    y: i32,
    buf: heapless::String<40>,
}

impl<'a, D: DrawTarget<Color = Rgb565>> Screen<'a, D> {
    fn new(display: &'a mut D) -> Self {
        Self {
            display,
            y: 0,
            buf: heapless::String::new(),
        }
    }

    fn clear(&mut self) -> core::result::Result<(), D::Error> {
        self.display.clear(BG)?;
        self.y = 0;
        Ok(())
    }

    fn skip(&mut self, pixels: i32) {
        self.y += pixels;
    }

    fn row(&mut self, color: Rgb565, args: core::fmt::Arguments<'_>) {
        self.buf.clear();
        let _ = core::fmt::write(&mut self.buf, args);
        self.pad();
        self.emit(color, BG, 0);
        self.y += ROW_H;
    }

    fn centered(&mut self, color: Rgb565, args: core::fmt::Arguments<'_>) {
        self.buf.clear();
        let _ = core::fmt::write(&mut self.buf, args);
        let x = (W - self.buf.len() as i32 * 6) / 2;
        self.emit(color, BG, x);
        self.y += ROW_H;
    }

    fn header(&mut self, title: &str, indicator: &str, bg: Rgb565, indicator_color: Rgb565) {
        let _ = Rectangle::new(Point::new(0, self.y), Size::new(W as u32, ROW_H as u32))
            .into_styled(PrimitiveStyle::with_fill(bg))
            .draw(self.display);
        self.buf.clear();
        let _ = self.buf.push_str(title);
        self.emit(FG, bg, 0);

        let x = W - indicator.len() as i32 * 6 - 2;
        let _ = Text::new(
            indicator,
            Point::new(x, self.y + 10),
            Self::text_style(indicator_color, bg),
        )
        .draw(self.display);
        self.y += ROW_H;
    }

    fn divider(&mut self) {
        let _ = Rectangle::new(Point::new(0, self.y), Size::new(W as u32, 1))
            .into_styled(PrimitiveStyle::with_fill(DIM))
            .draw(self.display);
        self.y += 3;
    }

    /// Label on the left, proportional bar, percentage on the right.
    fn score_bar(&mut self, label: &str, score: f32, color: Rgb565) {
        self.buf.clear();
        let _ = core::fmt::write(&mut self.buf, format_args!(" {}", label));
        self.pad();
        self.emit(color, BG, 0);

        let filled = (score.clamp(0.0, 1.0) * BAR_MAX_W as f32) as u32;
        let _ = Rectangle::new(Point::new(BAR_X, self.y + 3), Size::new(filled, 8))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(self.display);

        self.buf.clear();
        let _ = core::fmt::write(&mut self.buf, format_args!("{:5.1}%", score * 100.0));
        let x = W - self.buf.len() as i32 * 6;
        self.emit(color, BG, x);
        self.y += ROW_H;
    }

    /// Wrap `text` over as many rows as fit.
    fn paragraph(&mut self, color: Rgb565, text: &str) {
        let mut rest = text;
        while !rest.is_empty() && self.y + ROW_H <= H {
            let cut = rest
                .char_indices()
                .nth(LINE_W - 1)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            row!(self, color, " {}", &rest[..cut]);
            rest = &rest[cut..];
        }
    }

    fn pad(&mut self) {
        while self.buf.len() < LINE_W {
            let _ = self.buf.push(' ');
        }
    }

    fn emit(&mut self, fg: Rgb565, bg: Rgb565, x: i32) {
        let _ = Text::new(
            &self.buf,
            Point::new(x, self.y + 10),
            Self::text_style(fg, bg),
        )
        .draw(self.display);
    }

    fn text_style(fg: Rgb565, bg: Rgb565) -> MonoTextStyle<'static, Rgb565> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(fg)
            .background_color(bg)
            .build()
    }
}

/// Labels that fit left of the bars.
fn short_label(class: MaskClass) -> &'static str {
    match class {
        MaskClass::FaceMask => "mask",
        MaskClass::FaceMaskAndShield => "mask+shield",
        MaskClass::FaceShield => "shield",
        MaskClass::NoFace => "no face",
        MaskClass::None => "none",
    }
}

// ── Kiosk screen ─────────────────────────────────────────────────────

pub struct KioskScreen<D> {
    display: D,
}

impl<D: DrawTarget<Color = Rgb565>> KioskScreen<D> {
    pub fn new(display: D) -> Self {
        Self { display }
    }

    pub fn splash(&mut self, board: &str) {
        let mut s = Screen::new(&mut self.display);
        let _ = s.clear();
        s.skip(42);
        centered!(s, FG, "MASKWATCH");
        centered!(s, ACCENT, "v{}", env!("CARGO_PKG_VERSION"));
        s.skip(12);
        centered!(s, DIM, "{}", board);
    }

    /// Status line while booting (Wi-Fi, collector).
    pub fn status(&mut self, message: &str) {
        let mut s = Screen::new(&mut self.display);
        s.y = H - ROW_H;
        row!(s, DIM, " {}", message);
    }
}

impl<D> Display<Snapshot> for KioskScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    fn show(&mut self, image: &Snapshot) -> Result<()> {
        let mut s = Screen::new(&mut self.display);
        s.clear()
            .map_err(|e| KioskError::Peripheral(format!("display: {e:?}")))?;
        s.header(" MASKWATCH", "[LIVE]", HEADER_BG, Rgb565::GREEN);
        row!(s, DIM, " frame #{}", image.seq);
        s.divider();

        let best = image
            .scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
            .map(|(i, _)| i);
        for (i, class) in MaskClass::ALL.iter().enumerate() {
            let score = image.scores.get(i).copied().unwrap_or(0.0);
            let color = if Some(i) == best { Rgb565::GREEN } else { DIM };
            s.score_bar(short_label(*class), score, color);
        }
        Ok(())
    }

    fn show_error(&mut self, message: &str) {
        let mut s = Screen::new(&mut self.display);
        let _ = s.clear();
        s.header(" MASKWATCH", "[FAULT]", ALARM_BG, Rgb565::RED);
        s.skip(4);
        s.paragraph(Rgb565::RED, message);
        s.skip(4);
        row!(s, FG, " resetting...");
    }
}
