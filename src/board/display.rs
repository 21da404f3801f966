//! ILI9342C LCD (M5Stack Core) wrapper.
//!
//! The screen has two regions: a message area filling the top and a
//! single status line pinned to the bottom 30 pixels. Every `show` clears
//! the message area, draws the new text and redraws the status line.

use defmt::info;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::peripherals::{GPIO14, GPIO18, GPIO23, GPIO27, GPIO32, GPIO33, SPI2};
use esp_hal::spi::master::{Config, Spi};
use esp_hal::spi::Mode;
use esp_hal::time::Rate;
use esp_hal::Blocking;
use heapless::String;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9342CRgb565;
use mipidsi::options::{ColorInversion, ColorOrder};
use mipidsi::Builder;
use static_cell::StaticCell;
use u8g2_fonts::types::{FontColor, VerticalPosition};
use u8g2_fonts::{fonts, FontRenderer};

use m5pager::config::{LCD_SPI_MHZ, STATUS_LINE_MAX_LEN};
use m5pager::text::{push_truncated, wrap};
use m5pager::ui::Screen;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const STATUS_HEIGHT: u32 = 30;
/// Unifont: narrow glyphs are 8 px wide, CJK glyphs take two cells.
const CELL_WIDTH: u32 = 8;
const LINE_HEIGHT: i32 = 20;
const COLUMNS: usize = (WIDTH / CELL_WIDTH) as usize;

/// Latin plus kana and the common kanji; unknown glyphs are skipped.
const FONT: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_unifont_t_japanese3>().with_ignore_unknown_chars(true);

type LcdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;

/// Concrete display driver.
pub type Lcd =
    mipidsi::Display<SpiInterface<'static, LcdSpi, Output<'static>>, ILI9342CRgb565, Output<'static>>;

/// LCD pins on the M5Stack Core.
pub struct LcdPins {
    pub sck: GPIO18<'static>,
    pub mosi: GPIO23<'static>,
    pub cs: GPIO14<'static>,
    pub dc: GPIO27<'static>,
    pub rst: GPIO33<'static>,
    pub backlight: GPIO32<'static>,
}

/// Bring up the panel, clear it and switch the backlight on.
///
/// Panics if the SPI bus or the panel fails to initialise.
pub fn init(spi: SPI2<'static>, pins: LcdPins) -> Lcd {
    let spi = Spi::new(
        spi,
        Config::default()
            .with_frequency(Rate::from_mhz(LCD_SPI_MHZ))
            .with_mode(Mode::_0),
    )
    .expect("LCD SPI config")
    .with_sck(pins.sck)
    .with_mosi(pins.mosi);

    let cs = Output::new(pins.cs, Level::High, OutputConfig::default());
    let dc = Output::new(pins.dc, Level::Low, OutputConfig::default());
    let rst = Output::new(pins.rst, Level::High, OutputConfig::default());
    let device = ExclusiveDevice::new_no_delay(spi, cs).expect("LCD chip select");

    static BUFFER: StaticCell<[u8; 512]> = StaticCell::new();
    let interface = SpiInterface::new(device, dc, BUFFER.init([0; 512]));

    let mut lcd = Builder::new(ILI9342CRgb565, interface)
        .reset_pin(rst)
        .color_order(ColorOrder::Bgr)
        .invert_colors(ColorInversion::Inverted)
        .init(&mut Delay::new())
        .expect("LCD init");
    let _ = lcd.clear(Rgb565::BLACK);

    // Backlight stays on for the life of the program.
    core::mem::forget(Output::new(pins.backlight, Level::High, OutputConfig::default()));

    lcd
}

fn draw_line(lcd: &mut Lcd, line: &str, y: i32) {
    let _ = FONT.render(
        line,
        Point::new(0, y),
        VerticalPosition::Top,
        FontColor::Transparent(Rgb565::WHITE),
        lcd,
    );
}

/// [`Screen`] on the M5Stack LCD and speaker.
pub struct M5Screen {
    lcd: Lcd,
    status: String<STATUS_LINE_MAX_LEN>,
    beep: &'static Signal<CriticalSectionRawMutex, ()>,
}

impl M5Screen {
    pub fn new(lcd: Lcd, beep: &'static Signal<CriticalSectionRawMutex, ()>) -> Self {
        Self {
            lcd,
            status: String::new(),
            beep,
        }
    }

    fn fill(&mut self, area: Rectangle) {
        let _ = area
            .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
            .draw(&mut self.lcd);
    }

    fn draw_status(&mut self) {
        let top = (HEIGHT - STATUS_HEIGHT) as i32;
        self.fill(Rectangle::new(Point::new(0, top), Size::new(WIDTH, STATUS_HEIGHT)));
        if let Some(line) = wrap(&self.status, COLUMNS).next() {
            draw_line(&mut self.lcd, line, top + 7);
        }
    }
}

impl Screen for M5Screen {
    fn show(&mut self, text: &str, play_tone: bool) {
        info!("{=str}", text);

        let message_height = HEIGHT - STATUS_HEIGHT;
        self.fill(Rectangle::new(Point::zero(), Size::new(WIDTH, message_height)));

        let max_lines = (message_height as i32 / LINE_HEIGHT) as usize;
        for (row, line) in wrap(text, COLUMNS).take(max_lines).enumerate() {
            draw_line(&mut self.lcd, line, row as i32 * LINE_HEIGHT);
        }

        if play_tone {
            self.beep.signal(());
        }

        self.draw_status();
    }

    fn show_status_line(&mut self, text: &str) {
        self.status.clear();
        let _ = push_truncated(&mut self.status, text);
        self.draw_status();
    }
}
