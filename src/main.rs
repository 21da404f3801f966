//! m5pager firmware for the M5Stack Core (ESP32).
//!
//! Buttons A / B cycle through the canned messages, C publishes the
//! selected one. Everything published on the topic (our own messages
//! included) is shown on the LCD with a beep.
//!
//! Build with `WIFI_SSID=... WIFI_PASS=... cargo run --release --features embedded`.

#![no_std]
#![no_main]

extern crate alloc;

mod board;

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker, Timer};
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::ledc::{LSGlobalClkSource, Ledc};
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;

use m5pager::catalog::{MessageCatalog, MessageCycle};
use m5pager::config::{
    SessionConfig, DEFAULT_MESSAGES, PUBLISH_FAILURE_POLICY, SPLASH_HOLD_MS, TICK_PERIOD_MS, TOPIC,
};
use m5pager::inbox::Inbox;
use m5pager::ui::{ButtonEvent, Screen};
use m5pager::{App, ConnectionController};

use board::display::{LcdPins, M5Screen};
use board::mqtt::MqttBackend;
use board::{buttons, display, mqtt, speaker, wifi, BEEP, BUTTONS};

esp_bootloader_esp_idf::esp_app_desc!();

const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};
const WIFI_PASS: &str = match option_env!("WIFI_PASS") {
    Some(pass) => pass,
    None => "",
};

/// Messages received since the last tick; the subscriber's sample handler.
static INBOX: Inbox = Inbox::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    info!("m5pager v{=str}", env!("CARGO_PKG_VERSION"));

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // ── Speaker ─────────────────────────────────────────────────────────
    let mut ledc = Ledc::new(peripherals.LEDC);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
    spawner
        .spawn(speaker::tone_task(ledc, peripherals.GPIO25, &BEEP))
        .expect("spawn tone_task");

    // ── Display ─────────────────────────────────────────────────────────
    let lcd = display::init(
        peripherals.SPI2,
        LcdPins {
            sck: peripherals.GPIO18,
            mosi: peripherals.GPIO23,
            cs: peripherals.GPIO14,
            dc: peripherals.GPIO27,
            rst: peripherals.GPIO33,
            backlight: peripherals.GPIO32,
        },
    );
    let mut screen = M5Screen::new(lcd, &BEEP);

    // ── Buttons ─────────────────────────────────────────────────────────
    let front = [
        (buttons::input(peripherals.GPIO39), ButtonEvent::Next),
        (buttons::input(peripherals.GPIO38), ButtonEvent::Prev),
        (buttons::input(peripherals.GPIO37), ButtonEvent::Send),
    ];
    for (pin, event) in front {
        spawner
            .spawn(buttons::button_task(pin, event, BUTTONS.sender()))
            .expect("spawn button_task");
    }

    screen.show("Initialization OK", false);
    Timer::after(Duration::from_millis(SPLASH_HOLD_MS)).await;

    screen.show("Session setup start...", false);

    // ── WiFi ────────────────────────────────────────────────────────────
    screen.show("Connecting to WiFi...", false);
    if WIFI_SSID.is_empty() {
        error!("WIFI_SSID was not set at build time");
    }
    let stack = wifi::start(spawner, peripherals.WIFI, WIFI_SSID, WIFI_PASS);
    wifi::wait_for_ip(stack).await;
    screen.show("OK", false);

    // ── Session ─────────────────────────────────────────────────────────
    spawner
        .spawn(mqtt::session_task(stack))
        .expect("spawn session_task");

    let config = match SessionConfig::from_build() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid session config: {}", e);
            screen.show("Invalid session config", true);
            return;
        }
    };
    let catalog = match MessageCatalog::new(&DEFAULT_MESSAGES) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let controller = ConnectionController::new(MqttBackend::new(), config, TOPIC, &INBOX)
        .with_policy(PUBLISH_FAILURE_POLICY);
    let mut app = App::new(controller, MessageCycle::new(catalog), screen, &INBOX);

    // A failed first attempt is retried by the first tick.
    let _ = app.start().await;
    app.screen_mut().show("Session setup finished!", false);

    // ── Main loop ───────────────────────────────────────────────────────
    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    loop {
        app.tick(board::take_button_edges()).await;
        ticker.next().await;
    }
}
