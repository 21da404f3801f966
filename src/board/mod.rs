//! M5Stack Core hardware glue.
//!
//! This module wires the ESP32 peripherals into the library seams:
//!
//! 1. **Display** - ILI9342C 320×240 LCD over SPI, implements `ui::Screen`.
//! 2. **Speaker** - LEDC square wave on GPIO25, driven by a tone task.
//! 3. **Buttons** - A / B / C with async debouncing, queued as `ButtonEvent`s.
//! 4. **WiFi** - station link supervisor and the embassy-net runner.
//! 5. **MQTT** - the pub/sub backend, a session task plus the `Backend`
//!    implementation the connection controller drives.
//!
//! Communication between tasks is done via Embassy channels and signals
//! declared here.

pub mod buttons;
pub mod display;
pub mod mqtt;
pub mod speaker;
pub mod wifi;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use m5pager::config::BUTTON_QUEUE_DEPTH;
use m5pager::ui::{ButtonEdges, ButtonEvent};

/// Debounced presses from the button tasks, drained once per tick.
pub static BUTTONS: Channel<CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH> =
    Channel::new();

/// Raised by the screen to request one beep.
pub static BEEP: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Collect every press queued since the previous call.
pub fn take_button_edges() -> ButtonEdges {
    let mut edges = ButtonEdges::NONE;
    while let Ok(event) = BUTTONS.try_receive() {
        edges.record(event);
    }
    edges
}
