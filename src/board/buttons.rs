//! GPIO button input with async debouncing.
//!
//! Three front buttons (active-low, external pull-ups on the M5Stack board;
//! GPIO37-39 are input-only and have no internal pulls):
//!   - A - next message
//!   - B - previous message
//!   - C - send the selected message
//!
//! Each button is handled by its own task that waits for a falling edge,
//! debounces it, and queues a `ButtonEvent` for the main loop.

use defmt::info;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Timer};
use esp_hal::gpio::{Input, InputConfig, InputPin, Pull};
use m5pager::config::{BUTTON_DEBOUNCE_MS, BUTTON_QUEUE_DEPTH};
use m5pager::ui::ButtonEvent;

pub type ButtonSender = Sender<'static, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH>;

/// Configure a front button pin.
pub fn input(pin: impl InputPin + 'static) -> Input<'static> {
    Input::new(pin, InputConfig::default().with_pull(Pull::None))
}

/// Run a single button loop.
///
/// Waits for the pin to go low (pressed), debounces, queues the event,
/// then waits for release before repeating.
#[embassy_executor::task(pool_size = 3)]
pub async fn button_task(mut btn: Input<'static>, event: ButtonEvent, tx: ButtonSender) -> ! {
    loop {
        btn.wait_for_falling_edge().await;

        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Button: {}", event);
            tx.send(event).await;

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
