//! Speaker beeps via LEDC PWM on GPIO25.

use defmt::{debug, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use esp_hal::gpio::DriveMode;
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{Ledc, LowSpeed};
use esp_hal::peripherals::GPIO25;
use esp_hal::time::Rate;
use m5pager::config::{TONE_DURATION_MS, TONE_FREQUENCY_HZ};

/// Beep volume as PWM duty.
const TONE_DUTY_PCT: u8 = 10;

/// Play one `TONE_FREQUENCY_HZ` beep of `TONE_DURATION_MS` per signal.
///
/// Requests arriving while a beep plays collapse into one follow-up beep.
#[embassy_executor::task]
pub async fn tone_task(
    ledc: Ledc<'static>,
    mut pin: GPIO25<'static>,
    beep: &'static Signal<CriticalSectionRawMutex, ()>,
) -> ! {
    let mut lstimer = ledc.timer::<LowSpeed>(timer::Number::Timer1);
    if lstimer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty13Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(TONE_FREQUENCY_HZ),
        })
        .is_err()
    {
        warn!("speaker timer rejected {=u32} Hz, beeps disabled", TONE_FREQUENCY_HZ);
    }

    loop {
        beep.wait().await;
        debug!("beep");

        let mut channel = ledc.channel(channel::Number::Channel1, pin.reborrow());
        if channel
            .configure(channel::config::Config {
                timer: &lstimer,
                duty_pct: TONE_DUTY_PCT,
                drive_mode: DriveMode::PushPull,
            })
            .is_err()
        {
            warn!("speaker channel setup failed");
            continue;
        }
        Timer::after(Duration::from_millis(TONE_DURATION_MS)).await;
        let _ = channel.set_duty(0);
    }
}
