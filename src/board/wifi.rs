//! WiFi station bring-up and link supervision.

use defmt::{debug, info, warn};
use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{
    ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent, WifiStaState,
};
use static_cell::StaticCell;

use m5pager::config::WIFI_POLL_MS;

/// Back-off after a failed association or a dropped link (ms).
const RECONNECT_DELAY_MS: u64 = 5000;

/// Socket slots: MQTT TCP, DHCP and DNS.
const SOCKET_COUNT: usize = 4;

/// Start the radio and the network stack.
///
/// Spawns the embassy-net runner and the link supervisor, and returns the
/// stack immediately; use [`wait_for_ip`] to block until it is usable.
pub fn start(spawner: Spawner, wifi: WIFI<'static>, ssid: &str, password: &str) -> Stack<'static> {
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().expect("radio init"));

    let (controller, interfaces) =
        esp_radio::wifi::new(radio, wifi, Default::default()).expect("wifi init");

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );

    let mode = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into()),
    );

    spawner.spawn(net_task(runner)).expect("spawn net_task");
    spawner.spawn(connection(controller, mode)).expect("spawn connection");
    stack
}

/// Wait until the station has an IPv4 address.
pub async fn wait_for_ip(stack: Stack<'static>) {
    loop {
        if let Some(config) = stack.config_v4() {
            info!("Got IP: {}", config.address);
            return;
        }
        Timer::after(Duration::from_millis(WIFI_POLL_MS)).await;
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// Keep the station associated, reconnecting after every drop.
#[embassy_executor::task]
async fn connection(mut controller: WifiController<'static>, mode: ModeConfig) {
    debug!("start connection task");
    loop {
        if let WifiStaState::Connected = esp_radio::wifi::sta_state() {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            warn!("WiFi link lost");
            Timer::after(Duration::from_millis(RECONNECT_DELAY_MS)).await;
        }
        if !matches!(controller.is_started(), Ok(true)) {
            if controller.set_config(&mode).is_err() {
                warn!("WiFi config rejected");
                return;
            }
            debug!("Starting wifi");
            if controller.start_async().await.is_err() {
                warn!("WiFi start failed");
                Timer::after(Duration::from_millis(RECONNECT_DELAY_MS)).await;
                continue;
            }
        }

        match controller.connect_async().await {
            Ok(()) => info!("WiFi connected"),
            Err(e) => {
                warn!("Failed to connect to WiFi: {}", defmt::Debug2Format(&e));
                Timer::after(Duration::from_millis(RECONNECT_DELAY_MS)).await;
            }
        }
    }
}
