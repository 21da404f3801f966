//! Application-wide constants and compile-time configuration.
//!
//! All pin assignments, timing parameters, and session settings live here
//! so they can be tuned in one place. WiFi credentials are the exception:
//! they come from the `WIFI_SSID` / `WIFI_PASS` environment variables at
//! build time so they never end up in the repository.

use crate::error::ConfigError;
use crate::locator::Locator;

// Session

/// Topic (key expression) used for both the publisher and the subscriber.
pub const TOPIC: &str = "key/expression";

/// Backend operating mode, `"client"` or `"peer"`.
pub const SESSION_MODE: &str = "client";

/// Where to connect. Empty means "scout for a router".
///
/// Peer mode would typically use `udp/224.0.0.225:7447#iface=en0`. A
/// `#clientid=<id>` suffix overrides [`CLIENT_ID`] for this device.
pub const CONNECT_LOCATOR: &str = "tcp/192.168.1.27:7447";

/// Client identifier presented to the backend unless the locator names one.
pub const CLIENT_ID: &str = "m5pager";

/// Keep-alive (lease) interval requested from the backend (seconds).
pub const SESSION_KEEP_ALIVE_SECS: u16 = 10;

/// Publish failure handling; see [`PublishFailurePolicy`].
pub const PUBLISH_FAILURE_POLICY: PublishFailurePolicy = PublishFailurePolicy::KeepSession;

// Main loop

/// Main loop period (ms). Doubles as reconnect interval and input spacing.
pub const TICK_PERIOD_MS: u64 = 100;

/// How long the boot banner stays up before networking starts (ms).
pub const SPLASH_HOLD_MS: u64 = 8000;

/// WiFi association poll interval during startup (ms).
pub const WIFI_POLL_MS: u64 = 1000;

// Messages

/// Canned messages cycled with the Next / Previous buttons.
///
/// Japanese, matching the other pagers on the topic; the LCD font carries
/// the glyphs.
pub const DEFAULT_MESSAGES: [&str; 3] = [
    "ちょっと来て",
    "ご飯の時間だよ",
    "おはよう！早く起きて！！",
];

/// Largest payload we publish or render (bytes).
pub const PAYLOAD_MAX_LEN: usize = 256;

/// Capacity of the "message: ..." status line (bytes).
pub const STATUS_LINE_MAX_LEN: usize = 96;

/// Capacity of single progress lines such as "Declaring publisher for ..." (bytes).
pub const PROGRESS_LINE_MAX_LEN: usize = 96;

/// Received messages buffered between two main-loop ticks.
pub const INBOX_DEPTH: usize = 4;

// Audio

/// Beep frequency (Hz).
pub const TONE_FREQUENCY_HZ: u32 = 1000;

/// Beep length (ms).
pub const TONE_DURATION_MS: u64 = 200;

// GPIO pin assignments (M5Stack Core / Basic)
//
// Logical names; the `esp_hal::peripherals::GPIOxx` types are selected
// in `main.rs`.
//
//   Button A (Next)      → GPIO39
//   Button B (Previous)  → GPIO38
//   Button C (Send)      → GPIO37
//   Speaker              → GPIO25
//   LCD SCK / MOSI       → GPIO18 / GPIO23
//   LCD CS / DC / RST    → GPIO14 / GPIO27 / GPIO33
//   LCD backlight        → GPIO32

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

/// Button events buffered between two main-loop ticks.
pub const BUTTON_QUEUE_DEPTH: usize = 8;

/// LCD SPI clock (MHz).
pub const LCD_SPI_MHZ: u32 = 40;

/// Backend mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionMode {
    /// Connect to a router / broker.
    Client,
    /// Talk directly to other peers.
    Peer,
}

impl SessionMode {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "client" => Ok(SessionMode::Client),
            "peer" => Ok(SessionMode::Peer),
            _ => Err(ConfigError::UnknownMode),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Client => "client",
            SessionMode::Peer => "peer",
        }
    }
}

/// What to do with the session after a failed publish.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishFailurePolicy {
    /// Report the failure and keep the current session.
    #[default]
    KeepSession,
    /// Report the failure and drop the session so the next tick reconnects.
    Reconnect,
}

/// Resolved inputs to `Backend::open`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig<'a> {
    pub mode: SessionMode,
    /// `None` means scouting.
    pub connect: Option<Locator<'a>>,
}

impl<'a> SessionConfig<'a> {
    /// Build from the raw mode and locator strings.
    pub fn from_parts(mode: &str, connect: &'a str) -> Result<Self, ConfigError> {
        let mode = SessionMode::parse(mode)?;
        let connect = if connect.is_empty() {
            None
        } else {
            Some(Locator::parse(connect)?)
        };
        Ok(Self { mode, connect })
    }

    /// The compiled-in configuration.
    pub fn from_build() -> Result<SessionConfig<'static>, ConfigError> {
        SessionConfig::from_parts(SESSION_MODE, CONNECT_LOCATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Protocol;

    #[test]
    fn build_config_is_valid() {
        let cfg = SessionConfig::from_build().unwrap();
        assert_eq!(cfg.mode, SessionMode::Client);
        let loc = cfg.connect.unwrap();
        assert_eq!(loc.protocol, Protocol::Tcp);
        assert_eq!(loc.port, 7447);
    }

    #[test]
    fn empty_locator_means_scouting() {
        let cfg = SessionConfig::from_parts("peer", "").unwrap();
        assert_eq!(cfg.mode, SessionMode::Peer);
        assert!(cfg.connect.is_none());
    }

    #[test]
    fn locator_metadata_names_client_id() {
        let cfg =
            SessionConfig::from_parts("client", "tcp/broker.local:1883#clientid=kitchen").unwrap();
        let loc = cfg.connect.unwrap();
        assert_eq!(loc.metadata_value("clientid"), Some("kitchen"));
        assert_eq!(loc.host, "broker.local");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert_eq!(
            SessionConfig::from_parts("router", "tcp/1.2.3.4:7447"),
            Err(ConfigError::UnknownMode)
        );
    }

    #[test]
    fn mode_round_trips_through_str() {
        for mode in [SessionMode::Client, SessionMode::Peer] {
            assert_eq!(SessionMode::parse(mode.as_str()), Ok(mode));
        }
    }

    #[test]
    fn default_messages_fit_payload() {
        assert!(!DEFAULT_MESSAGES.is_empty());
        for msg in DEFAULT_MESSAGES {
            assert!(msg.len() <= PAYLOAD_MAX_LEN);
            assert!("message: ".len() + msg.len() <= STATUS_LINE_MAX_LEN);
        }
    }
}
