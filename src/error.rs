//! Unified error types for m5pager.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging, and `Display` for host-side diagnostics.

use core::fmt;

/// Failures reported by the connection controller.
///
/// None of these are fatal: the main loop reports them on the screen and
/// keeps ticking. The first three leave the controller disconnected so the
/// next tick retries from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The backend could not open a session.
    SessionOpen,

    /// The session opened but the publisher could not be declared.
    PublisherDeclare,

    /// The session opened but the subscriber could not be declared.
    SubscriberDeclare,

    /// A put on the publisher failed, or there was no publisher to put on.
    Publish,
}

impl Error {
    /// Text shown on the device when this error is reported.
    pub const fn message(&self) -> &'static str {
        match self {
            Error::SessionOpen => "Failed to reconnect session",
            Error::PublisherDeclare => "Unable to declare publisher for key expression!",
            Error::SubscriberDeclare => "Unable to declare subscriber.",
            Error::Publish => "Error while publishing data",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Startup configuration that could not be understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Session mode was neither `client` nor `peer`.
    UnknownMode,

    /// Locator protocol prefix is not one we know (`tcp`, `udp`).
    UnknownProtocol,

    /// Locator is missing its `/` separator, host or port.
    MalformedLocator,

    /// Locator port is not a valid `u16`.
    InvalidPort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::UnknownMode => "unknown session mode",
            ConfigError::UnknownProtocol => "unknown locator protocol",
            ConfigError::MalformedLocator => "malformed locator",
            ConfigError::InvalidPort => "invalid locator port",
        };
        f.write_str(msg)
    }
}
