//! Pub/sub backend seam.
//!
//! The connection controller only talks to these traits. The firmware
//! implements them over MQTT in `board::mqtt`; tests use in-memory stubs.
//!
//! Handles are plain owned values: dropping a [`Session`] closes it, and
//! dropping a publisher or subscriber undeclares it.

use core::fmt::Debug;

use crate::config::SessionConfig;

/// Payload encoding attached to a put.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Encoding {
    TextPlain,
}

impl Encoding {
    /// MIME-style name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Encoding::TextPlain => "text/plain",
        }
    }
}

/// Receives samples for a declared subscriber.
///
/// Called from the backend's own task, never from the main loop, so
/// implementations must not block and must be safe to share.
pub trait SampleHandler: Sync {
    fn on_sample(&self, topic: &str, payload: &[u8]);
}

/// Opens sessions.
#[allow(async_fn_in_trait)]
pub trait Backend {
    type Error: Debug;
    type Session: Session<Error = Self::Error>;

    async fn open(&mut self, config: &SessionConfig<'_>) -> Result<Self::Session, Self::Error>;
}

/// A live session with the backend.
#[allow(async_fn_in_trait)]
pub trait Session {
    type Error: Debug;
    type Publisher: Publisher<Error = Self::Error>;
    type Subscriber;

    /// Start the read and keep-alive work. Returns immediately.
    fn start_background_tasks(&mut self);

    async fn declare_publisher(&mut self, topic: &str) -> Result<Self::Publisher, Self::Error>;

    async fn declare_subscriber(
        &mut self,
        topic: &str,
        handler: &'static dyn SampleHandler,
    ) -> Result<Self::Subscriber, Self::Error>;

    /// `false` once the background work has seen the session die.
    fn is_alive(&self) -> bool {
        true
    }
}

/// A publisher bound to one topic.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    type Error: Debug;

    async fn put(&mut self, payload: &[u8], encoding: Encoding) -> Result<(), Self::Error>;
}
