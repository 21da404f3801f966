//! Inbound message queue.
//!
//! The backend delivers samples from its own task. [`Inbox`] is the
//! [`SampleHandler`] it calls: it decodes the payload and queues it without
//! blocking. The main loop drains the queue once per tick and is the only
//! code that draws received messages.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

use crate::backend::SampleHandler;
use crate::config::{INBOX_DEPTH, PAYLOAD_MAX_LEN};
use crate::text::decode_lossy;

/// One decoded inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received {
    text: String<PAYLOAD_MAX_LEN>,
}

impl Received {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            text: decode_lossy(payload),
        }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }
}

/// Bounded queue between the backend task and the main loop.
pub struct Inbox {
    queue: Channel<CriticalSectionRawMutex, Received, INBOX_DEPTH>,
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Next queued message, if any.
    pub fn try_take(&self) -> Option<Received> {
        self.queue.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleHandler for Inbox {
    fn on_sample(&self, topic: &str, payload: &[u8]) {
        let received = Received::new(payload);
        info!("[sub] {=str}: {=str}", topic, received.as_str());

        if self.queue.try_send(received).is_err() {
            warn!("inbox full, dropping message on {=str}", topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order() {
        let inbox = Inbox::new();
        inbox.on_sample("key/expression", b"first");
        inbox.on_sample("key/expression", b"second");
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.try_take().unwrap().as_str(), "first");
        assert_eq!(inbox.try_take().unwrap().as_str(), "second");
        assert!(inbox.try_take().is_none());
    }

    #[test]
    fn overflow_drops_newest() {
        let inbox = Inbox::new();
        for i in 0..INBOX_DEPTH + 2 {
            let payload = [b'0' + i as u8];
            inbox.on_sample("t", &payload);
        }
        assert_eq!(inbox.len(), INBOX_DEPTH);
        for i in 0..INBOX_DEPTH {
            let expected = [b'0' + i as u8];
            assert_eq!(inbox.try_take().unwrap().as_str().as_bytes(), &expected);
        }
        assert!(inbox.is_empty());
    }

    #[test]
    fn oversized_payload_is_truncated() {
        let inbox = Inbox::new();
        let payload = [b'x'; PAYLOAD_MAX_LEN + 10];
        inbox.on_sample("t", &payload);
        assert_eq!(inbox.try_take().unwrap().as_str().len(), PAYLOAD_MAX_LEN);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let inbox = Inbox::new();
        inbox.on_sample("t", b"Dinner \xc3 ready");
        assert_eq!(inbox.try_take().unwrap().as_str(), "Dinner \u{FFFD} ready");
    }
}
