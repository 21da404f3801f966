//! Broker link bookkeeping.
//!
//! Tracks what a request/answer protocol session owes the broker (keep-alive
//! pings) and what the broker owes us (SUBACK, PINGRESP). The session task
//! feeds it every packet it sends and every packet it reads; nothing here
//! touches the network. Times are milliseconds on any monotonic clock.

/// A packet read from the broker, reduced to what the watch cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
    Message { topic: &'a str, payload: &'a [u8] },
    PingResponse,
    SubscribeAck(u16),
    Disconnect,
    /// Anything else (PUBACK, UNSUBACK, ...); ignored.
    Other,
}

/// What to do with an [`Inbound`] packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict<'a> {
    /// Hand the message to the subscriber.
    Deliver { topic: &'a str, payload: &'a [u8] },
    /// The pending subscribe was acknowledged; answer the caller.
    Acked,
    Idle,
    Lost,
}

/// What the session owes the broker right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Due {
    Nothing,
    Ping,
    /// An answer never came; the link is dead.
    Lost,
}

#[derive(Debug)]
pub struct LinkWatch {
    ping_period_ms: u64,
    answer_timeout_ms: u64,
    last_sent: u64,
    ping_sent: Option<u64>,
    pending_ack: Option<(u16, u64)>,
}

impl LinkWatch {
    /// Start watching a link whose CONNECT went out at `now`.
    pub const fn new(ping_period_ms: u64, answer_timeout_ms: u64, now: u64) -> Self {
        Self {
            ping_period_ms,
            answer_timeout_ms,
            last_sent: now,
            ping_sent: None,
            pending_ack: None,
        }
    }

    /// Any packet went to the broker.
    pub fn sent(&mut self, now: u64) {
        self.last_sent = now;
    }

    pub fn ping_sent(&mut self, now: u64) {
        self.last_sent = now;
        self.ping_sent = Some(now);
    }

    /// A SUBSCRIBE with packet id `id` went out and waits for its SUBACK.
    pub fn subscribe_sent(&mut self, id: u16, now: u64) {
        self.last_sent = now;
        self.pending_ack = Some((id, now));
    }

    /// Whether a caller is still waiting on a SUBACK.
    pub fn awaiting_ack(&self) -> bool {
        self.pending_ack.is_some()
    }

    pub fn on_inbound<'a>(&mut self, packet: Inbound<'a>) -> Verdict<'a> {
        match packet {
            Inbound::Message { topic, payload } => Verdict::Deliver { topic, payload },
            Inbound::PingResponse => {
                self.ping_sent = None;
                Verdict::Idle
            }
            Inbound::SubscribeAck(id) => match self.pending_ack {
                Some((pending, _)) if pending == id => {
                    self.pending_ack = None;
                    Verdict::Acked
                }
                _ => Verdict::Idle,
            },
            Inbound::Disconnect => Verdict::Lost,
            Inbound::Other => Verdict::Idle,
        }
    }

    /// Keep-alive counts what we send, not what we receive.
    pub fn due(&self, now: u64) -> Due {
        let overdue = |since: u64| now.saturating_sub(since) >= self.answer_timeout_ms;
        if self.pending_ack.is_some_and(|(_, since)| overdue(since)) {
            return Due::Lost;
        }
        match self.ping_sent {
            Some(since) if overdue(since) => Due::Lost,
            Some(_) => Due::Nothing,
            None if now.saturating_sub(self.last_sent) >= self.ping_period_ms => Due::Ping,
            None => Due::Nothing,
        }
    }
}
