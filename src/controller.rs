//! Connection controller.
//!
//! Owns the backend session and the publisher / subscriber declared on it,
//! and the [`LinkState`] that says whether they are usable. A reconnect is
//! always a full cycle: drop everything, open, declare publisher, declare
//! subscriber. Only when all three succeed is the link `Connected`.
//!
//! Every step is reported on the [`Screen`] as it happens, which is what the
//! device shows while it is (re)connecting.

use heapless::String;

use crate::backend::{Backend, Encoding, Publisher, SampleHandler, Session};
use crate::config::{PublishFailurePolicy, SessionConfig, PAYLOAD_MAX_LEN, PROGRESS_LINE_MAX_LEN};
use crate::error::Error;
use crate::text::push_truncated;
use crate::ui::Screen;

/// Where the controller is in its connect cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Handles of a fully established link.
///
/// Field order is drop order: entities go before the session they live on.
struct Link<S: Session> {
    publisher: S::Publisher,
    _subscriber: S::Subscriber,
    session: S,
}

pub struct ConnectionController<'a, B: Backend> {
    backend: B,
    config: SessionConfig<'a>,
    topic: &'a str,
    handler: &'static dyn SampleHandler,
    policy: PublishFailurePolicy,
    state: LinkState,
    link: Option<Link<B::Session>>,
}

impl<'a, B: Backend> ConnectionController<'a, B> {
    /// Starts `Disconnected`; nothing touches the backend until [`connect`].
    ///
    /// [`connect`]: Self::connect
    pub fn new(
        backend: B,
        config: SessionConfig<'a>,
        topic: &'a str,
        handler: &'static dyn SampleHandler,
    ) -> Self {
        Self {
            backend,
            config,
            topic,
            handler,
            policy: PublishFailurePolicy::default(),
            state: LinkState::Disconnected,
            link: None,
        }
    }

    pub fn with_policy(mut self, policy: PublishFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn topic(&self) -> &'a str {
        self.topic
    }

    pub fn policy(&self) -> PublishFailurePolicy {
        self.policy
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One full connect attempt.
    pub async fn connect<S: Screen + ?Sized>(&mut self, screen: &mut S) -> Result<(), Error> {
        // Old handles go first, before anything new is opened.
        self.link = None;
        self.state = LinkState::Connecting;
        screen.show("Reconnecting session...", false);
        info!("opening {=str} session", self.config.mode.as_str());

        let mut session = match self.backend.open(&self.config).await {
            Ok(session) => session,
            Err(_) => return Err(self.fail(screen, Error::SessionOpen)),
        };
        session.start_background_tasks();

        screen.show(&progress_line("Declaring publisher for ", self.topic), false);
        let publisher = match session.declare_publisher(self.topic).await {
            Ok(publisher) => publisher,
            Err(_) => return Err(self.fail(screen, Error::PublisherDeclare)),
        };
        screen.show("OK", false);

        screen.show(&progress_line("Declaring subscriber on ", self.topic), false);
        let subscriber = match session.declare_subscriber(self.topic, self.handler).await {
            Ok(subscriber) => subscriber,
            Err(_) => return Err(self.fail(screen, Error::SubscriberDeclare)),
        };
        screen.show("OK", false);

        self.link = Some(Link {
            publisher,
            _subscriber: subscriber,
            session,
        });
        self.state = LinkState::Connected;
        info!("session connected on {=str}", self.topic);
        screen.show("Session connected", false);
        Ok(())
    }

    /// Publish `text` as a plain-text payload on the configured topic.
    ///
    /// Success is silent on the screen. Failure (including having no
    /// publisher) is shown with a beep.
    pub async fn publish<S: Screen + ?Sized>(
        &mut self,
        text: &str,
        screen: &mut S,
    ) -> Result<(), Error> {
        let mut payload: String<PAYLOAD_MAX_LEN> = String::new();
        if !push_truncated(&mut payload, text) {
            debug!("payload truncated to {=usize} bytes", payload.len());
        }
        info!("[pub] {=str}", payload.as_str());

        let result = match self.link.as_mut() {
            Some(link) => link
                .publisher
                .put(payload.as_bytes(), Encoding::TextPlain)
                .await
                .map_err(|_| Error::Publish),
            None => Err(Error::Publish),
        };

        if let Err(err) = result {
            warn!("{}", err);
            screen.show(err.message(), true);
            if self.policy == PublishFailurePolicy::Reconnect {
                self.drop_link();
            }
        }
        result
    }

    /// Drop the link if the backend says the session died.
    ///
    /// Returns whether the controller is still connected.
    pub fn check_link<S: Screen + ?Sized>(&mut self, screen: &mut S) -> bool {
        let alive = match &self.link {
            Some(link) => link.session.is_alive(),
            None => return false,
        };
        if !alive {
            warn!("session lost");
            self.drop_link();
            screen.show("Session lost", false);
        }
        alive
    }

    fn drop_link(&mut self) {
        self.link = None;
        self.state = LinkState::Disconnected;
    }

    fn fail<S: Screen + ?Sized>(&mut self, screen: &mut S, err: Error) -> Error {
        self.drop_link();
        warn!("{}", err);
        screen.show(err.message(), false);
        err
    }
}

fn progress_line(prefix: &str, topic: &str) -> String<PROGRESS_LINE_MAX_LEN> {
    let mut line = String::new();
    let _ = push_truncated(&mut line, prefix)
        && push_truncated(&mut line, topic)
        && push_truncated(&mut line, "...");
    line
}
