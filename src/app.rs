//! Main loop orchestration.
//!
//! [`App::tick`] is one pass of the device loop. The caller supplies the
//! button edges sampled since the previous tick and is responsible for
//! spacing ticks (`config::TICK_PERIOD_MS` on the firmware).

use heapless::String;

use crate::backend::Backend;
use crate::catalog::MessageCycle;
use crate::config::STATUS_LINE_MAX_LEN;
use crate::controller::ConnectionController;
use crate::error::Error;
use crate::inbox::Inbox;
use crate::text::push_truncated;
use crate::ui::{ButtonEdges, Screen};

pub struct App<'a, B: Backend, S: Screen> {
    controller: ConnectionController<'a, B>,
    cycle: MessageCycle<'a>,
    screen: S,
    inbox: &'static Inbox,
}

impl<'a, B: Backend, S: Screen> App<'a, B, S> {
    /// `inbox` must be the handler the controller registers for its
    /// subscriber, otherwise received messages never reach the screen.
    pub fn new(
        controller: ConnectionController<'a, B>,
        cycle: MessageCycle<'a>,
        screen: S,
        inbox: &'static Inbox,
    ) -> Self {
        Self {
            controller,
            cycle,
            screen,
            inbox,
        }
    }

    /// Draw the status line and make the first connect attempt.
    ///
    /// A failed attempt is not fatal; the next tick retries.
    pub async fn start(&mut self) -> Result<(), Error> {
        self.refresh_status_line();
        self.controller.connect(&mut self.screen).await
    }

    pub async fn tick(&mut self, edges: ButtonEdges) {
        if !self.controller.check_link(&mut self.screen) {
            // failure is already on screen; try again next tick
            let _ = self.controller.connect(&mut self.screen).await;
        }

        if edges.next {
            self.cycle.advance();
            self.refresh_status_line();
        }
        if edges.prev {
            self.cycle.retreat();
            self.refresh_status_line();
        }
        if edges.send {
            let _ = self
                .controller
                .publish(self.cycle.current(), &mut self.screen)
                .await;
        }

        while let Some(received) = self.inbox.try_take() {
            self.screen.show(received.as_str(), true);
        }
    }

    fn refresh_status_line(&mut self) {
        let mut line: String<STATUS_LINE_MAX_LEN> = String::new();
        let _ = push_truncated(&mut line, "message: ")
            && push_truncated(&mut line, self.cycle.current());
        debug!("selected message {=usize}", self.cycle.index());
        self.screen.show_status_line(&line);
    }

    pub fn controller(&self) -> &ConnectionController<'a, B> {
        &self.controller
    }

    pub fn cycle(&self) -> &MessageCycle<'a> {
        &self.cycle
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }
}
