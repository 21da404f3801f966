//! Integration tests for the m5pager main loop against an in-memory backend.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_futures::block_on;
use m5pager::backend::{Backend, Encoding, Publisher, SampleHandler, Session};
use m5pager::catalog::{MessageCatalog, MessageCycle};
use m5pager::config::{SessionConfig, DEFAULT_MESSAGES, TOPIC};
use m5pager::inbox::Inbox;
use m5pager::ui::{ButtonEdges, ButtonEvent, Screen};
use m5pager::{App, ConnectionController, Error, LinkState};

// ─── Test doubles ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Broker {
    down: Cell<bool>,
    alive: Cell<bool>,
    opens: Cell<usize>,
    handler: Cell<Option<&'static dyn SampleHandler>>,
    published: RefCell<Vec<String>>,
}

impl Broker {
    fn deliver(&self, payload: &[u8]) {
        if let Some(handler) = self.handler.get() {
            handler.on_sample(TOPIC, payload);
        }
    }
}

struct MemBackend(Rc<Broker>);
struct MemSession(Rc<Broker>);
struct MemPublisher(Rc<Broker>);

impl Backend for MemBackend {
    type Error = &'static str;
    type Session = MemSession;

    async fn open(&mut self, _config: &SessionConfig<'_>) -> Result<MemSession, &'static str> {
        self.0.opens.set(self.0.opens.get() + 1);
        if self.0.down.get() {
            return Err("broker unreachable");
        }
        self.0.alive.set(true);
        Ok(MemSession(self.0.clone()))
    }
}

impl Session for MemSession {
    type Error = &'static str;
    type Publisher = MemPublisher;
    type Subscriber = ();

    fn start_background_tasks(&mut self) {}

    async fn declare_publisher(&mut self, _topic: &str) -> Result<MemPublisher, &'static str> {
        Ok(MemPublisher(self.0.clone()))
    }

    async fn declare_subscriber(
        &mut self,
        _topic: &str,
        handler: &'static dyn SampleHandler,
    ) -> Result<(), &'static str> {
        self.0.handler.set(Some(handler));
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.0.alive.get()
    }
}

impl Publisher for MemPublisher {
    type Error = &'static str;

    async fn put(&mut self, payload: &[u8], encoding: Encoding) -> Result<(), &'static str> {
        assert_eq!(encoding, Encoding::TextPlain);
        let text = String::from_utf8(payload.to_vec()).map_err(|_| "not utf-8")?;
        self.0.published.borrow_mut().push(text);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Drawn {
    Show(String, bool),
    Status(String),
}

#[derive(Default)]
struct Lcd {
    log: Vec<Drawn>,
}

impl Screen for Lcd {
    fn show(&mut self, text: &str, play_tone: bool) {
        self.log.push(Drawn::Show(text.to_owned(), play_tone));
    }

    fn show_status_line(&mut self, text: &str) {
        self.log.push(Drawn::Status(text.to_owned()));
    }
}

impl Lcd {
    fn statuses(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|d| match d {
                Drawn::Status(s) => Some(s.as_str()),
                Drawn::Show(..) => None,
            })
            .collect()
    }

    fn beeps(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|d| match d {
                Drawn::Show(s, true) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn app_with(
    messages: &'static [&'static str],
    broker: &Rc<Broker>,
) -> App<'static, MemBackend, Lcd> {
    let inbox: &'static Inbox = Box::leak(Box::new(Inbox::new()));
    let config = SessionConfig::from_build().expect("compiled-in config");
    let controller = ConnectionController::new(MemBackend(broker.clone()), config, TOPIC, inbox);
    let cycle = MessageCycle::new(MessageCatalog::new(messages).expect("non-empty"));
    App::new(controller, cycle, Lcd::default(), inbox)
}

fn press(events: &[ButtonEvent]) -> ButtonEdges {
    ButtonEdges::from_events(events.iter().copied())
}

static ABC: [&str; 3] = ["A", "B", "C"];

// ─── Startup ───────────────────────────────────────────────────────────────

#[test]
fn start_shows_status_then_connects() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&DEFAULT_MESSAGES, &broker);

    assert_eq!(block_on(app.start()), Ok(()));

    assert!(app.controller().is_connected());
    let log = &app.screen().log;
    assert_eq!(log[0], Drawn::Status(format!("message: {}", DEFAULT_MESSAGES[0])));
    assert_eq!(log[1], Drawn::Show("Reconnecting session...".into(), false));
    assert_eq!(log.last(), Some(&Drawn::Show("Session connected".into(), false)));
}

#[test]
fn start_failure_is_not_fatal() {
    let broker = Rc::new(Broker::default());
    broker.down.set(true);
    let mut app = app_with(&ABC, &broker);

    assert_eq!(block_on(app.start()), Err(Error::SessionOpen));
    assert_eq!(app.controller().state(), LinkState::Disconnected);

    broker.down.set(false);
    block_on(app.tick(ButtonEdges::NONE));
    assert!(app.controller().is_connected());
    assert_eq!(broker.opens.get(), 2);
}

// ─── Reconnect ─────────────────────────────────────────────────────────────

#[test]
fn retries_once_per_tick_while_down() {
    let broker = Rc::new(Broker::default());
    broker.down.set(true);
    let mut app = app_with(&ABC, &broker);

    for _ in 0..5 {
        block_on(app.tick(ButtonEdges::NONE));
    }
    assert_eq!(broker.opens.get(), 5);
    assert!(!app.controller().is_connected());
}

#[test]
fn connected_ticks_do_not_reopen() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();

    for _ in 0..5 {
        block_on(app.tick(ButtonEdges::NONE));
    }
    assert_eq!(broker.opens.get(), 1);
}

#[test]
fn lost_session_reconnects_in_same_tick() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();

    broker.alive.set(false);
    block_on(app.tick(ButtonEdges::NONE));

    assert!(app.controller().is_connected());
    assert_eq!(broker.opens.get(), 2);
    assert!(app
        .screen()
        .log
        .contains(&Drawn::Show("Session lost".into(), false)));
}

#[test]
fn input_still_works_while_disconnected() {
    let broker = Rc::new(Broker::default());
    broker.down.set(true);
    let mut app = app_with(&ABC, &broker);

    block_on(app.tick(press(&[ButtonEvent::Next])));
    assert_eq!(app.cycle().current(), "B");

    block_on(app.tick(press(&[ButtonEvent::Send])));
    assert!(broker.published.borrow().is_empty());
    assert_eq!(app.screen().beeps(), ["Error while publishing data"]);
}

// ─── Message cycling ───────────────────────────────────────────────────────

#[test]
fn next_next_prev_lands_on_second_message() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();

    block_on(app.tick(press(&[ButtonEvent::Next])));
    block_on(app.tick(press(&[ButtonEvent::Next])));
    block_on(app.tick(press(&[ButtonEvent::Prev])));

    assert_eq!(app.cycle().index(), 1);
    assert_eq!(
        app.screen().statuses(),
        ["message: A", "message: B", "message: C", "message: B"]
    );
}

#[test]
fn prev_from_first_wraps_to_last() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);

    block_on(app.tick(press(&[ButtonEvent::Prev])));
    assert_eq!(app.cycle().current(), "C");
}

#[test]
fn next_and_prev_in_one_tick_cancel_out() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();

    block_on(app.tick(press(&[ButtonEvent::Prev, ButtonEvent::Next])));

    assert_eq!(app.cycle().index(), 0);
    // next is applied before prev
    assert_eq!(
        app.screen().statuses(),
        ["message: A", "message: B", "message: A"]
    );
}

// ─── Publish / subscribe ───────────────────────────────────────────────────

#[test]
fn send_publishes_current_message() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&DEFAULT_MESSAGES, &broker);
    block_on(app.start()).unwrap();

    block_on(app.tick(press(&[ButtonEvent::Send])));

    assert_eq!(*broker.published.borrow(), [DEFAULT_MESSAGES[0]]);
    assert!(app.screen().beeps().is_empty());
}

#[test]
fn send_uses_selection_from_same_tick() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();

    block_on(app.tick(press(&[ButtonEvent::Send, ButtonEvent::Next])));

    assert_eq!(*broker.published.borrow(), ["B"]);
}

#[test]
fn own_message_comes_back_with_a_beep() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();

    broker.deliver("ご飯の時間だよ".as_bytes());
    broker.deliver(b"Good morning");
    block_on(app.tick(ButtonEdges::NONE));

    assert_eq!(app.screen().beeps(), ["ご飯の時間だよ", "Good morning"]);
    assert_eq!(app.cycle().index(), 0);

    // drained; nothing is shown twice
    block_on(app.tick(ButtonEdges::NONE));
    assert_eq!(app.screen().beeps().len(), 2);
}

#[test]
fn inbound_render_follows_input() {
    let broker = Rc::new(Broker::default());
    let mut app = app_with(&ABC, &broker);
    block_on(app.start()).unwrap();
    let before = app.screen().log.len();

    broker.deliver(b"hi");
    block_on(app.tick(press(&[ButtonEvent::Next])));

    assert_eq!(
        app.screen().log[before..],
        [
            Drawn::Status("message: B".into()),
            Drawn::Show("hi".into(), true),
        ]
    );
}
