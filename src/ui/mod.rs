//! User interface seam - LCD + speaker output and the three front buttons.
//!
//! The application core renders through [`Screen`] and reads input as one
//! [`ButtonEdges`] per tick. The firmware implements both on the M5Stack
//! hardware in `board::display` and `board::buttons`.
//!
//! ## Components
//!
//! - **Screen**: full-screen message area plus a one-line status footer,
//!   optionally with a short beep
//! - **Buttons**: A (Next), B (Previous), C (Send)

pub mod input_logic;

/// Display / audio sink.
///
/// `show` replaces the message area and redraws the status line below it.
/// Neither call may fail from the caller's point of view.
pub trait Screen {
    /// Show `text` in the message area, beeping once if `play_tone`.
    fn show(&mut self, text: &str, play_tone: bool);

    /// Replace the status line (bottom of the screen).
    fn show_status_line(&mut self, text: &str);
}

/// Physical button events (after debouncing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Button A.
    Next,
    /// Button B.
    Prev,
    /// Button C.
    Send,
}

/// Buttons pressed since the previous tick.
///
/// Repeated presses of the same button within one tick collapse into a
/// single edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEdges {
    pub next: bool,
    pub prev: bool,
    pub send: bool,
}

impl ButtonEdges {
    pub const NONE: Self = Self {
        next: false,
        prev: false,
        send: false,
    };

    /// Fold one event into the edge set.
    pub fn record(&mut self, event: ButtonEvent) {
        match event {
            ButtonEvent::Next => self.next = true,
            ButtonEvent::Prev => self.prev = true,
            ButtonEvent::Send => self.send = true,
        }
    }

    pub fn from_events<I: IntoIterator<Item = ButtonEvent>>(events: I) -> Self {
        let mut edges = Self::NONE;
        for event in events {
            edges.record(event);
        }
        edges
    }

    pub fn any(&self) -> bool {
        self.next || self.prev || self.send
    }
}
