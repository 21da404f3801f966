//! Hardware-independent core of m5pager.
//!
//! Everything here builds for the host and is covered by `cargo test`.
//! The firmware binary (`src/main.rs`, `embedded` feature) plugs the
//! M5Stack display, buttons, speaker and an MQTT backend into these
//! modules.
//!
//! Usage: `cargo test` on the host, `cargo run --release --features embedded`
//! with an ESP32 toolchain and espflash for the device.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Configuration & Errors
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod locator;

// ═══════════════════════════════════════════════════════════════════════════
// Application Core
// ═══════════════════════════════════════════════════════════════════════════

pub mod app;
pub mod backend;
pub mod catalog;
pub mod controller;
pub mod inbox;
pub mod link_watch;
pub mod text;
pub mod ui;

pub use app::App;
pub use controller::{ConnectionController, LinkState};
pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::ui::input_logic::{wrap_next, wrap_prev};
    use crate::ui::{ButtonEdges, ButtonEvent};
    use proptest::prelude::*;

    // ════════════════════════════════════════════════════════════════════════
    // Selection Wrap Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn ui_input_logic_wrap_boundaries() {
        assert_eq!(wrap_next(0, 3), 1);
        assert_eq!(wrap_next(2, 3), 0);
        assert_eq!(wrap_prev(0, 3), 2);
        assert_eq!(wrap_prev(2, 3), 1);
        assert_eq!(wrap_next(0, 1), 0);
        assert_eq!(wrap_prev(0, 1), 0);
    }

    #[test]
    fn ui_input_logic_empty_list_is_noop() {
        assert_eq!(wrap_next(0, 0), 0);
        assert_eq!(wrap_prev(0, 0), 0);
    }

    proptest! {
        #[test]
        fn wrap_stays_in_range(n in 1usize..64, i in 0usize..64) {
            let i = i % n;
            prop_assert!(wrap_next(i, n) < n);
            prop_assert!(wrap_prev(i, n) < n);
        }

        #[test]
        fn wrap_next_and_prev_are_inverse(n in 1usize..64, i in 0usize..64) {
            let i = i % n;
            prop_assert_eq!(wrap_prev(wrap_next(i, n), n), i);
            prop_assert_eq!(wrap_next(wrap_prev(i, n), n), i);
        }

        #[test]
        fn n_steps_return_to_start(n in 1usize..32, i in 0usize..32) {
            let start = i % n;
            let mut fwd = start;
            let mut back = start;
            for _ in 0..n {
                fwd = wrap_next(fwd, n);
                back = wrap_prev(back, n);
            }
            prop_assert_eq!(fwd, start);
            prop_assert_eq!(back, start);
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Button Edge Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn edges_default_to_none() {
        assert_eq!(ButtonEdges::default(), ButtonEdges::NONE);
        assert!(!ButtonEdges::NONE.any());
    }

    #[test]
    fn edges_collapse_repeats() {
        let edges = ButtonEdges::from_events([ButtonEvent::Next, ButtonEvent::Next]);
        assert!(edges.next);
        assert!(!edges.prev);
        assert!(!edges.send);
        assert!(edges.any());
    }

    #[test]
    fn edges_are_independent() {
        let edges =
            ButtonEdges::from_events([ButtonEvent::Send, ButtonEvent::Prev, ButtonEvent::Next]);
        assert_eq!(
            edges,
            ButtonEdges {
                next: true,
                prev: true,
                send: true,
            }
        );
    }
}
