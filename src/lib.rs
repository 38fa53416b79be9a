//! Fake chat mock-ups from a tiny line script.
//!
//! `> text` is a line from the sender, `< text` a line from the receiver. A
//! trailing `(HH:MM)` sets the time for that line and every line after it.

pub mod capture;
pub mod config;
pub mod editor;
pub mod error_codes;
pub mod fonts;
pub mod group;
pub mod logging;
pub mod platform;
pub mod preview;
pub mod raster;
pub mod script;
pub mod session;
pub mod view;
#[cfg(feature = "watch")]
pub mod watch;
