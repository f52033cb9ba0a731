//! Mouse and keyboard event synthesis for machid.
//!
//! Thin pass-through wrappers over the platform event API: each
//! operation posts at most one event and returns.
//!
//! - [`backend`]: the [`HidBackend`] trait and backend selection
//! - [`hid`]: the [`Hid`] facade with screen-bounds clamping
//! - [`keymap`]: platform-neutral key names to native keycodes
//! - [`geometry`]: desktop points and bounds
//! - `libei`: reis/libei backend (Linux)
//! - `coregraphics`: Quartz event services backend (macOS)

pub mod backend;
pub mod error;
pub mod geometry;
pub mod hid;
pub mod keymap;

#[cfg(target_os = "macos")]
pub mod coregraphics;
#[cfg(target_os = "linux")]
pub mod libei;

pub use backend::{connect, BackendKind, HidBackend, MouseButton, UnknownButton};
pub use error::HidError;
pub use geometry::{Bounds, Point};
pub use hid::Hid;
pub use keymap::{Key, UnknownKey};
