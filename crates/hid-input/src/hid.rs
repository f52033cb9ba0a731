//! The operations exposed to callers, on top of any [`HidBackend`].

use crate::backend::{HidBackend, MouseButton};
use crate::error::HidError;
use crate::geometry::Point;
use crate::keymap::Key;

/// Pointer and keyboard synthesis over one backend.
///
/// Each method issues at most one state-changing backend call. The only
/// computation is clamping targets to the screen bounds.
pub struct Hid {
    backend: Box<dyn HidBackend>,
    clamp_to_screen: bool,
}

impl Hid {
    #[must_use]
    pub fn new(backend: Box<dyn HidBackend>, clamp_to_screen: bool) -> Self {
        Self {
            backend,
            clamp_to_screen,
        }
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn clamp(&self, point: Point) -> Point {
        if !self.clamp_to_screen {
            return point;
        }
        match self.backend.screen_bounds() {
            Some(bounds) => bounds.clamp(point),
            None => point,
        }
    }

    /// Move the pointer to absolute desktop coordinates.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn move_abs(&mut self, x: f64, y: f64) -> Result<Point, HidError> {
        let target = self.clamp(Point::new(x, y));
        tracing::trace!(x, y, ?target, "mouse move (absolute)");
        self.backend.warp_pointer(target)?;
        Ok(target)
    }

    /// Move the pointer by a delta from its current location.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn move_delta(&mut self, dx: f64, dy: f64) -> Result<Point, HidError> {
        let current = self.backend.cursor_position()?;
        let target = self.clamp(current.offset(dx, dy));
        tracing::trace!(dx, dy, ?current, ?target, "mouse move (delta)");
        self.backend.warp_pointer(target)?;
        Ok(target)
    }

    /// Current pointer location.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn position(&mut self) -> Result<Point, HidError> {
        self.backend.cursor_position()
    }

    /// Make the cursor visible.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn show_cursor(&mut self) -> Result<(), HidError> {
        self.backend.show_cursor()
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn button_down(&mut self, button: MouseButton) -> Result<(), HidError> {
        tracing::trace!(%button, "mouse button down");
        self.backend.button(button, true)
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn button_up(&mut self, button: MouseButton) -> Result<(), HidError> {
        tracing::trace!(%button, "mouse button up");
        self.backend.button(button, false)
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn key_down(&mut self, key: Key) -> Result<(), HidError> {
        tracing::trace!(%key, "key down");
        self.backend.key(key, true)
    }

    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn key_up(&mut self, key: Key) -> Result<(), HidError> {
        tracing::trace!(%key, "key up");
        self.backend.key(key, false)
    }
}
