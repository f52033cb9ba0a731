//! Quartz event services backend (macOS).
//!
//! Every call creates a CoreGraphics event from an event source in
//! HID-system state and posts it at the session event tap.

use core_graphics::display::CGDisplay;
use core_graphics::event::{
    CGEvent, CGEventTapLocation, CGEventType, CGMouseButton, EventField,
};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

use crate::backend::{HidBackend, MouseButton};
use crate::error::HidError;
use crate::geometry::{Bounds, Point};
use crate::keymap::Key;

/// Event synthesis through `CGEventPost`.
#[derive(Debug, Default)]
pub struct CgBackend {
    bounds: Option<Bounds>,
}

impl CgBackend {
    /// Create the backend and snapshot the active display layout.
    ///
    /// # Errors
    ///
    /// Returns [`HidError::Init`] if no event source can be created
    /// (usually a missing accessibility permission).
    pub fn new() -> Result<Self, HidError> {
        source().map_err(|_| HidError::Init("CGEventSourceCreate failed".to_string()))?;
        let bounds = display_bounds();
        tracing::info!(?bounds, "CoreGraphics backend ready");
        Ok(Self { bounds })
    }
}

fn source() -> Result<CGEventSource, HidError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|()| HidError::Os("CGEventSourceCreate".to_string()))
}

/// Union of all active displays, in global display coordinates.
fn display_bounds() -> Option<Bounds> {
    let displays = CGDisplay::active_displays().ok()?;
    let merged = displays
        .into_iter()
        .map(|id| {
            let rect = CGDisplay::new(id).bounds();
            Bounds::new(rect.origin.x, rect.origin.y, rect.size.width, rect.size.height)
        })
        .fold(Bounds::default(), Bounds::union);
    (!merged.is_empty()).then_some(merged)
}

/// Event types and the nominal `CGMouseButton` for a press or release.
const fn button_event(button: MouseButton, pressed: bool) -> (CGEventType, CGMouseButton) {
    match (button, pressed) {
        (MouseButton::Left, true) => (CGEventType::LeftMouseDown, CGMouseButton::Left),
        (MouseButton::Left, false) => (CGEventType::LeftMouseUp, CGMouseButton::Left),
        (MouseButton::Right, true) => (CGEventType::RightMouseDown, CGMouseButton::Right),
        (MouseButton::Right, false) => (CGEventType::RightMouseUp, CGMouseButton::Right),
        (_, true) => (CGEventType::OtherMouseDown, CGMouseButton::Center),
        (_, false) => (CGEventType::OtherMouseUp, CGMouseButton::Center),
    }
}

/// Quartz button number (0 = left, 1 = right, 2 = middle, 3+ = extra).
const fn button_number(button: MouseButton) -> i64 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
    }
}

fn current_location() -> Result<CGPoint, HidError> {
    // A freshly created event carries the live cursor location.
    let source = source()?;
    let event = CGEvent::new(source).map_err(|()| HidError::Os("CGEventCreate".to_string()))?;
    Ok(event.location())
}

impl HidBackend for CgBackend {
    fn name(&self) -> &'static str {
        "coregraphics"
    }

    fn screen_bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn cursor_position(&mut self) -> Result<Point, HidError> {
        let location = current_location()?;
        Ok(Point::new(location.x, location.y))
    }

    fn warp_pointer(&mut self, to: Point) -> Result<(), HidError> {
        let event = CGEvent::new_mouse_event(
            source()?,
            CGEventType::MouseMoved,
            CGPoint::new(to.x, to.y),
            CGMouseButton::Left,
        )
        .map_err(|()| HidError::Os("CGEventCreateMouseEvent".to_string()))?;
        event.post(CGEventTapLocation::Session);
        Ok(())
    }

    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), HidError> {
        let (event_type, cg_button) = button_event(button, pressed);
        let event = CGEvent::new_mouse_event(source()?, event_type, current_location()?, cg_button)
            .map_err(|()| HidError::Os("CGEventCreateMouseEvent".to_string()))?;
        if matches!(button, MouseButton::Back | MouseButton::Forward) {
            event.set_integer_value_field(
                EventField::MOUSE_EVENT_BUTTON_NUMBER,
                button_number(button),
            );
        }
        event.post(CGEventTapLocation::Session);
        Ok(())
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), HidError> {
        let keycode = key.to_mac_keycode().ok_or(HidError::UnmappedKey(key))?;
        let event = CGEvent::new_keyboard_event(source()?, keycode, pressed)
            .map_err(|()| HidError::Os("CGEventCreateKeyboardEvent".to_string()))?;
        event.post(CGEventTapLocation::Session);
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<(), HidError> {
        CGDisplay::main()
            .show_cursor()
            .map_err(|e| HidError::Os(format!("CGDisplayShowCursor: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_buttons_use_other_mouse_events() {
        let (down, nominal) = button_event(MouseButton::Back, true);
        assert!(matches!(down, CGEventType::OtherMouseDown));
        assert!(matches!(nominal, CGMouseButton::Center));
        let (up, _) = button_event(MouseButton::Forward, false);
        assert!(matches!(up, CGEventType::OtherMouseUp));
    }

    #[test]
    fn button_numbers() {
        assert_eq!(button_number(MouseButton::Middle), 2);
        assert_eq!(button_number(MouseButton::Back), 3);
        assert_eq!(button_number(MouseButton::Forward), 4);
    }
}
