//! The backend trait and backend selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HidError;
use crate::geometry::{Bounds, Point};
use crate::keymap::Key;

/// Mouse button identifiers.
///
/// The numeric index (0..=4, in declaration order) matches the
/// `CGMouseButton` numbering used by macOS button-number fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
}

impl MouseButton {
    /// Look up a button by its numeric index.
    #[must_use]
    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Middle),
            3 => Some(Self::Back),
            4 => Some(Self::Forward),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
            Self::Back => "back",
            Self::Forward => "forward",
        }
    }
}

impl FromStr for MouseButton {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            "back" => Ok(Self::Back),
            "forward" => Ok(Self::Forward),
            _ => Err(UnknownButton(s.to_string())),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A button name that is not one of the five known buttons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mouse button: {0:?}")]
pub struct UnknownButton(pub String);

/// One OS event primitive per method.
///
/// Implementations translate each call into a single call to the
/// platform's event API; they never queue or retry.
pub trait HidBackend: Send {
    /// Short backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Union of all displays the backend knows about.
    fn screen_bounds(&self) -> Option<Bounds>;

    /// Current pointer location in desktop coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be read.
    fn cursor_position(&mut self) -> Result<Point, HidError>;

    /// Post a pointer motion to an absolute location.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be created or posted.
    fn warp_pointer(&mut self, to: Point) -> Result<(), HidError>;

    /// Press or release a mouse button at the current location.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be created or posted.
    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), HidError>;

    /// Press or release a keyboard key.
    ///
    /// # Errors
    ///
    /// Returns [`HidError::UnmappedKey`] if the key has no native code.
    fn key(&mut self, key: Key, pressed: bool) -> Result<(), HidError>;

    /// Make the cursor visible on the main display.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS call fails or is unavailable.
    fn show_cursor(&mut self) -> Result<(), HidError>;
}

/// Which backend to connect to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The native backend for the current platform.
    #[default]
    Auto,
    /// libei, via `LIBEI_SOCKET` or the `RemoteDesktop` portal (Linux).
    Libei,
    /// Quartz event services (macOS).
    #[serde(rename = "coregraphics")]
    CoreGraphics,
}

impl BackendKind {
    /// Resolve `Auto` to the backend for the platform this was built for.
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "macos") => Self::CoreGraphics,
            Self::Auto => Self::Libei,
            other => other,
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "libei" => Ok(Self::Libei),
            "coregraphics" => Ok(Self::CoreGraphics),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Connect to the requested backend.
///
/// `app_name` identifies this client to the EIS server and is unused by
/// backends that have no handshake.
///
/// # Errors
///
/// Returns [`HidError::Init`] if the backend is unavailable on this
/// platform or fails to initialize.
#[cfg_attr(not(target_os = "linux"), allow(clippy::unused_async))]
pub async fn connect(kind: BackendKind, app_name: &str) -> Result<Box<dyn HidBackend>, HidError> {
    let kind = kind.resolve();
    tracing::debug!(?kind, app_name, "Connecting input backend");

    match kind {
        #[cfg(target_os = "linux")]
        BackendKind::Libei => {
            let backend = crate::libei::EiBackend::new(app_name).await?;
            Ok(Box::new(backend))
        }
        #[cfg(target_os = "macos")]
        BackendKind::CoreGraphics => Ok(Box::new(crate::coregraphics::CgBackend::new()?)),
        other => Err(HidError::Init(format!(
            "{other:?} backend is not available on this platform"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_from_index() {
        assert_eq!(MouseButton::from_index(0), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_index(2), Some(MouseButton::Middle));
        assert_eq!(MouseButton::from_index(4), Some(MouseButton::Forward));
        assert_eq!(MouseButton::from_index(5), None);
    }

    #[test]
    fn button_from_name() {
        assert_eq!("Right".parse(), Ok(MouseButton::Right));
        assert_eq!(" back ".parse(), Ok(MouseButton::Back));
        assert_eq!(
            "wheel".parse::<MouseButton>(),
            Err(UnknownButton("wheel".to_string()))
        );
    }

    #[test]
    fn backend_kind_resolves_auto() {
        let resolved = BackendKind::Auto.resolve();
        assert_ne!(resolved, BackendKind::Auto);
        assert_eq!(BackendKind::Libei.resolve(), BackendKind::Libei);
        assert_eq!(
            BackendKind::CoreGraphics.resolve(),
            BackendKind::CoreGraphics
        );
    }

    #[test]
    fn backend_kind_parse() {
        assert_eq!("LIBEI".parse(), Ok(BackendKind::Libei));
        assert_eq!("coregraphics".parse(), Ok(BackendKind::CoreGraphics));
        assert!("x11".parse::<BackendKind>().is_err());
    }

    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn connect_rejects_foreign_backend() {
        let result = connect(BackendKind::CoreGraphics, "test").await;
        assert!(matches!(result, Err(HidError::Init(_))));
    }
}
