use std::sync::Arc;

use hid_input::{Hid, HidError, Key, MouseButton};
use tokio::sync::Mutex;
use zbus::fdo;
use zbus::interface;

/// Commands that can be sent from D-Bus to the daemon.
#[derive(Debug)]
pub enum DaemonCommand {
    /// Gracefully shut down the service.
    Stop,
}

/// D-Bus interface exposing the pointer and keyboard operations.
///
/// Method arguments are typed by D-Bus; button and key names are parsed
/// here and rejected with `InvalidArgs`.
pub struct HidInterface {
    hid: Arc<Mutex<Hid>>,
    cmd_tx: tokio::sync::mpsc::Sender<DaemonCommand>,
}

impl HidInterface {
    /// Create a new D-Bus interface.
    #[must_use]
    pub fn new(hid: Arc<Mutex<Hid>>, cmd_tx: tokio::sync::mpsc::Sender<DaemonCommand>) -> Self {
        Self { hid, cmd_tx }
    }
}

fn failed(err: HidError) -> fdo::Error {
    tracing::debug!("D-Bus call failed: {err}");
    fdo::Error::Failed(err.to_string())
}

fn parse_button(button: &str) -> fdo::Result<MouseButton> {
    button
        .parse()
        .map_err(|e: hid_input::UnknownButton| fdo::Error::InvalidArgs(e.to_string()))
}

fn parse_key(key: &str) -> fdo::Result<Key> {
    key.parse()
        .map_err(|e: hid_input::UnknownKey| fdo::Error::InvalidArgs(e.to_string()))
}

/// D-Bus doubles may carry NaN or infinity; neither is a screen position.
fn finite(x: f64, y: f64) -> fdo::Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(fdo::Error::InvalidArgs(format!(
            "coordinates must be finite, got ({x}, {y})"
        )))
    }
}

#[interface(name = "io.github.machid.Hid")]
impl HidInterface {
    /// Move the pointer to absolute desktop coordinates.
    async fn mouse_move_abs(&self, x: f64, y: f64) -> fdo::Result<()> {
        finite(x, y)?;
        self.hid.lock().await.move_abs(x, y).map(drop).map_err(failed)
    }

    /// Move the pointer relative to its current location.
    async fn mouse_move_delta(&self, dx: f64, dy: f64) -> fdo::Result<()> {
        finite(dx, dy)?;
        self.hid.lock().await.move_delta(dx, dy).map(drop).map_err(failed)
    }

    /// Current pointer location as `(x, y)`.
    async fn mouse_get_current_position(&self) -> fdo::Result<(f64, f64)> {
        let point = self.hid.lock().await.position().map_err(failed)?;
        Ok((point.x, point.y))
    }

    /// Make the cursor visible.
    async fn mouse_show(&self) -> fdo::Result<()> {
        self.hid.lock().await.show_cursor().map_err(failed)
    }

    /// Press a mouse button (`left`, `right`, `middle`, `back`, `forward`).
    async fn mouse_button_down(&self, button: &str) -> fdo::Result<()> {
        let button = parse_button(button)?;
        self.hid.lock().await.button_down(button).map_err(failed)
    }

    /// Release a mouse button.
    async fn mouse_button_up(&self, button: &str) -> fdo::Result<()> {
        let button = parse_button(button)?;
        self.hid.lock().await.button_up(button).map_err(failed)
    }

    /// Press a key by name.
    async fn key_down(&self, key: &str) -> fdo::Result<()> {
        let key = parse_key(key)?;
        self.hid.lock().await.key_down(key).map_err(failed)
    }

    /// Release a key by name.
    async fn key_up(&self, key: &str) -> fdo::Result<()> {
        let key = parse_key(key)?;
        self.hid.lock().await.key_up(key).map_err(failed)
    }

    /// Tell the daemon to shut down gracefully.
    async fn stop(&self) -> bool {
        self.cmd_tx.send(DaemonCommand::Stop).await.is_ok()
    }

    /// Name of the active event backend.
    #[zbus(property)]
    async fn backend(&self) -> String {
        self.hid.lock().await.backend_name().to_string()
    }
}
