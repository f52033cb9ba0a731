/// D-Bus proxy for the machid daemon.
///
/// Lets any session-bus client drive the pointer and keyboard through a
/// running `machid serve --transport dbus`.
#[zbus::proxy(
    interface = "io.github.machid.Hid",
    default_service = "io.github.machid.Hid",
    default_path = "/io/github/machid/Hid"
)]
pub trait Hid {
    /// Move the pointer to absolute desktop coordinates.
    fn mouse_move_abs(&self, x: f64, y: f64) -> zbus::Result<()>;

    /// Move the pointer relative to its current location.
    fn mouse_move_delta(&self, dx: f64, dy: f64) -> zbus::Result<()>;

    /// Current pointer location as `(x, y)`.
    fn mouse_get_current_position(&self) -> zbus::Result<(f64, f64)>;

    /// Make the cursor visible.
    fn mouse_show(&self) -> zbus::Result<()>;

    /// Press a mouse button by name.
    fn mouse_button_down(&self, button: &str) -> zbus::Result<()>;

    /// Release a mouse button by name.
    fn mouse_button_up(&self, button: &str) -> zbus::Result<()>;

    /// Press a key by name.
    fn key_down(&self, key: &str) -> zbus::Result<()>;

    /// Release a key by name.
    fn key_up(&self, key: &str) -> zbus::Result<()>;

    /// Tell the daemon to shut down gracefully.
    fn stop(&self) -> zbus::Result<bool>;

    /// Name of the active event backend.
    #[zbus(property)]
    fn backend(&self) -> zbus::Result<String>;
}
