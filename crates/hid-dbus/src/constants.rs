/// D-Bus service name for the machid daemon.
pub const SERVICE_NAME: &str = "io.github.machid.Hid";

/// D-Bus object path for the machid daemon.
pub const OBJECT_PATH: &str = "/io/github/machid/Hid";
