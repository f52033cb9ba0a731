use std::sync::Arc;

use anyhow::{Context, Result};
use hid_dbus::constants::{OBJECT_PATH, SERVICE_NAME};
use hid_dbus::server::{DaemonCommand, HidInterface};
use hid_input::Hid;
use tokio::sync::{mpsc, Mutex};

/// Start the D-Bus server and return a command receiver for daemon control.
///
/// The connection runs on the session bus and exposes the
/// `io.github.machid.Hid` interface at `/io/github/machid/Hid`.
///
/// # Errors
///
/// Returns an error if the D-Bus connection cannot be established or
/// the service name is already taken.
pub async fn start_dbus_server(
    hid: Arc<Mutex<Hid>>,
) -> Result<(zbus::Connection, mpsc::Receiver<DaemonCommand>)> {
    let (cmd_tx, cmd_rx) = mpsc::channel(4);

    let iface = HidInterface::new(hid, cmd_tx);

    let connection = zbus::connection::Builder::session()
        .context("failed to connect to session D-Bus")?
        .name(SERVICE_NAME)
        .context("failed to request D-Bus service name")?
        .serve_at(OBJECT_PATH, iface)
        .context("failed to serve D-Bus interface")?
        .build()
        .await
        .context("failed to build D-Bus connection")?;

    tracing::info!(service = SERVICE_NAME, "D-Bus server started");

    Ok((connection, cmd_rx))
}

/// Connect to a running daemon on the session bus.
///
/// # Errors
///
/// Returns an error if the session bus is unreachable.
pub async fn connect_remote() -> Result<hid_dbus::client::HidProxy<'static>> {
    let connection = zbus::Connection::session()
        .await
        .context("failed to connect to session D-Bus")?;
    hid_dbus::client::HidProxy::new(&connection)
        .await
        .context("failed to create machid D-Bus proxy")
}
