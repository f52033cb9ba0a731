use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hid_dbus::config::{HidConfig, Transport};
use hid_dbus::server::DaemonCommand;
use hid_input::{BackendKind, Hid, MouseButton};
use serde_json::{json, Value};

mod dbus;
mod exports;
mod stdio;

/// Mouse and keyboard synthesis primitives for host scripting runtimes.
///
/// `machid serve` exposes the exported functions over stdin/stdout (JSON
/// lines) or the session bus; the other subcommands run one export and
/// print its result.
#[derive(Parser, Debug)]
#[command(name = "machid", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Event backend: auto, libei or coregraphics.
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Do not clamp move targets to the screen bounds.
    #[arg(long, global = true)]
    no_clamp: bool,

    /// Send one-shot commands to a running `serve --transport dbus`
    /// instead of posting events from this process. The daemon's own
    /// backend and clamping settings apply, so `--config`, `--backend`
    /// and `--no-clamp` are rejected here.
    #[arg(long, global = true)]
    remote: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the exported functions to a host runtime.
    Serve {
        /// Bridge transport: stdio or dbus.
        #[arg(long)]
        transport: Option<Transport>,
    },
    /// Move the pointer to absolute desktop coordinates.
    #[command(allow_negative_numbers = true)]
    MoveAbs { x: f64, y: f64 },
    /// Move the pointer relative to its current location.
    #[command(allow_negative_numbers = true)]
    MoveDelta { dx: f64, dy: f64 },
    /// Print the current pointer location.
    Position,
    /// Make the cursor visible.
    Show,
    /// Press a mouse button (name or index 0-4).
    ButtonDown { button: String },
    /// Release a mouse button (name or index 0-4).
    ButtonUp { button: String },
    /// Press a key (name, or `raw:<code>` for a native keycode).
    KeyDown { key: String },
    /// Release a key (name, or `raw:<code>` for a native keycode).
    KeyUp { key: String },
    /// Write the effective configuration to the config file.
    WriteConfig,
}

impl Command {
    /// The export and JSON arguments for a one-shot command.
    fn as_call(&self) -> Option<(&'static str, Vec<Value>)> {
        let call = match self {
            Self::Serve { .. } | Self::WriteConfig => return None,
            Self::MoveAbs { x, y } => ("mouseMoveABS", vec![json!(x), json!(y)]),
            Self::MoveDelta { dx, dy } => ("mouseMoveDelta", vec![json!(dx), json!(dy)]),
            Self::Position => ("mouseGetCurrentPosition", Vec::new()),
            Self::Show => ("mouseShow", Vec::new()),
            Self::ButtonDown { button } => ("mouseButtonDown", vec![button_arg(button)]),
            Self::ButtonUp { button } => ("mouseButtonUp", vec![button_arg(button)]),
            Self::KeyDown { key } => ("keyDown", vec![json!(key)]),
            Self::KeyUp { key } => ("keyUp", vec![json!(key)]),
        };
        Some(call)
    }
}

/// Buttons may be given by index on the command line.
fn button_arg(button: &str) -> Value {
    button
        .parse::<u64>()
        .map_or_else(|_| json!(button), |index| json!(index))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    check_remote_flags(&cli)?;
    let cfg = load_and_merge_config(&cli)?;

    if let Command::WriteConfig = cli.command {
        return hid_dbus::config::save(&cfg, cli.config.as_deref());
    }

    if cli.remote {
        let result = run_remote(&cli.command).await?;
        println!("{result}");
        return Ok(());
    }

    let backend = hid_input::connect(cfg.backend.kind, &cfg.backend.app_name)
        .await
        .context("failed to connect input backend")?;
    let mut hid = Hid::new(backend, cfg.pointer.clamp_to_screen);
    tracing::info!(
        backend = hid.backend_name(),
        clamp = cfg.pointer.clamp_to_screen,
        "Input backend ready"
    );

    let Some((name, args)) = cli.command.as_call() else {
        return serve(cfg.bridge.transport, hid).await;
    };

    match exports::call(&mut hid, name, &args) {
        Ok(result) => {
            println!("{result}");
            Ok(())
        }
        Err(e) => bail!("{}: {e}", e.kind()),
    }
}

/// `--remote` talks to a daemon that already has its configuration.
fn check_remote_flags(cli: &Cli) -> Result<()> {
    if !cli.remote {
        return Ok(());
    }
    let local = [
        ("--config", cli.config.is_some()),
        ("--backend", cli.backend.is_some()),
        ("--no-clamp", cli.no_clamp),
    ];
    if let Some((flag, _)) = local.iter().find(|(_, set)| *set) {
        bail!("{flag} has no effect with --remote; the daemon's settings apply");
    }
    Ok(())
}

/// Load config from file and apply CLI overrides.
fn load_and_merge_config(cli: &Cli) -> Result<HidConfig> {
    let mut cfg = hid_dbus::config::load(cli.config.as_deref())?;
    apply_overrides(cli, &mut cfg);
    Ok(cfg)
}

fn apply_overrides(cli: &Cli, cfg: &mut HidConfig) {
    if let Some(kind) = cli.backend {
        cfg.backend.kind = kind;
    }
    if cli.no_clamp {
        cfg.pointer.clamp_to_screen = false;
    }
    if let Command::Serve {
        transport: Some(transport),
    } = cli.command
    {
        cfg.bridge.transport = transport;
    }
}

/// Run a bridge until its input ends, a stop is requested, or a signal
/// arrives.
async fn serve(transport: Transport, hid: Hid) -> Result<()> {
    match transport {
        Transport::Stdio => {
            let mut hid = hid;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            tracing::info!("Serving exports on stdin/stdout");
            tokio::select! {
                result = stdio::serve(&mut hid, stdin, tokio::io::stdout()) => {
                    result?;
                }
                result = shutdown_signal() => {
                    result?;
                }
            }
        }
        Transport::Dbus => {
            let hid = Arc::new(tokio::sync::Mutex::new(hid));
            let (_connection, mut cmd_rx) = dbus::start_dbus_server(hid).await?;
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(DaemonCommand::Stop) | None => {
                            tracing::info!("D-Bus: stop requested");
                        }
                    }
                }
                result = shutdown_signal() => {
                    result?;
                }
            }
        }
    }
    tracing::info!("machid stopped");
    Ok(())
}

/// Resolve on `SIGINT` or `SIGTERM`.
async fn shutdown_signal() -> Result<()> {
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to register SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for SIGINT")?;
            tracing::info!("Received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
    Ok(())
}

/// Run a one-shot command through the D-Bus proxy of a running daemon.
async fn run_remote(command: &Command) -> Result<Value> {
    let proxy = dbus::connect_remote().await?;

    match command {
        Command::Serve { .. } | Command::WriteConfig => {
            bail!("--remote only applies to one-shot commands")
        }
        Command::MoveAbs { x, y } => proxy.mouse_move_abs(*x, *y).await?,
        Command::MoveDelta { dx, dy } => proxy.mouse_move_delta(*dx, *dy).await?,
        Command::Position => {
            let (x, y) = proxy.mouse_get_current_position().await?;
            return Ok(json!({ "x": x, "y": y }));
        }
        Command::Show => proxy.mouse_show().await?,
        Command::ButtonDown { button } => proxy.mouse_button_down(remote_button(button)).await?,
        Command::ButtonUp { button } => proxy.mouse_button_up(remote_button(button)).await?,
        Command::KeyDown { key } => proxy.key_down(key).await?,
        Command::KeyUp { key } => proxy.key_up(key).await?,
    }
    Ok(Value::Null)
}

/// The daemon takes button names; translate indices before sending.
fn remote_button(button: &str) -> &str {
    button
        .parse::<u64>()
        .ok()
        .and_then(MouseButton::from_index)
        .map_or(button, |b| b.as_str())
}
