//! Shared configuration and D-Bus plumbing for machid.
//!
//! - [`config`]: TOML configuration, shared by the daemon and its tooling
//! - [`server`]: the `io.github.machid.Hid` interface
//! - [`client`]: a proxy for talking to a running daemon

pub mod client;
pub mod config;
pub mod constants;
pub mod server;
