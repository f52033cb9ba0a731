use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use hid_input::BackendKind;
use serde::{Deserialize, Serialize};

/// Default config directory under `$XDG_CONFIG_HOME`.
const CONFIG_DIR: &str = "machid";
/// Default config file name.
const CONFIG_FILE: &str = "config.toml";

/// Resolve the default config file path.
///
/// Returns `$XDG_CONFIG_HOME/machid/config.toml` or
/// `~/.config/machid/config.toml`.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Load the configuration from a TOML file.
///
/// If `path` is `None`, reads from the default location.
/// Returns the default configuration if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<HidConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    if !path.exists() {
        tracing::debug!(?path, "Config file not found, using defaults");
        return Ok(HidConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;

    let config = parse(&contents)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;

    tracing::info!(?path, "Configuration loaded");
    Ok(config)
}

/// Parse a configuration from TOML text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML for [`HidConfig`].
pub fn parse(contents: &str) -> Result<HidConfig> {
    Ok(toml::from_str(contents)?)
}

/// Save the configuration to `path`, or the default location.
///
/// Writes to a temp file and renames it into place. Creates the parent
/// directory if it does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save(config: &HidConfig, path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("failed to write temp config: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, &path)
        .with_context(|| format!("failed to rename config: {}", path.display()))?;

    tracing::info!(?path, "Configuration saved");
    Ok(())
}

/// machid configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HidConfig {
    /// Event backend settings.
    pub backend: BackendConfig,

    /// Pointer behaviour.
    pub pointer: PointerConfig,

    /// How the host runtime reaches the exported functions.
    pub bridge: BridgeConfig,
}

/// Event backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Which backend to use: "auto", "libei" or "coregraphics".
    pub kind: BackendKind,

    /// Client name announced to the EIS server during the libei handshake.
    pub app_name: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Auto,
            app_name: "machid".to_string(),
        }
    }
}

/// Pointer behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Clamp move targets to the union of the display bounds.
    pub clamp_to_screen: bool,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            clamp_to_screen: true,
        }
    }
}

/// Bridge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Transport used by `machid serve`.
    pub transport: Transport,
}

/// Transport between the host runtime and machid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON lines over stdin/stdout.
    #[default]
    Stdio,
    /// Typed methods on the session bus.
    Dbus,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "dbus" => Ok(Self::Dbus),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg, HidConfig::default());
        assert_eq!(cfg.backend.kind, BackendKind::Auto);
        assert_eq!(cfg.backend.app_name, "machid");
        assert!(cfg.pointer.clamp_to_screen);
        assert_eq!(cfg.bridge.transport, Transport::Stdio);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = parse(
            r#"
            [backend]
            kind = "coregraphics"

            [bridge]
            transport = "dbus"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.backend.kind, BackendKind::CoreGraphics);
        assert_eq!(cfg.backend.app_name, "machid");
        assert!(cfg.pointer.clamp_to_screen);
        assert_eq!(cfg.bridge.transport, Transport::Dbus);
    }

    #[test]
    fn transport_from_str() {
        assert_eq!("DBus".parse(), Ok(Transport::Dbus));
        assert_eq!("stdio".parse(), Ok(Transport::Stdio));
        assert!("tcp".parse::<Transport>().is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(parse("[backend]\nkind = \"x11\"\n").is_err());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("machid-test-missing/config.toml");
        assert_eq!(load(Some(&path)).unwrap(), HidConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("machid-test-{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut cfg = HidConfig::default();
        cfg.backend.kind = BackendKind::Libei;
        cfg.pointer.clamp_to_screen = false;

        save(&cfg, Some(&path)).unwrap();
        assert_eq!(load(Some(&path)).unwrap(), cfg);
        assert!(!path.with_extension("toml.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
