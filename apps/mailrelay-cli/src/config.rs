//! CLI configuration.
//!
//! Stored as TOML at `$MAILRELAY_CONFIG`, or `~/.config/mailrelay/config.toml`
//! by default. A missing file means defaults.

use std::path::{Path, PathBuf};

use mailrelay_mailer::MailerConfig;

/// Loads the configuration from the default location.
pub fn load() -> anyhow::Result<MailerConfig> {
    load_from(&config_path())
}

/// Loads the configuration from `path`, or defaults if it does not exist.
pub fn load_from(path: &Path) -> anyhow::Result<MailerConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(MailerConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: MailerConfig = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("MAILRELAY_CONFIG") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("mailrelay").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("mailrelay")
            .join("config.toml")
    }
}
