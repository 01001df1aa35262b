use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use jobdeck_client::ClientSettings;
use serde::Deserialize;

use super::logging::LogDestination;

const DEFAULT_SETTINGS_FILE: &str = "jobdeck.ron";

/// User settings; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub events_path: String,
    pub reconnect_delay_ms: u64,
    /// Job list and statistics reload period in watch mode.
    pub refresh_interval_secs: u64,
    pub log_destination: LogDestination,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            events_path: client.events_path,
            reconnect_delay_ms: client.reconnect_delay.as_millis() as u64,
            refresh_interval_secs: 30,
            log_destination: LogDestination::default(),
        }
    }
}

impl Settings {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            events_path: self.events_path.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Loads settings from `explicit`, or from `./jobdeck.ron` when present.
///
/// An explicit path must exist; the implicit file is optional. Returns the
/// file that was read, if any, so it can be logged once logging is up.
pub fn load(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !path.exists() {
                return Ok((Settings::default(), None));
            }
            path
        }
    };
    let settings = read(&path)?;
    Ok((settings, Some(path)))
}

fn read(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing {}", path.display()))
}

fn parse(text: &str) -> Result<Settings> {
    Ok(ron::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = parse(r#"(base_url: "http://scraper.local:8080", log_destination: both)"#)
            .unwrap();
        assert_eq!(settings.base_url, "http://scraper.local:8080");
        assert_eq!(settings.log_destination, LogDestination::Both);
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.events_path, "/socket.io/");
    }

    #[test]
    fn client_settings_carry_durations() {
        let settings = Settings {
            connect_timeout_secs: 3,
            reconnect_delay_ms: 250,
            ..Settings::default()
        };
        let client = settings.client_settings();
        assert_eq!(client.connect_timeout, Duration::from_secs(3));
        assert_eq!(client.reconnect_delay, Duration::from_millis(250));
        assert_eq!(client.base_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(load(Some(&temp.path().join("nope.ron"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.ron");
        fs::write(&path, "(base_url: 5").unwrap();
        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("jobdeck.ron");
        fs::write(&path, "(refresh_interval_secs: 0)").unwrap();
        let (settings, source) = load(Some(&path)).unwrap();
        assert_eq!(settings.refresh_interval(), Duration::from_secs(1));
        assert_eq!(source, Some(path));
    }
}
